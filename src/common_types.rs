//! This module contains the plain data structures shared by every algorithm:
//! points placed by the user, their class labels, cluster centroids and the plot extent.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single 2D point placed on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point { x, y }
    }
}

/// A point together with its class index.
///
/// The label is the class target for logistic regression. Linear regression and
/// k-means ignore it; cluster membership lives in the k-means state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LabeledPoint {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub point: Point,
    pub label: usize,
}

impl LabeledPoint {
    pub fn new(x: f64, y: f64, label: usize) -> Self {
        LabeledPoint { point: Point::new(x, y), label }
    }
}

// Unlabeled points land in class 0, same as a click with the default class selected.
impl From<Point> for LabeledPoint {
    fn from(point: Point) -> Self {
        LabeledPoint { point, label: 0 }
    }
}

impl From<(f64, f64)> for LabeledPoint {
    fn from(xy: (f64, f64)) -> Self {
        Point::from(xy).into()
    }
}

impl From<(f64, f64, usize)> for LabeledPoint {
    fn from((x, y, label): (f64, f64, usize)) -> Self {
        LabeledPoint::new(x, y, label)
    }
}

/// A cluster centre tagged with its cluster index (`0..k`).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Centroid {
    pub index: usize,
    pub point: Point,
}

impl Centroid {
    pub fn new(index: usize, point: Point) -> Self {
        Centroid { index, point }
    }
}

/// Builds centroids with sequential indices from bare coordinates.
pub fn indexed_centroids(points: &[Point]) -> Vec<Centroid> {
    points
        .iter()
        .enumerate()
        .map(|(index, &point)| Centroid { index, point })
        .collect()
}

/// The visible area of the plot. Regression curves and decision fields are sampled over it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlotExtent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl PlotExtent {
    /// A square extent `[-half_width, half_width]` on both axes.
    pub fn symmetric(half_width: f64) -> Self {
        PlotExtent {
            x_min: -half_width,
            x_max: half_width,
            y_min: -half_width,
            y_max: half_width,
        }
    }
}

impl Default for PlotExtent {
    fn default() -> Self {
        PlotExtent::symmetric(10.0)
    }
}
