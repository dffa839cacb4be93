//! Polynomial feature expansion.
//!
//! Both the training matrix and every later evaluation (curve samples, grid cells,
//! single points) go through `polynomial_row` / `bivariate_row`, so the column
//! order used for fitting is always the one used for evaluating.

use nalgebra::DMatrix;
use num_traits::Float;

use crate::common_types::{PlotExtent, Point};
use crate::error::{Result, VisualizerError};

/// Dense `(n_points, n_features)` design matrix.
pub type FeatureMatrix = DMatrix<f64>;

/// Columns of the 1D regression basis `[1, x, .., x^d]`.
pub fn linear_feature_count(degree: usize) -> usize {
    degree + 1
}

/// Columns of the 2D classification basis `[1, x, y, .., x^d, y^d]`.
pub fn classification_feature_count(degree: usize) -> usize {
    2 * degree + 1
}

fn check_degree(degree: usize) -> Result<()> {
    if degree < 1 {
        return Err(VisualizerError::InvalidDegree(degree));
    }
    Ok(())
}

/// `[1, x, x^2, .., x^degree]`
pub fn polynomial_row<F: Float>(x: F, degree: usize) -> Vec<F> {
    (0..=degree).map(|i| x.powi(i as i32)).collect()
}

/// `[1, x, y, x^2, y^2, .., x^degree, y^degree]`, no cross terms.
pub fn bivariate_row<F: Float>(x: F, y: F, degree: usize) -> Vec<F> {
    let mut row = Vec::with_capacity(classification_feature_count(degree));
    row.push(F::one());
    for i in 1..=degree {
        row.push(x.powi(i as i32));
        row.push(y.powi(i as i32));
    }
    row
}

/// Generic dot product used to evaluate a fitted model at a single sample.
pub fn dot_product_generic<F: Float + std::iter::Sum>(a: &[F], b: &[F]) -> F {
    a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum()
}

fn matrix_from_rows(rows: Vec<Vec<f64>>, n_features: usize) -> FeatureMatrix {
    let n_rows = rows.len();
    DMatrix::from_fn(n_rows, n_features, |r, c| rows[r][c])
}

/// Regression expansion of the x coordinates: column `i` holds `x^i`.
pub fn expand(points: &[Point], degree: usize) -> Result<FeatureMatrix> {
    check_degree(degree)?;
    let rows = points.iter().map(|p| polynomial_row(p.x, degree)).collect();
    Ok(matrix_from_rows(rows, linear_feature_count(degree)))
}

/// Classification expansion of both coordinates.
pub fn expand_bivariate(points: &[Point], degree: usize) -> Result<FeatureMatrix> {
    check_degree(degree)?;
    let rows = points.iter().map(|p| bivariate_row(p.x, p.y, degree)).collect();
    Ok(matrix_from_rows(rows, classification_feature_count(degree)))
}

/// Evenly spaced samples over `[start, end]`, both ends included.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// A rectangular lattice of sample coordinates. Node `(i, j)` sits at `(xs[i], ys[j])`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl Grid {
    /// `resolution × resolution` nodes spanning the extent.
    pub fn over(extent: &PlotExtent, resolution: usize) -> Self {
        Grid {
            xs: linspace(extent.x_min, extent.x_max, resolution),
            ys: linspace(extent.y_min, extent.y_max, resolution),
        }
    }

    pub fn len(&self) -> usize {
        self.xs.len() * self.ys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nodes in row-major order: `y` outer, `x` inner.
    pub fn nodes(&self) -> impl Iterator<Item = Point> + '_ {
        self.ys
            .iter()
            .flat_map(move |&y| self.xs.iter().map(move |&x| Point::new(x, y)))
    }
}

/// The classification expansion applied to every grid node, one row per node (row-major).
pub fn expand_grid(grid: &Grid, degree: usize) -> Result<FeatureMatrix> {
    check_degree(degree)?;
    let rows = grid.nodes().map(|p| bivariate_row(p.x, p.y, degree)).collect();
    Ok(matrix_from_rows(rows, classification_feature_count(degree)))
}
