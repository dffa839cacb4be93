//! Binary classification by gradient descent over the 2D polynomial basis.
//!
//! The two class labels are coded as -1 / +1 and the model minimizes the squared
//! error `||Xw - s||^2` against those signed targets (least-squares classification).
//! The learned score field `C(a, b) = features(a, b) · w` is positive on the +1 side;
//! its zero-level set is the decision boundary.

use std::collections::BTreeSet;

use nalgebra::DVector;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::common_types::{LabeledPoint, Point};
use crate::config::EngineConfig;
use crate::error::{Result, VisualizerError};
use crate::regression::features::{self, Grid, bivariate_row, classification_feature_count, dot_product_generic};
use crate::regression::gradient_descent::{self, FitState};

/// The two labels found in the data: `negative` is coded -1, `positive` is coded +1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassPair {
    pub negative: usize,
    pub positive: usize,
}

impl ClassPair {
    pub fn signed(&self, label: usize) -> f64 {
        if label == self.positive { 1.0 } else { -1.0 }
    }

    pub fn label_for(&self, score: f64) -> usize {
        if score >= 0.0 { self.positive } else { self.negative }
    }
}

/// Score values sampled on a grid. `values[j][i]` is the score at `(xs[i], ys[j])`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecisionField {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub values: Vec<Vec<f64>>,
}

impl DecisionField {
    pub fn value_at(&self, i: usize, j: usize) -> f64 {
        self.values[j][i]
    }
}

/// Result of advancing a classification fit by one batch of iterations.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticStep {
    pub state: FitState,
    /// `Σ (Xw - s)^2` against the signed labels.
    pub cost: f64,
    pub iterations_run: usize,
    pub classes: ClassPair,
    pub field: DecisionField,
}

/// Maps the labels onto -1 / +1. The smaller label becomes -1.
pub fn class_pair(points: &[LabeledPoint]) -> Result<ClassPair> {
    let distinct: BTreeSet<usize> = points.iter().map(|p| p.label).collect();
    if distinct.len() != 2 {
        return Err(VisualizerError::LabelCardinality { distinct: distinct.len() });
    }
    let mut labels = distinct.into_iter();
    match (labels.next(), labels.next()) {
        (Some(negative), Some(positive)) => Ok(ClassPair { negative, positive }),
        _ => Err(VisualizerError::LabelCardinality { distinct: 0 }),
    }
}

/// Advances `state` by at most `max_iterations` descent steps over `points`.
pub fn step(
    points: &[LabeledPoint],
    state: &FitState,
    max_iterations: usize,
    config: &EngineConfig,
) -> Result<LogisticStep> {
    let degree = state.degree;
    let expected = classification_feature_count(degree);
    if state.weights.len() != expected {
        return Err(VisualizerError::WeightShape { expected, found: state.weights.len() });
    }
    let insufficient = VisualizerError::InsufficientData { points: points.len(), degree };
    if points.len() < 2 {
        return Err(insufficient);
    }
    let classes = class_pair(points)?;

    let coords: Vec<Point> = points.iter().map(|p| p.point).collect();
    let x = features::expand_bivariate(&coords, degree)?;
    let targets = DVector::from_iterator(points.len(), points.iter().map(|p| classes.signed(p.label)));
    let tau = gradient_descent::step_size(&x, config.logistic_step_factor).ok_or_else(|| insufficient.clone())?;

    let outcome = gradient_descent::descend(
        &x,
        &targets,
        DVector::from_column_slice(&state.weights),
        state.converged,
        tau,
        config.epsilon,
        max_iterations,
    );
    if outcome.weights.iter().any(|w| !w.is_finite()) {
        warn!(degree, "Logistic regression weights diverged");
        return Err(insufficient);
    }

    let cost = gradient_descent::squared_error(&x, &outcome.weights, &targets);
    let weights: Vec<f64> = outcome.weights.iter().cloned().collect();
    let grid = Grid::over(&config.extent, config.grid_resolution);
    let field = evaluate_field(&grid, degree, &weights)?;

    debug!(degree, iterations = outcome.iterations_run, cost, converged = outcome.converged, "Logistic regression step");

    Ok(LogisticStep {
        state: FitState { degree, weights, converged: outcome.converged },
        cost,
        iterations_run: outcome.iterations_run,
        classes,
        field,
    })
}

/// Score of a single point; same row builder as training.
pub fn decision_value(point: &Point, degree: usize, weights: &[f64]) -> f64 {
    dot_product_generic(&bivariate_row(point.x, point.y, degree), weights)
}

pub fn predict(point: &Point, degree: usize, weights: &[f64], classes: &ClassPair) -> usize {
    classes.label_for(decision_value(point, degree, weights))
}

/// Scores every grid node at once through the grid feature matrix.
pub fn evaluate_field(grid: &Grid, degree: usize, weights: &[f64]) -> Result<DecisionField> {
    let expected = classification_feature_count(degree);
    if weights.len() != expected {
        return Err(VisualizerError::WeightShape { expected, found: weights.len() });
    }
    let x = features::expand_grid(grid, degree)?;
    let scores = &x * DVector::from_column_slice(weights);
    let width = grid.xs.len();
    let values = (0..grid.ys.len())
        .map(|j| scores.rows(j * width, width).iter().cloned().collect())
        .collect();
    Ok(DecisionField { xs: grid.xs.clone(), ys: grid.ys.clone(), values })
}
