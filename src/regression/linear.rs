//! Polynomial linear regression by gradient descent: `y` is predicted from `x`
//! with the basis `[1, x, .., x^d]`.

use nalgebra::DVector;
use tracing::{debug, warn};

use crate::common_types::Point;
use crate::config::EngineConfig;
use crate::error::{Result, VisualizerError};
use crate::regression::features::{self, dot_product_generic, linear_feature_count, polynomial_row};
use crate::regression::gradient_descent::{self, FitState};

/// Result of advancing a linear fit by one batch of iterations.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearStep {
    pub state: FitState,
    /// `Σ (Xw - y)^2` at the returned weights.
    pub cost: f64,
    pub iterations_run: usize,
    /// The fitted curve sampled across the plot extent.
    pub line_points: Vec<Point>,
}

/// Fewer than two points, or no more points than the degree, leaves the system underdetermined.
pub fn check_sufficient(points: &[Point], degree: usize) -> Result<()> {
    if points.len() < 2 || points.len() <= degree {
        return Err(VisualizerError::InsufficientData { points: points.len(), degree });
    }
    Ok(())
}

/// Advances `state` by at most `max_iterations` descent steps over `points`.
///
/// Returns `InsufficientData` when the points cannot determine the polynomial;
/// callers report that as an empty, non-converged result.
pub fn step(points: &[Point], state: &FitState, max_iterations: usize, config: &EngineConfig) -> Result<LinearStep> {
    let degree = state.degree;
    let expected = linear_feature_count(degree);
    if state.weights.len() != expected {
        return Err(VisualizerError::WeightShape { expected, found: state.weights.len() });
    }
    check_sufficient(points, degree)?;

    let x = features::expand(points, degree)?;
    let targets = DVector::from_iterator(points.len(), points.iter().map(|p| p.y));
    let insufficient = VisualizerError::InsufficientData { points: points.len(), degree };
    let tau = gradient_descent::step_size(&x, config.linear_step_factor).ok_or_else(|| insufficient.clone())?;

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
        warn!(degree, "Linear regression weights diverged");
        return Err(insufficient);
    }

    let cost = gradient_descent::squared_error(&x, &outcome.weights, &targets);
    let weights: Vec<f64> = outcome.weights.iter().cloned().collect();
    let line_points = sample_curve(&weights, degree, config);

    debug!(degree, iterations = outcome.iterations_run, cost, converged = outcome.converged, "Linear regression step");

    Ok(LinearStep {
        state: FitState { degree, weights, converged: outcome.converged },
        cost,
        iterations_run: outcome.iterations_run,
        line_points,
    })
}

/// Value of the fitted polynomial at `x`.
pub fn predict(weights: &[f64], degree: usize, x: f64) -> f64 {
    dot_product_generic(&polynomial_row(x, degree), weights)
}

/// The fitted polynomial evaluated at `line_samples` x values spanning the plot extent.
pub fn sample_curve(weights: &[f64], degree: usize, config: &EngineConfig) -> Vec<Point> {
    features::linspace(config.extent.x_min, config.extent.x_max, config.line_samples)
        .into_iter()
        .map(|x| Point::new(x, predict(weights, degree, x)))
        .collect()
}
