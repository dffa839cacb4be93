//! Fixed-step gradient descent on `||Xw - t||^2`, shared by the linear and the
//! classification engines.
//!
//! The step size is derived from the spectral norm of the design matrix,
//! `tau = factor / ||X||_2^2`, which keeps every step a descent step for factor < 1.

use nalgebra::{DMatrix, DVector};
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Degree, weights and convergence flag of one regression algorithm, carried across calls.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitState {
    pub degree: usize,
    pub weights: Vec<f64>,
    pub converged: bool,
}

impl FitState {
    /// A fresh fit: zero weights, not converged.
    pub fn zeroed(degree: usize, n_features: usize) -> Self {
        FitState {
            degree,
            weights: vec![0.0; n_features],
            converged: false,
        }
    }
}

/// Sweep limit for the singular value decomposition.
const SVD_MAX_ITERATIONS: usize = 1000;

/// Largest singular value of `x`. Zero for an empty matrix.
///
/// `None` when `x` holds a NaN or infinite entry, or when the decomposition does not
/// converge. The matrix is scaled by its largest entry first, so huge but finite
/// coordinates do not overflow inside the decomposition.
pub fn spectral_norm(x: &DMatrix<f64>) -> Option<f64> {
    if x.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let scale = x.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return Some(0.0);
    }
    let svd = x
        .map(|v| v / scale)
        .try_svd(false, false, f64::EPSILON * 5.0, SVD_MAX_ITERATIONS)?;
    Some(scale * svd.singular_values.iter().cloned().fold(0.0, f64::max))
}

/// `factor / ||X||_2^2`, or `None` when the matrix is degenerate: zero, non-finite,
/// or so large that the step underflows.
pub fn step_size(x: &DMatrix<f64>, factor: f64) -> Option<f64> {
    match spectral_norm(x).map(|norm| factor / (norm * norm)) {
        Some(tau) if tau.is_finite() && tau > 0.0 => Some(tau),
        tau => {
            warn!(?tau, "Degenerate feature matrix, cannot derive a step size");
            None
        }
    }
}

/// Sum of squared residuals `Σ (Xw - t)^2`.
pub fn squared_error(x: &DMatrix<f64>, w: &DVector<f64>, targets: &DVector<f64>) -> f64 {
    (x * w - targets).norm_squared()
}

/// Outcome of one batch of descent steps.
#[derive(Debug, Clone)]
pub struct DescentOutcome {
    pub weights: DVector<f64>,
    pub converged: bool,
    pub iterations_run: usize,
}

/// Runs up to `max_iterations` updates `w <- w - tau * X^T (Xw - t)`, stopping early once
/// an update moves the weights by less than `epsilon`. The update that triggers
/// convergence is still applied. Starting from a converged state is a no-op.
pub fn descend(
    x: &DMatrix<f64>,
    targets: &DVector<f64>,
    start: DVector<f64>,
    already_converged: bool,
    tau: f64,
    epsilon: f64,
    max_iterations: usize,
) -> DescentOutcome {
    let x_t = x.transpose();
    let mut w = start;
    let mut converged = already_converged;
    let mut iterations_run = 0;

    while !converged && iterations_run < max_iterations {
        let gradient = &x_t * (x * &w - targets);
        let next = &w - gradient * tau;
        if (&w - &next).norm() < epsilon {
            converged = true;
        }
        w = next;
        iterations_run += 1;
    }

    DescentOutcome { weights: w, converged, iterations_run }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_spectral_norm_of_diagonal() {
        let x = DMatrix::from_row_slice(3, 2, &[3.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        assert_abs_diff_eq!(spectral_norm(&x).unwrap(), 3.0, epsilon = 1e-12);
        assert_eq!(spectral_norm(&DMatrix::<f64>::zeros(0, 0)), Some(0.0));
    }

    #[test]
    fn test_non_finite_matrix_has_no_step() {
        let with_nan = DMatrix::from_row_slice(2, 2, &[1.0, f64::NAN, 1.0, 2.0]);
        assert_eq!(spectral_norm(&with_nan), None);
        assert!(step_size(&with_nan, 0.99).is_none());
        let with_inf = DMatrix::from_row_slice(2, 2, &[1.0, f64::INFINITY, 1.0, 2.0]);
        assert!(step_size(&with_inf, 0.99).is_none());
    }

    #[test]
    fn test_huge_finite_matrix() {
        // Scaled before decomposing, so the norm itself is exact.
        let x = DMatrix::from_row_slice(2, 1, &[3e200, 4e200]);
        assert_abs_diff_eq!(spectral_norm(&x).unwrap() / 5e200, 1.0, epsilon = 1e-12);
        // Its square overflows, so no usable step exists.
        assert!(step_size(&x, 0.99).is_none());
    }

    #[test]
    fn test_step_size_rejects_zero_matrix() {
        let zeros = DMatrix::<f64>::zeros(3, 2);
        assert!(step_size(&zeros, 0.99).is_none());
        let x = DMatrix::from_row_slice(2, 1, &[2.0, 0.0]);
        assert_abs_diff_eq!(step_size(&x, 0.99).unwrap(), 0.99 / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_descend_respects_iteration_budget() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, -1.0, 1.0, 0.0, 1.0, 1.0]);
        let t = DVector::from_vec(vec![-1.0, 0.0, 1.0]);
        let tau = step_size(&x, 0.99).unwrap();
        let out = descend(&x, &t, DVector::zeros(2), false, tau, 1e-6, 1);
        assert_eq!(out.iterations_run, 1);
        assert!(!out.converged);
    }

    #[test]
    fn test_descend_is_noop_when_converged() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let t = DVector::from_vec(vec![5.0, 5.0]);
        let start = DVector::from_vec(vec![0.25]);
        let out = descend(&x, &t, start.clone(), true, 0.1, 1e-6, 100);
        assert_eq!(out.iterations_run, 0);
        assert_eq!(out.weights, start);
        assert!(out.converged);
    }

    #[test]
    fn test_descend_decreases_loss() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let t = DVector::from_vec(vec![1.0, 3.0, 5.0, 7.0]);
        let tau = step_size(&x, 0.99).unwrap();
        let mut w = DVector::zeros(2);
        let mut previous = squared_error(&x, &w, &t);
        for _ in 0..20 {
            w = descend(&x, &t, w, false, tau, 1e-12, 1).weights;
            let current = squared_error(&x, &w, &t);
            assert!(current <= previous + 1e-12, "loss went up: {} -> {}", previous, current);
            previous = current;
        }
    }
}
