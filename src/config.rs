//! Engine configuration: stopping thresholds, step-size factors, sampling densities
//! and the request limits the web layer enforces.

use crate::common_types::PlotExtent;
use crate::error::{Result, VisualizerError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tunables shared by all engines. `Default` reproduces the classroom deployment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Gradient descent stops once `||w_{t+1} - w_t||` drops below this.
    pub epsilon: f64,
    /// Numerator of the linear step size `tau = factor / ||X||_2^2`.
    pub linear_step_factor: f64,
    /// Numerator of the logistic step size.
    pub logistic_step_factor: f64,
    pub extent: PlotExtent,
    /// Number of x samples for the fitted regression curve.
    pub line_samples: usize,
    /// Side length of the decision-field grid.
    pub grid_resolution: usize,
    pub max_degree: usize,
    pub max_iterations: usize,
    pub max_clusters: usize,
    /// Round budget for `run_to_convergence` when the request names none.
    pub kmeans_max_iterations: usize,
    /// Per-coordinate movement below which a centroid counts as unchanged.
    pub centroid_tolerance: f64,
}

impl EngineConfig {
    pub const DEFAULT_EPSILON: f64 = 1e-6;
    pub const DEFAULT_LINEAR_STEP_FACTOR: f64 = 0.99;
    pub const DEFAULT_LOGISTIC_STEP_FACTOR: f64 = 0.999;
    pub const DEFAULT_LINE_SAMPLES: usize = 1000;
    pub const DEFAULT_GRID_RESOLUTION: usize = 100;
    pub const DEFAULT_MAX_DEGREE: usize = 5;
    pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;
    pub const DEFAULT_MAX_CLUSTERS: usize = 10;
    pub const DEFAULT_KMEANS_MAX_ITERATIONS: usize = 100;
    pub const DEFAULT_CENTROID_TOLERANCE: f64 = 1e-9;

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_extent(mut self, extent: PlotExtent) -> Self {
        self.extent = extent;
        self
    }

    pub fn with_line_samples(mut self, line_samples: usize) -> Self {
        self.line_samples = line_samples;
        self
    }

    pub fn with_grid_resolution(mut self, grid_resolution: usize) -> Self {
        self.grid_resolution = grid_resolution;
        self
    }

    pub fn with_max_degree(mut self, max_degree: usize) -> Self {
        self.max_degree = max_degree;
        self
    }

    pub fn with_max_clusters(mut self, max_clusters: usize) -> Self {
        self.max_clusters = max_clusters;
        self
    }

    pub fn with_centroid_tolerance(mut self, centroid_tolerance: f64) -> Self {
        self.centroid_tolerance = centroid_tolerance;
        self
    }

    pub fn check_degree(&self, degree: usize) -> Result<()> {
        if degree < 1 || degree > self.max_degree {
            return Err(VisualizerError::InvalidDegree(degree));
        }
        Ok(())
    }

    pub fn check_iterations(&self, iterations: usize) -> Result<()> {
        if iterations < 1 || iterations > self.max_iterations {
            return Err(VisualizerError::InvalidIterations { iterations, max: self.max_iterations });
        }
        Ok(())
    }

    pub fn check_clusters(&self, k: usize) -> Result<()> {
        if k < 1 || k > self.max_clusters {
            return Err(VisualizerError::InvalidClusterCount(k));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            epsilon: Self::DEFAULT_EPSILON,
            linear_step_factor: Self::DEFAULT_LINEAR_STEP_FACTOR,
            logistic_step_factor: Self::DEFAULT_LOGISTIC_STEP_FACTOR,
            extent: PlotExtent::default(),
            line_samples: Self::DEFAULT_LINE_SAMPLES,
            grid_resolution: Self::DEFAULT_GRID_RESOLUTION,
            max_degree: Self::DEFAULT_MAX_DEGREE,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            max_clusters: Self::DEFAULT_MAX_CLUSTERS,
            kmeans_max_iterations: Self::DEFAULT_KMEANS_MAX_ITERATIONS,
            centroid_tolerance: Self::DEFAULT_CENTROID_TOLERANCE,
        }
    }
}
