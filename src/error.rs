//! Error types for the regression and clustering engines.

use thiserror::Error;

/// Everything that can go wrong while validating a request or advancing an algorithm.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VisualizerError {
    /// Polynomial degree below 1 or above the configured maximum.
    #[error("Invalid polynomial degree: {0}")]
    InvalidDegree(usize),

    /// Iteration count outside `1..=max`.
    #[error("Number of iterations must be between 1 and {max}, got {iterations}")]
    InvalidIterations { iterations: usize, max: usize },

    /// Cluster count below 1 or above the configured maximum.
    #[error("Invalid number of clusters: {0}")]
    InvalidClusterCount(usize),

    /// Too few points to fit a polynomial of this degree, or the feature matrix is degenerate.
    #[error("Not enough data to fit a degree {degree} model with {points} points")]
    InsufficientData { points: usize, degree: usize },

    /// Fewer points than requested clusters.
    #[error("Not enough points to form {k} clusters (have {points})")]
    InsufficientPoints { points: usize, k: usize },

    /// The centroid update needs one assignment per point.
    #[error("Assignments required for every point: have {assigned} of {points}")]
    MissingAssignments { assigned: usize, points: usize },

    #[error("No centroids to assign points to")]
    NoCentroids,

    /// A stateless step other than `initialize` arrived without centroids.
    #[error("Centroids required for step type '{0}'")]
    MissingCentroids(String),

    #[error("Number of centroids ({found}) does not match k ({expected})")]
    CentroidCountMismatch { expected: usize, found: usize },

    #[error("Point {point} is assigned to cluster {cluster}, but k is {k}")]
    InvalidAssignment { point: usize, cluster: usize, k: usize },

    /// Classification needs exactly two distinct labels.
    #[error("Classification needs exactly 2 distinct labels, found {distinct}")]
    LabelCardinality { distinct: usize },

    #[error("Weight vector has {found} entries, degree requires {expected}")]
    WeightShape { expected: usize, found: usize },

    #[error("Unknown K-Means step type: {0}")]
    UnknownStepType(String),
}

impl VisualizerError {
    /// Soft failures mean "not enough data yet". The caller answers with an empty,
    /// non-converged result instead of rejecting the request.
    pub fn is_soft(&self) -> bool {
        match self {
            VisualizerError::InsufficientData { .. } => true,
            VisualizerError::LabelCardinality { distinct } => *distinct < 2,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, VisualizerError>;
