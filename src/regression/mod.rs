//! Gradient-descent regression engines and their helpers.

pub mod contour;
pub mod features;
pub mod gradient_descent;
pub mod linear;
pub mod logistic;

pub use gradient_descent::FitState;

/// The two regression algorithms a session keeps fit state for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    LinearRegression,
    LogisticRegression,
}

impl Algorithm {
    /// Number of weights a model of this degree carries.
    pub fn feature_count(&self, degree: usize) -> usize {
        match self {
            Algorithm::LinearRegression => features::linear_feature_count(degree),
            Algorithm::LogisticRegression => features::classification_feature_count(degree),
        }
    }

    /// Zero weights sized for `degree`.
    pub fn fresh_state(&self, degree: usize) -> FitState {
        FitState::zeroed(degree, self.feature_count(degree))
    }
}
