//! Results handed back to the request layer: coefficients, convergence, cost and the
//! geometry a renderer needs.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::common_types::{Centroid, Point};
use crate::kmeans::{KMeansRun, KMeansState, Phase};
use crate::regression::contour;
use crate::regression::linear::LinearStep;
use crate::regression::logistic::{ClassPair, DecisionField, LogisticStep};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegressionReport {
    /// The fitted curve sampled across the plot.
    pub line_points: Vec<Point>,
    pub coefficients: Vec<f64>,
    pub cost: Option<f64>,
    pub iterations_run: Option<usize>,
    pub converged: bool,
}

impl RegressionReport {
    /// "Not enough data yet": nothing to draw, nothing fitted.
    pub fn empty() -> Self {
        RegressionReport {
            line_points: Vec::new(),
            coefficients: Vec::new(),
            cost: None,
            iterations_run: None,
            converged: false,
        }
    }
}

impl From<LinearStep> for RegressionReport {
    fn from(step: LinearStep) -> Self {
        RegressionReport {
            line_points: step.line_points,
            coefficients: step.state.weights,
            cost: Some(step.cost),
            iterations_run: Some(step.iterations_run),
            converged: step.state.converged,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassificationReport {
    /// Every branch of the decision boundary, longest first.
    pub boundary: Vec<Vec<Point>>,
    /// The raw score field, for renderers that draw their own contour.
    pub field: Option<DecisionField>,
    pub classes: Option<ClassPair>,
    pub coefficients: Vec<f64>,
    pub cost: Option<f64>,
    pub iterations_run: Option<usize>,
    pub converged: bool,
}

impl ClassificationReport {
    pub fn empty() -> Self {
        ClassificationReport {
            boundary: Vec::new(),
            field: None,
            classes: None,
            coefficients: Vec::new(),
            cost: None,
            iterations_run: None,
            converged: false,
        }
    }
}

impl From<LogisticStep> for ClassificationReport {
    fn from(step: LogisticStep) -> Self {
        ClassificationReport {
            boundary: contour::zero_level_polylines(&step.field),
            field: Some(step.field),
            classes: Some(step.classes),
            coefficients: step.state.weights,
            cost: Some(step.cost),
            iterations_run: Some(step.iterations_run),
            converged: step.state.converged,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KMeansReport {
    pub centroids: Vec<Centroid>,
    /// Cluster index per point; empty when nothing has been assigned yet.
    pub assignments: Vec<usize>,
    pub phase: Option<Phase>,
    pub converged: bool,
    pub iterations_run: Option<usize>,
    pub next_step: String,
}

impl KMeansReport {
    /// Report for a session without any points.
    pub fn empty() -> Self {
        KMeansReport {
            centroids: Vec::new(),
            assignments: Vec::new(),
            phase: None,
            converged: false,
            iterations_run: None,
            next_step: "Initialize centroids".to_string(),
        }
    }

    pub fn from_state(state: &KMeansState, iterations_run: Option<usize>) -> Self {
        KMeansReport {
            centroids: state.centroids.clone(),
            assignments: state.assignments.clone().unwrap_or_default(),
            phase: Some(state.phase),
            converged: state.converged,
            iterations_run,
            next_step: state.next_step_hint().to_string(),
        }
    }

    /// Point index -> cluster index, the shape web clients exchange.
    pub fn assignment_map(&self) -> BTreeMap<usize, usize> {
        self.assignments.iter().cloned().enumerate().collect()
    }
}

impl From<KMeansRun> for KMeansReport {
    fn from(run: KMeansRun) -> Self {
        let state = KMeansState {
            k: run.centroids.len(),
            centroids: run.centroids,
            assignments: Some(run.assignments),
            phase: if run.converged { Phase::Update } else { Phase::Assign },
            converged: run.converged,
        };
        KMeansReport::from_state(&state, Some(run.iterations_run))
    }
}
