//! K-Means clustering with explicit, steppable state.
//!
//! The interactive view advances the algorithm one half-step at a time: an
//! `Assign` step recolors the points, the following `Update` step moves the
//! centroids. `KMeansState` records which half-step comes next.

pub mod steps;

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::common_types::{Centroid, Point};
use crate::error::{Result, VisualizerError};

pub use steps::{
    CentroidUpdate, KMeansRun, assign_points, full_iteration, initial_centroids, nearest_centroid,
    run_to_convergence, update_centroids, update_centroids_with_tolerance,
};

/// Which half-step runs next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Phase {
    Assign,
    Update,
}

impl Phase {
    fn toggled(self) -> Phase {
        match self {
            Phase::Assign => Phase::Update,
            Phase::Update => Phase::Assign,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KMeansState {
    pub k: usize,
    pub centroids: Vec<Centroid>,
    /// One cluster index per point, or `None` until the first assignment.
    pub assignments: Option<Vec<usize>>,
    pub phase: Phase,
    pub converged: bool,
}

impl KMeansState {
    /// State for fresh centroids: nothing assigned yet, assignment comes next.
    pub fn with_centroids(centroids: Vec<Centroid>) -> Self {
        KMeansState {
            k: centroids.len(),
            centroids,
            assignments: None,
            phase: Phase::Assign,
            converged: false,
        }
    }

    /// Drops assignments that no longer cover the dataset (a point was added).
    pub fn invalidate_assignments(&mut self) {
        self.assignments = None;
        self.phase = Phase::Assign;
        self.converged = false;
    }

    /// What the next click will do, as shown to the learner.
    pub fn next_step_hint(&self) -> &'static str {
        if self.converged {
            "Centroids haven't moved"
        } else {
            match self.phase {
                Phase::Assign => "Click to recolor the points based on closest centroid",
                Phase::Update => "Click to move the centroids to the average of the points in their clusters",
            }
        }
    }
}

/// Samples `k` distinct points as centroids and returns the starting state.
pub fn initialize<R: Rng + ?Sized>(points: &[Point], k: usize, rng: &mut R) -> Result<KMeansState> {
    let centroids = initial_centroids(points, k, rng)?;
    debug!(k, points = points.len(), "K-Means initialized");
    Ok(KMeansState::with_centroids(centroids))
}

/// Runs the half-step the state's phase names and flips the phase.
/// A converged state is returned unchanged.
pub fn advance(points: &[Point], state: &KMeansState, tolerance: f64) -> Result<KMeansState> {
    if state.converged {
        return Ok(state.clone());
    }
    let mut next = state.clone();
    match state.phase {
        Phase::Assign => {
            next.assignments = Some(assign_points(points, &state.centroids)?);
            next.phase = state.phase.toggled();
        }
        Phase::Update => {
            let assignments = state
                .assignments
                .as_deref()
                .ok_or_else(|| VisualizerError::MissingAssignments { assigned: 0, points: points.len() })?;
            let update = update_centroids_with_tolerance(points, assignments, &state.centroids, state.k, tolerance)?;
            next.centroids = update.centroids;
            next.converged = update.converged;
            // Phase stays frozen once converged.
            if !update.converged {
                next.phase = state.phase.toggled();
            }
        }
    }
    Ok(next)
}

/// Applies up to `half_steps` calls of `advance`, stopping at convergence.
/// Returns the new state and the number of half-steps actually taken.
pub fn advance_by(points: &[Point], state: &KMeansState, half_steps: usize, tolerance: f64) -> Result<(KMeansState, usize)> {
    let mut current = state.clone();
    let mut taken = 0;
    while taken < half_steps && !current.converged {
        current = advance(points, &current, tolerance)?;
        taken += 1;
    }
    Ok((current, taken))
}

/// The step types a client can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum KMeansStepType {
    Initialize,
    AssignPoints,
    UpdateCentroids,
    FullIteration,
    RunToConvergence,
}

impl FromStr for KMeansStepType {
    type Err = VisualizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "initialize" => Ok(KMeansStepType::Initialize),
            "assign_points" => Ok(KMeansStepType::AssignPoints),
            "update_centroids" => Ok(KMeansStepType::UpdateCentroids),
            "full_iteration" => Ok(KMeansStepType::FullIteration),
            "run_to_convergence" => Ok(KMeansStepType::RunToConvergence),
            _ => Err(VisualizerError::UnknownStepType(s.to_string())),
        }
    }
}

impl fmt::Display for KMeansStepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KMeansStepType::Initialize => "initialize",
            KMeansStepType::AssignPoints => "assign_points",
            KMeansStepType::UpdateCentroids => "update_centroids",
            KMeansStepType::FullIteration => "full_iteration",
            KMeansStepType::RunToConvergence => "run_to_convergence",
        };
        f.write_str(name)
    }
}
