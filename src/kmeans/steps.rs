//! The individual k-means operations: seeding, assignment, centroid update, and
//! the loops built from them. All functions are pure except `initialize`, which
//! draws from the supplied RNG.

use ordered_float::OrderedFloat;
use rand::Rng;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::common_types::{Centroid, Point};
use crate::error::{Result, VisualizerError};

/// Per-coordinate movement below which a centroid counts as unchanged.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// New centroid positions and whether none of them moved.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CentroidUpdate {
    pub centroids: Vec<Centroid>,
    pub converged: bool,
}

/// Outcome of alternating assign/update until convergence or budget exhaustion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KMeansRun {
    pub centroids: Vec<Centroid>,
    pub assignments: Vec<usize>,
    pub converged: bool,
    pub iterations_run: usize,
}

/// Picks `k` distinct points uniformly at random as centroids `0..k`.
pub fn initial_centroids<R: Rng + ?Sized>(points: &[Point], k: usize, rng: &mut R) -> Result<Vec<Centroid>> {
    if k == 0 {
        return Err(VisualizerError::InvalidClusterCount(k));
    }
    if points.len() < k {
        return Err(VisualizerError::InsufficientPoints { points: points.len(), k });
    }
    let picked = rand::seq::index::sample(rng, points.len(), k);
    Ok(picked
        .into_iter()
        .enumerate()
        .map(|(index, p)| Centroid::new(index, points[p]))
        .collect())
}

/// Index of the closest centroid; equal distances go to the lowest index.
pub fn nearest_centroid(point: &Point, centroids: &[Centroid]) -> Option<usize> {
    centroids
        .iter()
        .min_by_key(|c| (OrderedFloat(point.distance_to(&c.point)), c.index))
        .map(|c| c.index)
}

/// Assigns every point to its nearest centroid. Centroids are left untouched.
pub fn assign_points(points: &[Point], centroids: &[Centroid]) -> Result<Vec<usize>> {
    if centroids.is_empty() {
        return Err(VisualizerError::NoCentroids);
    }
    Ok(points
        .iter()
        .filter_map(|p| nearest_centroid(p, centroids))
        .collect())
}

/// `update_centroids_with_tolerance` at the default tolerance.
pub fn update_centroids(points: &[Point], assignments: &[usize], centroids: &[Centroid], k: usize) -> Result<CentroidUpdate> {
    update_centroids_with_tolerance(points, assignments, centroids, k, DEFAULT_TOLERANCE)
}

/// Moves every centroid to the mean of its assigned points.
///
/// A cluster without members keeps its previous centroid unchanged, so `k` stays fixed.
/// Converged when no coordinate moved by more than `tolerance`.
pub fn update_centroids_with_tolerance(
    points: &[Point],
    assignments: &[usize],
    centroids: &[Centroid],
    k: usize,
    tolerance: f64,
) -> Result<CentroidUpdate> {
    if centroids.len() != k {
        return Err(VisualizerError::CentroidCountMismatch { expected: k, found: centroids.len() });
    }
    if assignments.len() != points.len() {
        return Err(VisualizerError::MissingAssignments { assigned: assignments.len(), points: points.len() });
    }

    let mut sums = vec![(0.0, 0.0, 0usize); k];
    for (point_idx, (p, &cluster)) in points.iter().zip(assignments).enumerate() {
        let slot = sums
            .get_mut(cluster)
            .ok_or_else(|| VisualizerError::InvalidAssignment { point: point_idx, cluster, k })?;
        slot.0 += p.x;
        slot.1 += p.y;
        slot.2 += 1;
    }

    let mut converged = true;
    let moved: Vec<Centroid> = centroids
        .iter()
        .map(|c| {
            let next = match sums.get(c.index) {
                Some(&(sx, sy, n)) if n > 0 => Point::new(sx / n as f64, sy / n as f64),
                _ => c.point,
            };
            if (next.x - c.point.x).abs() > tolerance || (next.y - c.point.y).abs() > tolerance {
                converged = false;
            }
            Centroid::new(c.index, next)
        })
        .collect();

    Ok(CentroidUpdate { centroids: moved, converged })
}

/// One full round: assign, then update.
pub fn full_iteration(
    points: &[Point],
    centroids: &[Centroid],
    k: usize,
    tolerance: f64,
) -> Result<(Vec<usize>, CentroidUpdate)> {
    if centroids.len() != k {
        return Err(VisualizerError::CentroidCountMismatch { expected: k, found: centroids.len() });
    }
    let assignments = assign_points(points, centroids)?;
    let update = update_centroids_with_tolerance(points, &assignments, centroids, k, tolerance)?;
    Ok((assignments, update))
}

/// Alternates assign/update from `initial` until the centroids stop moving or
/// `max_iterations` rounds have run.
pub fn run_to_convergence(
    points: &[Point],
    k: usize,
    initial: &[Centroid],
    max_iterations: usize,
    tolerance: f64,
) -> Result<KMeansRun> {
    if initial.len() != k {
        return Err(VisualizerError::CentroidCountMismatch { expected: k, found: initial.len() });
    }
    let mut centroids = initial.to_vec();
    let mut assignments = assign_points(points, &centroids)?;
    let mut converged = false;
    let mut iterations_run = 0;

    while !converged && iterations_run < max_iterations {
        let (assigned, update) = full_iteration(points, &centroids, k, tolerance)?;
        assignments = assigned;
        centroids = update.centroids;
        converged = update.converged;
        iterations_run += 1;
    }

    debug!(k, iterations = iterations_run, converged, "K-Means run finished");
    Ok(KMeansRun { centroids, assignments, converged, iterations_run })
}
