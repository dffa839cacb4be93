//! Stateless request handlers. Each call carries the whole dataset (and, for
//! k-means, the current centroids and assignments) and gets a report back; nothing
//! is remembered between calls.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::common_types::{Centroid, LabeledPoint, Point, indexed_centroids};
use crate::config::EngineConfig;
use crate::error::{Result, VisualizerError};
use crate::kmeans::{self, KMeansState, KMeansStepType, Phase};
use crate::regression::{Algorithm, linear, logistic};
use crate::report::{ClassificationReport, KMeansReport, RegressionReport};

/// Gradient steps per request when the client does not say.
pub const DEFAULT_ITERATIONS: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegressionRequest {
    pub points: Vec<Point>,
    pub degree: usize,
    pub iterations: Option<usize>,
    /// Accepted for compatibility; the step size is always derived from the data.
    pub learning_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassificationRequest {
    pub points: Vec<LabeledPoint>,
    pub degree: usize,
    pub iterations: Option<usize>,
    pub learning_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KMeansStepRequest {
    pub points: Vec<Point>,
    pub k: usize,
    pub step_type: String,
    /// Required for every step except `initialize`.
    pub centroids: Option<Vec<Point>>,
    /// Point index -> cluster index. Required for `update_centroids`.
    pub assignments: Option<BTreeMap<usize, usize>>,
    pub max_iterations: Option<usize>,
}

/// Turns "not enough data yet" into an empty report.
pub(crate) fn or_empty<T>(result: Result<T>, empty: impl FnOnce() -> T) -> Result<T> {
    match result {
        Err(err) if err.is_soft() => {
            debug!(%err, "Answering with an empty report");
            Ok(empty())
        }
        other => other,
    }
}

fn note_learning_rate(learning_rate: Option<f64>) {
    if let Some(rate) = learning_rate {
        warn!(rate, "Requested learning rate ignored, step size follows the data");
    }
}

fn checked_iterations(requested: Option<usize>, config: &EngineConfig) -> Result<usize> {
    let iterations = requested.unwrap_or(DEFAULT_ITERATIONS);
    config.check_iterations(iterations)?;
    Ok(iterations)
}

/// Fits a degree-`d` polynomial from zero weights.
pub fn compute_linear_regression(request: &RegressionRequest, config: &EngineConfig) -> Result<RegressionReport> {
    config.check_degree(request.degree)?;
    let iterations = checked_iterations(request.iterations, config)?;
    note_learning_rate(request.learning_rate);

    let state = Algorithm::LinearRegression.fresh_state(request.degree);
    let result = linear::step(&request.points, &state, iterations, config).map(RegressionReport::from);
    or_empty(result, RegressionReport::empty)
}

/// Fits a two-class polynomial decision function from zero weights.
pub fn compute_logistic_regression(
    request: &ClassificationRequest,
    config: &EngineConfig,
) -> Result<ClassificationReport> {
    config.check_degree(request.degree)?;
    let iterations = checked_iterations(request.iterations, config)?;
    note_learning_rate(request.learning_rate);

    let state = Algorithm::LogisticRegression.fresh_state(request.degree);
    let result = logistic::step(&request.points, &state, iterations, config).map(ClassificationReport::from);
    or_empty(result, ClassificationReport::empty)
}

fn given_centroids(request: &KMeansStepRequest, step: KMeansStepType) -> Result<Vec<Centroid>> {
    let given = request
        .centroids
        .as_deref()
        .ok_or_else(|| VisualizerError::MissingCentroids(step.to_string()))?;
    if given.len() != request.k {
        return Err(VisualizerError::CentroidCountMismatch { expected: request.k, found: given.len() });
    }
    Ok(indexed_centroids(given))
}

/// The map must name a cluster for every point index `0..n` and nothing else.
fn given_assignments(request: &KMeansStepRequest) -> Result<Vec<usize>> {
    let n = request.points.len();
    let map = request.assignments.as_ref();
    let assigned = map.map_or(0, |m| m.keys().filter(|&&i| i < n).count());
    match map {
        Some(m) if m.len() == n && assigned == n => Ok((0..n).filter_map(|i| m.get(&i).copied()).collect()),
        _ => Err(VisualizerError::MissingAssignments { assigned, points: n }),
    }
}

/// Runs one k-means operation on client-held state.
pub fn kmeans_step<R: Rng + ?Sized>(request: &KMeansStepRequest, config: &EngineConfig, rng: &mut R) -> Result<KMeansReport> {
    config.check_clusters(request.k)?;
    let step: KMeansStepType = request.step_type.parse()?;
    let points = &request.points;
    let tolerance = config.centroid_tolerance;
    debug!(%step, k = request.k, points = points.len(), "K-Means step requested");

    match step {
        KMeansStepType::Initialize => {
            let state = kmeans::initialize(points, request.k, rng)?;
            let state = kmeans::advance(points, &state, tolerance)?;
            Ok(KMeansReport::from_state(&state, None))
        }
        KMeansStepType::AssignPoints => {
            let centroids = given_centroids(request, step)?;
            let assignments = kmeans::assign_points(points, &centroids)?;
            let state = KMeansState {
                k: request.k,
                centroids,
                assignments: Some(assignments),
                phase: Phase::Update,
                converged: false,
            };
            Ok(KMeansReport::from_state(&state, None))
        }
        KMeansStepType::UpdateCentroids => {
            let centroids = given_centroids(request, step)?;
            let assignments = given_assignments(request)?;
            let update = kmeans::update_centroids_with_tolerance(points, &assignments, &centroids, request.k, tolerance)?;
            let state = KMeansState {
                k: request.k,
                centroids: update.centroids,
                assignments: Some(assignments),
                phase: if update.converged { Phase::Update } else { Phase::Assign },
                converged: update.converged,
            };
            Ok(KMeansReport::from_state(&state, None))
        }
        KMeansStepType::FullIteration => {
            let centroids = given_centroids(request, step)?;
            let (assignments, update) = kmeans::full_iteration(points, &centroids, request.k, tolerance)?;
            let state = KMeansState {
                k: request.k,
                centroids: update.centroids,
                assignments: Some(assignments),
                phase: if update.converged { Phase::Update } else { Phase::Assign },
                converged: update.converged,
            };
            Ok(KMeansReport::from_state(&state, Some(1)))
        }
        KMeansStepType::RunToConvergence => {
            let centroids = given_centroids(request, step)?;
            let max_iterations = request.max_iterations.unwrap_or(config.kmeans_max_iterations);
            config.check_iterations(max_iterations)?;
            let run = kmeans::run_to_convergence(points, request.k, &centroids, max_iterations, tolerance)?;
            Ok(KMeansReport::from(run))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn diagonal() -> Vec<Point> {
        vec![Point::new(-1.0, -1.0), Point::new(0.0, 0.0), Point::new(1.0, 1.0)]
    }

    fn groups() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 11.0),
            Point::new(11.0, 10.0),
        ]
    }

    fn kmeans_request(step_type: &str) -> KMeansStepRequest {
        KMeansStepRequest {
            points: groups(),
            k: 2,
            step_type: step_type.to_string(),
            centroids: None,
            assignments: None,
            max_iterations: None,
        }
    }

    #[test]
    fn test_linear_regression_request() {
        let request = RegressionRequest { points: diagonal(), degree: 1, iterations: None, learning_rate: Some(0.01) };
        let report = compute_linear_regression(&request, &EngineConfig::default()).unwrap();
        assert!(report.converged);
        assert_eq!(report.coefficients.len(), 2);
        assert!(report.coefficients[0].abs() < 1e-4);
        assert!((report.coefficients[1] - 1.0).abs() < 1e-4);
        assert_eq!(report.line_points.len(), 1000);
    }

    #[test]
    fn test_linear_regression_not_enough_points() {
        let request = RegressionRequest { points: vec![Point::new(1.0, 1.0)], degree: 1, iterations: Some(10), learning_rate: None };
        assert_eq!(compute_linear_regression(&request, &EngineConfig::default()).unwrap(), RegressionReport::empty());
    }

    #[test]
    fn test_request_limits() {
        let config = EngineConfig::default();
        let request = RegressionRequest { points: diagonal(), degree: 6, iterations: None, learning_rate: None };
        assert_eq!(compute_linear_regression(&request, &config), Err(VisualizerError::InvalidDegree(6)));
        let request = RegressionRequest { points: diagonal(), degree: 1, iterations: Some(0), learning_rate: None };
        assert_eq!(
            compute_linear_regression(&request, &config),
            Err(VisualizerError::InvalidIterations { iterations: 0, max: 10_000 })
        );
        let mut request = kmeans_request("initialize");
        request.k = 11;
        assert_eq!(
            kmeans_step(&request, &config, &mut StdRng::seed_from_u64(0)),
            Err(VisualizerError::InvalidClusterCount(11))
        );
    }

    #[test]
    fn test_logistic_needs_two_classes() {
        let config = EngineConfig::default();
        let one_class = ClassificationRequest {
            points: vec![LabeledPoint::new(0.0, 0.0, 1), LabeledPoint::new(1.0, 1.0, 1)],
            degree: 1,
            iterations: None,
            learning_rate: None,
        };
        assert_eq!(compute_logistic_regression(&one_class, &config).unwrap(), ClassificationReport::empty());

        let three_classes = ClassificationRequest {
            points: vec![LabeledPoint::new(0.0, 0.0, 0), LabeledPoint::new(1.0, 1.0, 1), LabeledPoint::new(2.0, 0.0, 2)],
            degree: 1,
            iterations: None,
            learning_rate: None,
        };
        assert_eq!(
            compute_logistic_regression(&three_classes, &config),
            Err(VisualizerError::LabelCardinality { distinct: 3 })
        );
    }

    #[test]
    fn test_kmeans_initialize_assigns() {
        let request = kmeans_request("initialize");
        let report = kmeans_step(&request, &EngineConfig::default(), &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(report.centroids.len(), 2);
        assert_eq!(report.assignments.len(), 6);
        assert_eq!(report.phase, Some(Phase::Update));
        assert!(!report.converged);
    }

    #[test]
    fn test_kmeans_step_needs_centroids() {
        let request = kmeans_request("assign_points");
        assert_eq!(
            kmeans_step(&request, &EngineConfig::default(), &mut StdRng::seed_from_u64(0)),
            Err(VisualizerError::MissingCentroids("assign_points".to_string()))
        );
        let mut request = kmeans_request("full_iteration");
        request.centroids = Some(vec![Point::new(0.0, 0.0)]);
        assert_eq!(
            kmeans_step(&request, &EngineConfig::default(), &mut StdRng::seed_from_u64(0)),
            Err(VisualizerError::CentroidCountMismatch { expected: 2, found: 1 })
        );
        let request = kmeans_request("shuffle");
        assert_eq!(
            kmeans_step(&request, &EngineConfig::default(), &mut StdRng::seed_from_u64(0)),
            Err(VisualizerError::UnknownStepType("shuffle".to_string()))
        );
    }

    #[test]
    fn test_kmeans_update_from_map() {
        let mut request = kmeans_request("update_centroids");
        request.centroids = Some(vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)]);
        request.assignments = Some((0..6).map(|i| (i, if i < 3 { 0 } else { 1 })).collect());
        let report = kmeans_step(&request, &EngineConfig::default(), &mut StdRng::seed_from_u64(0)).unwrap();
        assert!((report.centroids[0].point.x - 1.0 / 3.0).abs() < 1e-12);
        assert!((report.centroids[1].point.x - 31.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.assignments, vec![0, 0, 0, 1, 1, 1]);

        request.assignments = Some((0..5).map(|i| (i, 0)).collect());
        assert_eq!(
            kmeans_step(&request, &EngineConfig::default(), &mut StdRng::seed_from_u64(0)),
            Err(VisualizerError::MissingAssignments { assigned: 5, points: 6 })
        );
    }

    #[test]
    fn test_kmeans_run_to_convergence() {
        let mut request = kmeans_request("run_to_convergence");
        request.centroids = Some(vec![Point::new(0.0, 0.0), Point::new(0.0, 1.0)]);
        let report = kmeans_step(&request, &EngineConfig::default(), &mut StdRng::seed_from_u64(0)).unwrap();
        assert!(report.converged);
        assert!(report.iterations_run.unwrap_or(0) <= 10);
        let map = report.assignment_map();
        assert_eq!(map[&0], map[&1]);
        assert_ne!(map[&0], map[&3]);
    }
}
