//! Per-client interactive state.
//!
//! A `Session` owns the clicked points and the in-progress fit of every algorithm,
//! so repeated requests continue where the last one stopped. `SessionStore` keeps
//! independent sessions apart by id.

use std::collections::HashMap;
use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::api::or_empty;
use crate::common_types::{LabeledPoint, Point};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::kmeans::{self, KMeansState};
use crate::regression::{Algorithm, FitState, linear, logistic};
use crate::report::{ClassificationReport, KMeansReport, RegressionReport};

/// The info line shown under the plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NoData,
    NeedMorePoints,
    Converged,
    NotConverged,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionStatus::NoData => "Click on the graph to add data points",
            SessionStatus::NeedMorePoints => "Add more data points than clusters",
            SessionStatus::Converged => "Algorithm has converged",
            SessionStatus::NotConverged => "Algorithm has not converged",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastRun {
    Regression(Algorithm),
    KMeans,
}

#[derive(Debug, Clone)]
pub struct Session {
    points: Vec<LabeledPoint>,
    linear: Option<FitState>,
    logistic: Option<FitState>,
    kmeans: Option<KMeansState>,
    requested_k: Option<usize>,
    last_run: Option<LastRun>,
    config: EngineConfig,
    rng: StdRng,
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Reproducible centroid seeding.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EngineConfig, rng: StdRng) -> Self {
        Session {
            points: Vec::new(),
            linear: None,
            logistic: None,
            kmeans: None,
            requested_k: None,
            last_run: None,
            config,
            rng,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Coordinates of every point, labels dropped.
    pub fn points(&self) -> Vec<Point> {
        self.points.iter().map(|p| p.point).collect()
    }

    pub fn labeled_points(&self) -> &[LabeledPoint] {
        &self.points
    }

    /// The dataset labeled by current cluster membership. Labels are returned
    /// unchanged while no assignment covers every point.
    pub fn clustered_points(&self) -> Vec<LabeledPoint> {
        match self.kmeans.as_ref().and_then(|s| s.assignments.as_deref()) {
            Some(assignments) if assignments.len() == self.points.len() => self
                .points
                .iter()
                .zip(assignments)
                .map(|(p, &cluster)| LabeledPoint { point: p.point, label: cluster })
                .collect(),
            _ => self.points.clone(),
        }
    }

    pub fn fit_state(&self, algorithm: Algorithm) -> Option<&FitState> {
        match algorithm {
            Algorithm::LinearRegression => self.linear.as_ref(),
            Algorithm::LogisticRegression => self.logistic.as_ref(),
        }
    }

    pub fn set_fit_state(&mut self, algorithm: Algorithm, state: FitState) {
        match algorithm {
            Algorithm::LinearRegression => self.linear = Some(state),
            Algorithm::LogisticRegression => self.logistic = Some(state),
        }
    }

    pub fn kmeans_state(&self) -> Option<&KMeansState> {
        self.kmeans.as_ref()
    }

    pub fn set_kmeans_state(&mut self, state: KMeansState) {
        self.kmeans = Some(state);
    }

    /// Appends a point. Regression fits restart from zero weights; k-means keeps its
    /// centroids but must reassign before the next update.
    pub fn add_point(&mut self, point: impl Into<LabeledPoint>) {
        let point = point.into();
        self.points.push(point);
        self.linear = None;
        self.logistic = None;
        if let Some(state) = self.kmeans.as_mut() {
            state.invalidate_assignments();
        }
        debug!(x = point.point.x, y = point.point.y, label = point.label, total = self.points.len(), "Point added");
    }

    /// Drops all points and all algorithm state.
    pub fn clear(&mut self) {
        self.points.clear();
        self.linear = None;
        self.logistic = None;
        self.kmeans = None;
        self.requested_k = None;
        self.last_run = None;
        debug!("Session cleared");
    }

    /// Stored state when it matches `degree`, otherwise zero weights.
    fn resume(&self, algorithm: Algorithm, degree: usize) -> FitState {
        match self.fit_state(algorithm) {
            Some(state) if state.degree == degree => state.clone(),
            Some(state) => {
                debug!(?algorithm, from = state.degree, to = degree, "Degree changed, restarting fit");
                algorithm.fresh_state(degree)
            }
            None => algorithm.fresh_state(degree),
        }
    }

    /// Runs up to `iterations` more gradient steps of the linear fit.
    pub fn linear_regression_step(&mut self, degree: usize, iterations: usize) -> Result<RegressionReport> {
        self.config.check_degree(degree)?;
        self.config.check_iterations(iterations)?;
        self.last_run = Some(LastRun::Regression(Algorithm::LinearRegression));

        let state = self.resume(Algorithm::LinearRegression, degree);
        let result = match linear::step(&self.points(), &state, iterations, &self.config) {
            Ok(step) => {
                self.linear = Some(step.state.clone());
                Ok(RegressionReport::from(step))
            }
            Err(err) => Err(err),
        };
        or_empty(result, RegressionReport::empty)
    }

    /// Runs up to `iterations` more gradient steps of the classifier.
    pub fn logistic_regression_step(&mut self, degree: usize, iterations: usize) -> Result<ClassificationReport> {
        self.config.check_degree(degree)?;
        self.config.check_iterations(iterations)?;
        self.last_run = Some(LastRun::Regression(Algorithm::LogisticRegression));

        let state = self.resume(Algorithm::LogisticRegression, degree);
        let result = match logistic::step(&self.points, &state, iterations, &self.config) {
            Ok(step) => {
                self.logistic = Some(step.state.clone());
                Ok(ClassificationReport::from(step))
            }
            Err(err) => Err(err),
        };
        or_empty(result, ClassificationReport::empty)
    }

    /// Advances k-means by up to `half_steps` half-steps, seeding centroids first when
    /// there are none yet or `k` changed.
    pub fn kmeans_iteration(&mut self, k: usize, half_steps: usize) -> Result<KMeansReport> {
        self.config.check_clusters(k)?;
        self.config.check_iterations(half_steps)?;
        self.requested_k = Some(k);
        self.last_run = Some(LastRun::KMeans);

        let coords = self.points();
        if coords.len() < k {
            self.kmeans = None;
            return Ok(KMeansReport::empty());
        }
        let state = match &self.kmeans {
            Some(state) if state.k == k => state.clone(),
            _ => kmeans::initialize(&coords, k, &mut self.rng)?,
        };
        let (next, taken) = kmeans::advance_by(&coords, &state, half_steps, self.config.centroid_tolerance)?;
        debug!(k, half_steps = taken, converged = next.converged, "K-Means advanced");
        let report = KMeansReport::from_state(&next, Some(taken));
        self.kmeans = Some(next);
        Ok(report)
    }

    /// Fresh centroids, assigned immediately; the next half-step moves them.
    pub fn kmeans_reinitialize(&mut self, k: usize) -> Result<KMeansReport> {
        self.config.check_clusters(k)?;
        self.requested_k = Some(k);
        self.last_run = Some(LastRun::KMeans);

        let coords = self.points();
        if coords.len() < k {
            return Ok(self.kmeans.as_ref().map_or_else(KMeansReport::empty, |s| KMeansReport::from_state(s, None)));
        }
        let seeded = kmeans::initialize(&coords, k, &mut self.rng)?;
        let assigned = kmeans::advance(&coords, &seeded, self.config.centroid_tolerance)?;
        let report = KMeansReport::from_state(&assigned, None);
        self.kmeans = Some(assigned);
        Ok(report)
    }

    pub fn status(&self) -> SessionStatus {
        if self.points.is_empty() {
            return SessionStatus::NoData;
        }
        if self.requested_k.is_some_and(|k| self.points.len() < k) {
            return SessionStatus::NeedMorePoints;
        }
        let converged = match self.last_run {
            Some(LastRun::Regression(algorithm)) => self.fit_state(algorithm).is_some_and(|s| s.converged),
            Some(LastRun::KMeans) => self.kmeans.as_ref().is_some_and(|s| s.converged),
            None => false,
        };
        if converged { SessionStatus::Converged } else { SessionStatus::NotConverged }
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new(EngineConfig::default())
    }
}

/// Sessions keyed by client id.
#[derive(Debug, Default)]
pub struct SessionStore {
    config: EngineConfig,
    seed: Option<u64>,
    created: u64,
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    pub fn new(config: EngineConfig) -> Self {
        SessionStore { config, seed: None, created: 0, sessions: HashMap::new() }
    }

    /// Every new session gets its own seed derived from `seed`.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        SessionStore { config, seed: Some(seed), created: 0, sessions: HashMap::new() }
    }

    /// The session for `id`, created on first use.
    pub fn session_mut(&mut self, id: &str) -> &mut Session {
        let config = &self.config;
        let seed = self.seed;
        let created = &mut self.created;
        self.sessions.entry(id.to_string()).or_insert_with(|| {
            // Seeds never repeat, even after sessions are removed.
            let session = match seed {
                Some(seed) => Session::with_seed(config.clone(), seed.wrapping_add(*created)),
                None => Session::new(config.clone()),
            };
            *created += 1;
            debug!(id, created = *created, "New session");
            session
        })
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Session> {
        self.sessions.remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
