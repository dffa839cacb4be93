// Algorithm engines
pub mod kmeans;
pub mod regression;

// Shared types and plumbing
pub mod api;
pub mod common_types;
pub mod config;
pub mod error;
pub mod report;
pub mod session;

pub use common_types::{Centroid, LabeledPoint, PlotExtent, Point};
pub use config::EngineConfig;
pub use error::{Result, VisualizerError};
pub use kmeans::{KMeansState, KMeansStepType, Phase};
pub use regression::{Algorithm, FitState};
pub use report::{ClassificationReport, KMeansReport, RegressionReport};
pub use session::{Session, SessionStatus, SessionStore};

#[cfg(feature = "python")]
mod python {
    use std::collections::BTreeMap;

    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;
    use pyo3::types::{PyDict, PyList};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::api::{self, ClassificationRequest, KMeansStepRequest, RegressionRequest};
    use crate::common_types::{LabeledPoint, Point};
    use crate::config::EngineConfig;
    use crate::error::VisualizerError;
    use crate::report::{ClassificationReport, KMeansReport, RegressionReport};
    use crate::session::{SessionStatus, SessionStore};

    fn to_py_err(err: VisualizerError) -> PyErr {
        PyErr::new::<PyValueError, _>(err.to_string())
    }

    // --- Report -> dict conversion ---

    fn point_list<'py>(py: Python<'py>, points: &[Point]) -> PyResult<Bound<'py, PyList>> {
        let list = PyList::empty_bound(py);
        for p in points {
            let item = PyDict::new_bound(py);
            item.set_item("x", p.x)?;
            item.set_item("y", p.y)?;
            list.append(item)?;
        }
        Ok(list)
    }

    fn regression_dict<'py>(py: Python<'py>, report: &RegressionReport) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new_bound(py);
        dict.set_item("line_points", point_list(py, &report.line_points)?)?;
        dict.set_item("coefficients", report.coefficients.clone())?;
        dict.set_item("cost", report.cost)?;
        dict.set_item("iterations_run", report.iterations_run)?;
        dict.set_item("converged", report.converged)?;
        Ok(dict)
    }

    fn classification_dict<'py>(py: Python<'py>, report: &ClassificationReport) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new_bound(py);
        let (values, xs, ys) = match &report.field {
            Some(field) => (field.values.clone(), field.xs.clone(), field.ys.clone()),
            None => (Vec::new(), Vec::new(), Vec::new()),
        };
        dict.set_item("decision_boundary", values)?;
        dict.set_item("boundary_x_coords", xs)?;
        dict.set_item("boundary_y_coords", ys)?;
        let lines = PyList::empty_bound(py);
        for line in &report.boundary {
            lines.append(point_list(py, line)?)?;
        }
        dict.set_item("boundary_lines", lines)?;
        dict.set_item("coefficients", report.coefficients.clone())?;
        dict.set_item("cost", report.cost)?;
        dict.set_item("iterations_run", report.iterations_run)?;
        dict.set_item("converged", report.converged)?;
        Ok(dict)
    }

    fn kmeans_dict<'py>(py: Python<'py>, report: &KMeansReport) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new_bound(py);
        let centroids: Vec<Point> = report.centroids.iter().map(|c| c.point).collect();
        dict.set_item("centroids", point_list(py, &centroids)?)?;
        dict.set_item("assignments", report.assignment_map())?;
        dict.set_item("converged", report.converged)?;
        dict.set_item("iterations_run", report.iterations_run)?;
        dict.set_item("next_step", report.next_step.as_str())?;
        Ok(dict)
    }

    fn with_info<'py>(dict: Bound<'py, PyDict>, status: SessionStatus) -> PyResult<Bound<'py, PyDict>> {
        dict.set_item("info", status.to_string())?;
        Ok(dict)
    }

    fn to_points(points: Vec<(f64, f64)>) -> Vec<Point> {
        points.into_iter().map(Point::from).collect()
    }

    /// Interactive sessions keyed by client id.
    #[pyclass(name = "SessionStore")]
    struct PySessionStore {
        store: SessionStore,
    }

    #[pymethods]
    impl PySessionStore {
        #[new]
        #[pyo3(signature = (seed = None))]
        fn new(seed: Option<u64>) -> Self {
            let config = EngineConfig::default();
            let store = match seed {
                Some(seed) => SessionStore::with_seed(config, seed),
                None => SessionStore::new(config),
            };
            PySessionStore { store }
        }

        #[pyo3(signature = (session_id, x, y, label = 0))]
        fn add_point(&mut self, session_id: &str, x: f64, y: f64, label: usize) {
            self.store.session_mut(session_id).add_point(LabeledPoint::new(x, y, label));
        }

        fn clear(&mut self, session_id: &str) {
            self.store.session_mut(session_id).clear();
        }

        fn linreg_step<'py>(&mut self, py: Python<'py>, session_id: &str, degree: usize, iterations: usize) -> PyResult<Bound<'py, PyDict>> {
            let session = self.store.session_mut(session_id);
            let report = session.linear_regression_step(degree, iterations).map_err(to_py_err)?;
            with_info(regression_dict(py, &report)?, session.status())
        }

        fn logreg_step<'py>(&mut self, py: Python<'py>, session_id: &str, degree: usize, iterations: usize) -> PyResult<Bound<'py, PyDict>> {
            let session = self.store.session_mut(session_id);
            let report = session.logistic_regression_step(degree, iterations).map_err(to_py_err)?;
            with_info(classification_dict(py, &report)?, session.status())
        }

        fn kmeans_iteration<'py>(&mut self, py: Python<'py>, session_id: &str, k: usize, half_steps: usize) -> PyResult<Bound<'py, PyDict>> {
            let session = self.store.session_mut(session_id);
            let report = session.kmeans_iteration(k, half_steps).map_err(to_py_err)?;
            with_info(kmeans_dict(py, &report)?, session.status())
        }

        fn kmeans_reinitialize<'py>(&mut self, py: Python<'py>, session_id: &str, k: usize) -> PyResult<Bound<'py, PyDict>> {
            let session = self.store.session_mut(session_id);
            let report = session.kmeans_reinitialize(k).map_err(to_py_err)?;
            with_info(kmeans_dict(py, &report)?, session.status())
        }

        fn status(&mut self, session_id: &str) -> String {
            self.store.session_mut(session_id).status().to_string()
        }

        fn remove(&mut self, session_id: &str) -> bool {
            self.store.remove(session_id).is_some()
        }

        fn __len__(&self) -> usize {
            self.store.len()
        }
    }

    #[pyfunction]
    #[pyo3(name = "compute_linear_regression", signature = (points, degree = 1, iterations = None, learning_rate = None))]
    fn compute_linear_regression_py(
        py: Python<'_>,
        points: Vec<(f64, f64)>,
        degree: usize,
        iterations: Option<usize>,
        learning_rate: Option<f64>,
    ) -> PyResult<Py<PyDict>> {
        let request = RegressionRequest { points: to_points(points), degree, iterations, learning_rate };
        let report = api::compute_linear_regression(&request, &EngineConfig::default()).map_err(to_py_err)?;
        Ok(regression_dict(py, &report)?.unbind())
    }

    #[pyfunction]
    #[pyo3(name = "compute_logistic_regression", signature = (points, degree = 1, iterations = None, learning_rate = None))]
    fn compute_logistic_regression_py(
        py: Python<'_>,
        points: Vec<(f64, f64, usize)>,
        degree: usize,
        iterations: Option<usize>,
        learning_rate: Option<f64>,
    ) -> PyResult<Py<PyDict>> {
        let points = points.into_iter().map(LabeledPoint::from).collect();
        let request = ClassificationRequest { points, degree, iterations, learning_rate };
        let report = api::compute_logistic_regression(&request, &EngineConfig::default()).map_err(to_py_err)?;
        Ok(classification_dict(py, &report)?.unbind())
    }

    #[pyfunction]
    #[pyo3(
        name = "kmeans_step",
        signature = (points, k, step_type, centroids = None, assignments = None, max_iterations = None, seed = None)
    )]
    #[allow(clippy::too_many_arguments)]
    fn kmeans_step_py(
        py: Python<'_>,
        points: Vec<(f64, f64)>,
        k: usize,
        step_type: String,
        centroids: Option<Vec<(f64, f64)>>,
        assignments: Option<BTreeMap<usize, usize>>,
        max_iterations: Option<usize>,
        seed: Option<u64>,
    ) -> PyResult<Py<PyDict>> {
        let request = KMeansStepRequest {
            points: to_points(points),
            k,
            step_type,
            centroids: centroids.map(to_points),
            assignments,
            max_iterations,
        };
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let report = api::kmeans_step(&request, &EngineConfig::default(), &mut rng).map_err(to_py_err)?;
        Ok(kmeans_dict(py, &report)?.unbind())
    }

    /// Python entry point; the name must match `lib.name` in `Cargo.toml`.
    #[pymodule]
    fn ml_visual_suite(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(compute_linear_regression_py, m)?)?;
        m.add_function(wrap_pyfunction!(compute_logistic_regression_py, m)?)?;
        m.add_function(wrap_pyfunction!(kmeans_step_py, m)?)?;
        m.add_class::<PySessionStore>()?;
        Ok(())
    }
}
