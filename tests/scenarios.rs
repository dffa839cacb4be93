use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use ml_visual_suite::api::{self, ClassificationRequest, KMeansStepRequest, RegressionRequest};
use ml_visual_suite::regression::{features, logistic};
use ml_visual_suite::{EngineConfig, LabeledPoint, Point, Session, SessionStatus, VisualizerError};

fn two_groups() -> Vec<Point> {
    [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (10.0, 10.0), (10.0, 11.0), (11.0, 10.0)]
        .into_iter()
        .map(Point::from)
        .collect()
}

fn separated_pairs() -> Vec<LabeledPoint> {
    vec![
        LabeledPoint::new(-3.0, -3.0, 0),
        LabeledPoint::new(-4.0, -3.0, 0),
        LabeledPoint::new(3.0, 3.0, 1),
        LabeledPoint::new(4.0, 3.0, 1),
    ]
}

#[test]
fn scenario_a_line_through_the_diagonal() {
    let request = RegressionRequest {
        points: vec![Point::new(-1.0, -1.0), Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
        degree: 1,
        iterations: Some(1000),
        learning_rate: None,
    };
    let report = api::compute_linear_regression(&request, &EngineConfig::default()).unwrap();
    assert!(report.converged);
    assert_abs_diff_eq!(report.coefficients[0], 0.0, epsilon = 1e-4);
    assert_abs_diff_eq!(report.coefficients[1], 1.0, epsilon = 1e-4);
    assert!(report.cost.unwrap() < 1e-8);

    // The sampled curve spans the plot left to right.
    let first = report.line_points.first().unwrap();
    let last = report.line_points.last().unwrap();
    assert_abs_diff_eq!(first.x, -10.0, epsilon = 1e-12);
    assert_abs_diff_eq!(last.x, 10.0, epsilon = 1e-12);
    assert_abs_diff_eq!(last.y, 10.0, epsilon = 1e-2);
}

#[test]
fn scenario_b_separated_pairs() {
    let config = EngineConfig::default();
    let request = ClassificationRequest { points: separated_pairs(), degree: 1, iterations: Some(10_000), learning_rate: None };
    let report = api::compute_logistic_regression(&request, &config).unwrap();
    assert!(report.converged);
    assert_eq!(report.coefficients.len(), features::classification_feature_count(1));

    let negative_centre = Point::new(-3.5, -3.0);
    let positive_centre = Point::new(3.5, 3.0);
    assert!(logistic::decision_value(&negative_centre, 1, &report.coefficients) < 0.0);
    assert!(logistic::decision_value(&positive_centre, 1, &report.coefficients) > 0.0);

    let classes = report.classes.unwrap();
    for p in &request.points {
        assert_eq!(logistic::predict(&p.point, 1, &report.coefficients, &classes), p.label);
    }

    let field = report.field.as_ref().unwrap();
    assert_eq!(field.xs.len(), config.grid_resolution);
    assert_eq!(field.values.len(), config.grid_resolution);
    // One straight boundary crossing the whole plot.
    assert_eq!(report.boundary.len(), 1);
    assert!(report.boundary[0].len() > 2);
}

#[test]
fn scenario_c_two_tight_groups() {
    let config = EngineConfig::default();
    let mut rng = StdRng::seed_from_u64(2024);
    let init = KMeansStepRequest {
        points: two_groups(),
        k: 2,
        step_type: "initialize".to_string(),
        centroids: None,
        assignments: None,
        max_iterations: None,
    };
    let seeded = api::kmeans_step(&init, &config, &mut rng).unwrap();

    let run = KMeansStepRequest {
        step_type: "run_to_convergence".to_string(),
        centroids: Some(seeded.centroids.iter().map(|c| c.point).collect()),
        ..init
    };
    let report = api::kmeans_step(&run, &config, &mut rng).unwrap();
    assert!(report.converged);
    assert!(report.iterations_run.unwrap() <= 10);

    let mut centres: Vec<Point> = report.centroids.iter().map(|c| c.point).collect();
    centres.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap());
    assert_abs_diff_eq!(centres[0].x, 1.0 / 3.0, epsilon = 1e-9);
    assert_abs_diff_eq!(centres[0].y, 1.0 / 3.0, epsilon = 1e-9);
    assert_abs_diff_eq!(centres[1].x, 31.0 / 3.0, epsilon = 1e-9);
    assert_abs_diff_eq!(centres[1].y, 31.0 / 3.0, epsilon = 1e-9);

    let a = &report.assignments;
    assert!(a[0] == a[1] && a[1] == a[2]);
    assert!(a[3] == a[4] && a[4] == a[5]);
    assert_ne!(a[0], a[3]);
}

#[test]
fn scenario_d_empty_cluster_keeps_centroid() {
    let request = KMeansStepRequest {
        points: vec![Point::new(0.0, 0.0), Point::new(2.0, 0.0)],
        k: 2,
        step_type: "update_centroids".to_string(),
        centroids: Some(vec![Point::new(1.0, 0.0), Point::new(5.123, -7.5)]),
        assignments: Some([(0, 0), (1, 0)].into_iter().collect()),
        max_iterations: None,
    };
    let report = api::kmeans_step(&request, &EngineConfig::default(), &mut StdRng::seed_from_u64(0)).unwrap();
    assert_eq!(report.centroids[1].point, Point::new(5.123, -7.5));
    assert_eq!(report.centroids[0].point, Point::new(1.0, 0.0));
    assert!(report.converged);
}

#[test]
fn interactive_session_walkthrough() {
    let mut session = Session::with_seed(EngineConfig::default(), 99);
    assert_eq!(session.status().to_string(), "Click on the graph to add data points");

    for p in separated_pairs() {
        session.add_point(p);
    }
    let mut report = session.logistic_regression_step(1, 100).unwrap();
    let mut calls = 1;
    while !report.converged {
        report = session.logistic_regression_step(1, 100).unwrap();
        calls += 1;
        assert!(calls < 100, "logistic fit never converged");
    }
    assert_eq!(session.status(), SessionStatus::Converged);

    session.add_point(LabeledPoint::new(0.0, 5.0, 1));
    assert_eq!(session.status(), SessionStatus::NotConverged);

    let kmeans = session.kmeans_reinitialize(2).unwrap();
    assert_eq!(kmeans.assignments.len(), 5);
    assert_eq!(
        session.kmeans_iteration(6, 1).unwrap().centroids.len(),
        0,
        "more clusters than points yields an empty report"
    );
    assert_eq!(session.status().to_string(), "Add more data points than clusters");
}

#[test]
fn invalid_requests_are_rejected() {
    let config = EngineConfig::default();
    let request = KMeansStepRequest {
        points: two_groups(),
        k: 0,
        step_type: "initialize".to_string(),
        centroids: None,
        assignments: None,
        max_iterations: None,
    };
    assert_eq!(
        api::kmeans_step(&request, &config, &mut StdRng::seed_from_u64(0)),
        Err(VisualizerError::InvalidClusterCount(0))
    );
    let mut session = Session::with_seed(config, 1);
    assert_eq!(session.linear_regression_step(0, 10), Err(VisualizerError::InvalidDegree(0)));
}

#[cfg(feature = "serde")]
#[test]
fn requests_parse_from_web_json() {
    let body = r#"{
        "points": [{"x": 0, "y": 0}, {"x": 2, "y": 0}],
        "k": 2,
        "step_type": "update_centroids",
        "centroids": [{"x": 1, "y": 0}, {"x": 5, "y": 5}],
        "assignments": {"0": 0, "1": 0}
    }"#;
    let request: KMeansStepRequest = serde_json::from_str(body).unwrap();
    assert_eq!(request.assignments.as_ref().map(|a| a.len()), Some(2));
    assert!(request.max_iterations.is_none());
    let report = api::kmeans_step(&request, &EngineConfig::default(), &mut StdRng::seed_from_u64(0)).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["converged"], serde_json::Value::Bool(true));

    let labeled: ClassificationRequest =
        serde_json::from_str(r#"{"points": [{"x": 1.5, "y": -2, "label": 1}], "degree": 2}"#).unwrap();
    assert_eq!(labeled.points[0], LabeledPoint::new(1.5, -2.0, 1));
    assert!(labeled.iterations.is_none());
}
