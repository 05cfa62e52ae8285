//! Integration tests for the full train / predict / evaluate pipeline

use cascade_svm::pipeline::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_default_split_sizes() {
    let prepared = prepare_iris(42);
    assert_eq!(prepared.split.train.len(), 112);
    assert_eq!(prepared.split.test.len(), 38);
}

#[test]
fn test_setosa_is_perfectly_routed() {
    let prepared = prepare_iris(42);
    let model = fitted_iris_cascade(&prepared);
    let predictions = model.predict(&prepared.x_test).unwrap();

    let stage1 = stage1_accuracy(&predictions, &prepared.split.test.labels, "setosa").unwrap();
    assert_eq!(stage1, 1.0);
}

#[test]
fn test_all_errors_come_from_the_merged_pair() {
    let prepared = prepare_iris(42);
    let model = fitted_iris_cascade(&prepared);
    let truth = &prepared.split.test.labels;
    let predictions = model.predict(&prepared.x_test).unwrap();
    let metrics = evaluate(&predictions, truth, "setosa").unwrap();

    let n_singleton = truth.iter().filter(|t| *t == "setosa").count();
    let n_merged = truth.len() - n_singleton;
    let merged_correct = (metrics.stage2_accuracy.unwrap() * n_merged as f64).round() as usize;

    assert_eq!(metrics.correct, n_singleton + merged_correct);
    assert!(
        metrics.accuracy >= 0.85,
        "unexpectedly low accuracy {}",
        metrics.accuracy
    );
}

#[test]
fn test_confusion_matrix_matches_accuracy() {
    let prepared = prepare_iris(42);
    let model = fitted_iris_cascade(&prepared);
    let truth = &prepared.split.test.labels;
    let predictions = model.predict(&prepared.x_test).unwrap();

    let cm = confusion_matrix(&predictions, truth).unwrap();
    assert_eq!(cm.labels, vec!["setosa", "versicolor", "virginica"]);
    assert_eq!(cm.total(), truth.len());

    let expected_rows: Vec<usize> = prepared.split.test.class_counts().into_values().collect();
    assert_eq!(cm.row_totals(), expected_rows);

    let acc = accuracy(&predictions, truth).unwrap();
    assert!((acc - cm.trace() as f64 / cm.total() as f64).abs() < 1e-12);
}

#[test]
fn test_predictions_table_follows_row_index() {
    let prepared = prepare_iris(42);
    let model = fitted_iris_cascade(&prepared);
    let predictions = model.predict(&prepared.x_test).unwrap();
    let table = predictions_table(
        &prepared.split.test_indices,
        &predictions,
        &prepared.split.test.labels,
    )
    .unwrap();

    assert_eq!(table.len(), 38);
    assert!(table.windows(2).all(|w| w[0].index < w[1].index));

    let iris = load_iris();
    for record in &table {
        assert_eq!(record.ground_truth, iris.labels[record.index]);
        assert_eq!(record.correct, record.ground_truth == record.final_pred);
    }
}

#[test]
fn test_identical_runs_are_bit_identical() {
    let run = |seed| {
        let prepared = prepare_iris(seed);
        let model = fitted_iris_cascade(&prepared);
        (
            model.hyperplane(Stage::One).unwrap(),
            model.hyperplane(Stage::Two).unwrap(),
            model.predict(&prepared.x_test).unwrap(),
        )
    };

    assert_eq!(run(42), run(42));
}

#[test]
fn test_different_seed_changes_split() {
    assert_ne!(
        prepare_iris(42).split.test_indices,
        prepare_iris(7).split.test_indices
    );
}

#[test]
fn test_pca_projection_of_test_set() {
    let prepared = prepare_iris(42);
    let pca = Pca::fit(&prepared.x_train).unwrap();
    let points = pca.transform(&prepared.x_test).unwrap();

    assert_eq!(points.len(), prepared.x_test.len());
    let ratio = pca.explained_variance_ratio();
    assert!(ratio[0] > ratio[1]);
    assert!(ratio[0] + ratio[1] <= 1.0 + 1e-9);
    // Standardized Iris: the first two components carry most of the variance
    assert!(ratio[0] + ratio[1] > 0.9);
}

#[test]
fn test_evaluation_of_singleton_only_test_split() {
    let dataset = load_iris();
    let split = stratified_split(&dataset, 0.005, 42).unwrap();
    assert_eq!(split.test.labels, vec!["setosa"]);

    let scaler = FeatureScaler::fit(&split.train.features).unwrap();
    let x_train = scaler.transform(&split.train.features).unwrap();
    let x_test = scaler.transform(&split.test.features).unwrap();
    let mut model = CascadeClassifier::new(1.0, 1.0, "setosa", &split.train.labels).unwrap();
    model.fit(&x_train, &split.train.labels).unwrap();

    let predictions = model.predict(&x_test).unwrap();
    let metrics = evaluate(&predictions, &split.test.labels, "setosa").unwrap();
    assert_eq!(metrics.accuracy, 1.0);
    assert_eq!(metrics.stage2_accuracy, None);
    assert!(stage2_accuracy(&predictions, &split.test.labels, "setosa").is_err());

    let cm = confusion_matrix(&predictions, &split.test.labels).unwrap();
    assert_eq!(cm.trace(), 1);
}
