//! Integration tests for report assembly and export

use cascade_svm::pipeline::*;
use cascade_svm::report::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

fn build_iris_report() -> CascadeReport {
    let prepared = prepare_iris(42);
    let model = fitted_iris_cascade(&prepared);
    let truth = &prepared.split.test.labels;
    let predictions = model.predict(&prepared.x_test).unwrap();
    let records = predictions_table(&prepared.split.test_indices, &predictions, truth).unwrap();

    let feature_names = load_iris().feature_names;
    let mut builder = CascadeReportBuilder::new(ReportBuilderParams {
        input_source: "built-in iris".to_string(),
        label_column: "species".to_string(),
        feature_names: feature_names.clone(),
        c_stage1: 1.0,
        c_stage2: 1.0,
        test_size: 0.25,
        seed: 42,
        singleton_class: "setosa".to_string(),
        merged_classes: ["versicolor".to_string(), "virginica".to_string()],
    });
    builder.set_split_sizes(112, 38);

    for stage in [Stage::One, Stage::Two] {
        let standardized = model.hyperplane(stage).unwrap();
        let original = standardized.to_original_space(&prepared.scaler).unwrap();
        builder.set_stage(StageReport::new(
            stage,
            stage.to_string(),
            &feature_names,
            &standardized,
            &original,
            None,
        ));
    }

    let pca = Pca::fit(&prepared.x_train).unwrap();
    let points = pca.transform(&prepared.x_test).unwrap();
    builder.set_projection(ProjectionReport::new(&pca, &points, &records));
    builder.set_evaluation(
        evaluate(&predictions, truth, "setosa").unwrap(),
        confusion_matrix(&predictions, truth).unwrap(),
        records,
    );
    builder.set_timing(&RunSummary::new(112, 38));
    builder.build().unwrap()
}

#[test]
fn test_report_contents() {
    let report = build_iris_report();
    assert_eq!(report.metadata.n_samples, 150);
    assert_eq!(report.stages.len(), 2);
    assert_eq!(report.stage(1).unwrap().weights.len(), 4);
    assert_eq!(report.predictions.len(), 38);
    assert_eq!(report.projection.as_ref().unwrap().points.len(), 38);
    assert_eq!(report.settings.kernel, "linear");
}

#[test]
fn test_html_report_sections() {
    let report = build_iris_report();
    let html = render_html(&report).unwrap();

    for needle in [
        "<!DOCTYPE html>",
        "Training Configuration",
        "Stage 1 C: 1",
        "Split: 75/25 Stratified",
        "Random State: 42",
        "Stage 1 - Hyperplane &amp; Margin (Singleton vs Merged)",
        "Stage 2 - Hyperplane &amp; Margin (versicolor vs virginica)",
        "Weight (Standardized)",
        "Weight (Original)",
        "petal length (cm)",
        "Test Set Accuracy",
        "Predictions vs Ground Truth (25% Test Set)",
        "Confusion Matrix",
        "PCA 2D Scatter Plot (Test Set)",
        "</html>",
    ] {
        assert!(html.contains(needle), "missing {:?}", needle);
    }
    assert_eq!(html.matches("<svg").count(), 2);
}

#[test]
fn test_html_escapes_class_names() {
    let mut report = build_iris_report();
    report.settings.singleton_class = "<script>".to_string();
    let html = render_html(&report).unwrap();
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));
}

#[test]
fn test_export_json_and_csv() {
    let report = build_iris_report();
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("results.json");
    let csv_path = dir.path().join("predictions.csv");

    export_results_json(&report, &json_path).unwrap();
    export_predictions_csv(&report.predictions, &csv_path).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(value["settings"]["singleton_class"], "setosa");
    assert_eq!(value["stages"][1]["stage"], 2);
    assert_eq!(value["confusion_matrix"]["labels"][0], "setosa");
    assert_eq!(value["predictions"].as_array().unwrap().len(), 38);

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 39);
    assert!(csv
        .lines()
        .skip(1)
        .filter(|l| l.contains(",Singleton,"))
        .all(|l| l.contains(",Singleton,,setosa,")));
}

#[test]
fn test_bundle_contains_all_outputs() {
    let report = build_iris_report();
    let dir = tempfile::tempdir().unwrap();
    let html_path = dir.path().join("report.html");
    let json_path = dir.path().join("results.json");
    let csv_path = dir.path().join("predictions.csv");
    write_html_report(&report, &html_path).unwrap();
    export_results_json(&report, &json_path).unwrap();
    export_predictions_csv(&report.predictions, &csv_path).unwrap();

    let zip_path = dir.path().join("cascade_report.zip");
    package_reports(
        &[html_path.as_path(), json_path.as_path(), csv_path.as_path()],
        &zip_path,
    )
    .unwrap();

    let archive = zip::ZipArchive::new(std::fs::File::open(&zip_path).unwrap()).unwrap();
    assert_eq!(archive.len(), 3);
}
