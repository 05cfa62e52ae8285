//! Shared test utilities and fixture generators

#![allow(dead_code)]

use cascade_svm::pipeline::*;
use polars::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Scaled Iris train/test partitions as produced by the default CLI run
pub struct PreparedIris {
    pub split: TrainTestSplit,
    pub scaler: FeatureScaler,
    pub x_train: Vec<Vec<f64>>,
    pub x_test: Vec<Vec<f64>>,
}

/// Iris split 75/25 with `seed`, standardized on the training rows
pub fn prepare_iris(seed: u64) -> PreparedIris {
    let dataset = load_iris();
    let split = stratified_split(&dataset, 0.25, seed).unwrap();
    let scaler = FeatureScaler::fit(&split.train.features).unwrap();
    let x_train = scaler.transform(&split.train.features).unwrap();
    let x_test = scaler.transform(&split.test.features).unwrap();
    PreparedIris {
        split,
        scaler,
        x_train,
        x_test,
    }
}

/// Cascade trained on prepared Iris with C = 1 for both stages
pub fn fitted_iris_cascade(prepared: &PreparedIris) -> CascadeClassifier {
    let mut model =
        CascadeClassifier::new(1.0, 1.0, "setosa", &prepared.split.train.labels).unwrap();
    model
        .fit(&prepared.x_train, &prepared.split.train.labels)
        .unwrap();
    model
}

/// Small three-class DataFrame with a string label column
pub fn create_labeled_dataframe() -> DataFrame {
    df! {
        "x1" => [0.0f64, 0.2, 0.1, 5.0, 5.2, 4.9, 9.0, 9.1, 8.8],
        "x2" => [1i32, 2, 1, 5, 6, 5, 9, 9, 10],
        "kind" => ["a", "a", "a", "b", "b", "b", "c", "c", "c"],
    }
    .unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Write the built-in Iris table to a temporary CSV
pub fn create_iris_csv() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("iris.csv");
    write_dataset_csv(&load_iris(), "species", &csv_path).unwrap();
    (temp_dir, csv_path)
}
