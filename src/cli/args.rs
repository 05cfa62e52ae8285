//! Command-line argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::pipeline::IRIS_LABEL_COLUMN;

/// Cascade-SVM - Two-stage linear SVM cascade with an HTML report
#[derive(Parser, Debug)]
#[command(name = "cascade-svm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input CSV file with numeric feature columns and one label column.
    /// Defaults to the built-in Iris dataset.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Name of the label column in the input CSV
    #[arg(short, long, default_value = IRIS_LABEL_COLUMN)]
    pub label_column: String,

    /// Class separated from the other two at stage 1
    #[arg(short, long, default_value = "setosa")]
    pub singleton: String,

    /// Regularization strength C of the stage 1 SVM
    #[arg(long, default_value = "1.0", value_parser = validate_c)]
    pub c_stage1: f64,

    /// Regularization strength C of the stage 2 SVM
    #[arg(long, default_value = "1.0", value_parser = validate_c)]
    pub c_stage2: f64,

    /// Fraction of each class held out for testing (stratified)
    #[arg(long, default_value = "0.25", value_parser = validate_test_size)]
    pub test_size: f64,

    /// Seed for the train/test shuffle
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Directory for report.html, results.json and predictions.csv
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Also package the outputs into a zip archive
    #[arg(long, default_value = "false")]
    pub bundle: bool,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the built-in Iris dataset to a CSV file
    ExportIris {
        /// Output file path
        #[arg(default_value = "iris.csv")]
        output: PathBuf,

        /// Name of the label column in the written file
        #[arg(short, long, default_value = IRIS_LABEL_COLUMN)]
        label_column: String,
    },
}

/// Where the dataset comes from
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    BuiltInIris,
    Csv(PathBuf),
}

impl DataSource {
    pub fn describe(&self) -> String {
        match self {
            DataSource::BuiltInIris => "built-in iris".to_string(),
            DataSource::Csv(path) => path.display().to_string(),
        }
    }
}

/// Resolved settings for one cascade run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: DataSource,
    pub label_column: String,
    pub singleton: String,
    pub c_stage1: f64,
    pub c_stage2: f64,
    pub test_size: f64,
    pub seed: u64,
    pub output_dir: PathBuf,
    pub bundle: bool,
    pub confirm: bool,
    pub infer_schema_length: usize,
}

impl RunConfig {
    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join("report.html")
    }

    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join("results.json")
    }

    pub fn predictions_path(&self) -> PathBuf {
        self.output_dir.join("predictions.csv")
    }

    pub fn bundle_path(&self) -> PathBuf {
        self.output_dir.join("cascade_report.zip")
    }

    /// Output files of this run that already exist on disk
    pub fn existing_outputs(&self) -> Vec<PathBuf> {
        let mut paths = vec![
            self.report_path(),
            self.results_path(),
            self.predictions_path(),
        ];
        if self.bundle {
            paths.push(self.bundle_path());
        }
        paths.into_iter().filter(|p| p.exists()).collect()
    }
}

impl From<&Cli> for RunConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            source: cli
                .input
                .clone()
                .map_or(DataSource::BuiltInIris, DataSource::Csv),
            label_column: cli.label_column.clone(),
            singleton: cli.singleton.clone(),
            c_stage1: cli.c_stage1,
            c_stage2: cli.c_stage2,
            test_size: cli.test_size,
            seed: cli.seed,
            output_dir: cli.output_dir.clone(),
            bundle: cli.bundle,
            confirm: !cli.no_confirm,
            infer_schema_length: cli.infer_schema_length,
        }
    }
}

impl Cli {
    pub fn run_config(&self) -> RunConfig {
        RunConfig::from(self)
    }
}

/// Validator for the C parameters
fn validate_c(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(value.is_finite() && value > 0.0) {
        Err(format!("C must be a positive number, got {}", value))
    } else {
        Ok(value)
    }
}

/// Validator for test_size parameter
fn validate_test_size(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(value > 0.0 && value < 1.0) {
        Err(format!(
            "test_size must be strictly between 0.0 and 1.0, got {}",
            value
        ))
    } else {
        Ok(value)
    }
}
