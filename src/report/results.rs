//! Structured run results
//!
//! Collects the fitted hyperplanes, evaluation metrics, predictions table and PCA
//! projection of one run into a single serialisable [`CascadeReport`], and writes
//! it out as JSON plus a flat predictions CSV.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{
    ConfusionMatrix, Hyperplane, Metrics, Pca, PredictionRecord, Stage, StageOneLabel,
};
use crate::report::RunSummary;

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub cascade_svm_version: String,
    pub input_source: String,
    pub label_column: String,
    pub n_samples: usize,
    pub n_train: usize,
    pub n_test: usize,
}

/// Training configuration of the run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSettings {
    pub kernel: String,
    pub c_stage1: f64,
    pub c_stage2: f64,
    pub scaling: String,
    pub test_size: f64,
    pub seed: u64,
    pub singleton_class: String,
    pub merged_classes: [String; 2],
}

/// One feature's weight in both coordinate systems
#[derive(Debug, Clone, Serialize)]
pub struct FeatureWeight {
    pub feature: String,
    pub standardized: f64,
    pub original: f64,
}

/// Hyperplane of one cascade stage in standardized and original units
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: u8,
    pub description: String,
    pub weights: Vec<FeatureWeight>,
    pub bias_standardized: f64,
    pub bias_original: f64,
    pub margin_standardized: f64,
    pub margin_original: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_support: Option<usize>,
}

impl StageReport {
    pub fn new(
        stage: Stage,
        description: String,
        feature_names: &[String],
        standardized: &Hyperplane,
        original: &Hyperplane,
        n_support: Option<usize>,
    ) -> Self {
        let weights = feature_names
            .iter()
            .zip(standardized.weights.iter().zip(&original.weights))
            .map(|(name, (s, o))| FeatureWeight {
                feature: name.clone(),
                standardized: *s,
                original: *o,
            })
            .collect();

        Self {
            stage: match stage {
                Stage::One => 1,
                Stage::Two => 2,
            },
            description,
            weights,
            bias_standardized: standardized.bias,
            bias_original: original.bias,
            margin_standardized: standardized.margin,
            margin_original: original.margin,
            n_support,
        }
    }
}

/// One test sample in PCA coordinates
#[derive(Debug, Clone, Serialize)]
pub struct ProjectedPoint {
    pub index: usize,
    pub pc1: f64,
    pub pc2: f64,
    pub ground_truth: String,
    pub final_pred: String,
    pub correct: bool,
}

/// PCA projection of the test set (axes fitted on the scaled training set)
#[derive(Debug, Clone, Serialize)]
pub struct ProjectionReport {
    pub explained_variance_ratio: [f64; 2],
    pub points: Vec<ProjectedPoint>,
}

impl ProjectionReport {
    /// `points` and `records` must be in the same row order
    pub fn new(pca: &Pca, points: &[[f64; 2]], records: &[PredictionRecord]) -> Self {
        let ratio = pca.explained_variance_ratio();
        Self {
            explained_variance_ratio: [ratio[0], ratio[1]],
            points: points
                .iter()
                .zip(records)
                .map(|(p, r)| ProjectedPoint {
                    index: r.index,
                    pc1: p[0],
                    pc2: p[1],
                    ground_truth: r.ground_truth.clone(),
                    final_pred: r.final_pred.clone(),
                    correct: r.correct,
                })
                .collect(),
        }
    }
}

/// Timing information in milliseconds
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimingInfo {
    pub load_ms: u64,
    pub train_ms: u64,
    pub predict_ms: u64,
    pub total_ms: u64,
}

/// Complete results of one cascade run
#[derive(Debug, Clone, Serialize)]
pub struct CascadeReport {
    pub metadata: ReportMetadata,
    pub settings: TrainingSettings,
    pub stages: Vec<StageReport>,
    pub metrics: Metrics,
    pub confusion_matrix: ConfusionMatrix,
    pub predictions: Vec<PredictionRecord>,
    /// Absent when the data has fewer than two features
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<ProjectionReport>,
    pub timing: TimingInfo,
}

impl CascadeReport {
    pub fn stage(&self, stage: u8) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// Parameters for creating a CascadeReportBuilder
pub struct ReportBuilderParams {
    pub input_source: String,
    pub label_column: String,
    pub feature_names: Vec<String>,
    pub c_stage1: f64,
    pub c_stage2: f64,
    pub test_size: f64,
    pub seed: u64,
    pub singleton_class: String,
    pub merged_classes: [String; 2],
}

/// Builder for assembling the report as the pipeline runs
pub struct CascadeReportBuilder {
    params: ReportBuilderParams,
    sizes: (usize, usize),
    stages: Vec<StageReport>,
    evaluation: Option<(Metrics, ConfusionMatrix, Vec<PredictionRecord>)>,
    projection: Option<ProjectionReport>,
    timing: TimingInfo,
}

impl CascadeReportBuilder {
    pub fn new(params: ReportBuilderParams) -> Self {
        Self {
            params,
            sizes: (0, 0),
            stages: Vec::new(),
            evaluation: None,
            projection: None,
            timing: TimingInfo::default(),
        }
    }

    pub fn set_split_sizes(&mut self, n_train: usize, n_test: usize) {
        self.sizes = (n_train, n_test);
    }

    /// Record a stage's hyperplane; recording the same stage twice replaces it
    pub fn set_stage(&mut self, report: StageReport) {
        self.stages.retain(|s| s.stage != report.stage);
        self.stages.push(report);
        self.stages.sort_by_key(|s| s.stage);
    }

    pub fn set_evaluation(
        &mut self,
        metrics: Metrics,
        confusion_matrix: ConfusionMatrix,
        predictions: Vec<PredictionRecord>,
    ) {
        self.evaluation = Some((metrics, confusion_matrix, predictions));
    }

    pub fn set_projection(&mut self, projection: ProjectionReport) {
        self.projection = Some(projection);
    }

    pub fn set_timing(&mut self, summary: &RunSummary) {
        self.timing = TimingInfo {
            load_ms: summary.load_time.as_millis() as u64,
            train_ms: summary.train_time.as_millis() as u64,
            predict_ms: summary.predict_time.as_millis() as u64,
            total_ms: summary.total_time().as_millis() as u64,
        };
    }

    pub fn build(self) -> Result<CascadeReport> {
        let (metrics, confusion_matrix, predictions) = self
            .evaluation
            .context("Report is missing evaluation results")?;
        if self.stages.len() != 2 {
            anyhow::bail!(
                "Report needs hyperplanes for both stages, got {}",
                self.stages.len()
            );
        }

        let (n_train, n_test) = self.sizes;
        let params = self.params;

        Ok(CascadeReport {
            metadata: ReportMetadata {
                timestamp: Utc::now().to_rfc3339(),
                cascade_svm_version: env!("CARGO_PKG_VERSION").to_string(),
                input_source: params.input_source,
                label_column: params.label_column,
                n_samples: n_train + n_test,
                n_train,
                n_test,
            },
            settings: TrainingSettings {
                kernel: "linear".to_string(),
                c_stage1: params.c_stage1,
                c_stage2: params.c_stage2,
                scaling: "standardize (population std)".to_string(),
                test_size: params.test_size,
                seed: params.seed,
                singleton_class: params.singleton_class,
                merged_classes: params.merged_classes,
            },
            stages: self.stages,
            metrics,
            confusion_matrix,
            predictions,
            projection: self.projection,
            timing: self.timing,
        })
    }
}

/// Export the full report to a JSON file
pub fn export_results_json(report: &CascadeReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize cascade report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write results to {}", output_path.display()))?;

    Ok(())
}

/// Export the predictions table as CSV, one row per test sample.
/// `stage2_pred` is left empty for rows stage 1 routed to the singleton class.
pub fn export_predictions_csv(records: &[PredictionRecord], output_path: &Path) -> Result<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(output_path)
        .with_context(|| format!("Failed to create CSV file: {}", output_path.display()))?;

    writeln!(
        file,
        "index,ground_truth,stage1_pred,stage2_pred,final_pred,correct"
    )?;

    for record in records {
        let stage1 = match record.stage1_pred {
            StageOneLabel::Singleton => "Singleton",
            StageOneLabel::Merged => "Merged",
        };
        writeln!(
            file,
            "{},{},{},{},{},{}",
            record.index,
            escape_csv_field(&record.ground_truth),
            stage1,
            escape_csv_field(record.stage2_pred.as_deref().unwrap_or_default()),
            escape_csv_field(&record.final_pred),
            record.correct
        )?;
    }

    Ok(())
}

/// Escape a field for CSV (handle commas and quotes)
fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::CoordinateSpace;

    fn record(index: usize, truth: &str, pred: &str) -> PredictionRecord {
        let singleton = pred == "setosa";
        PredictionRecord {
            index,
            ground_truth: truth.to_string(),
            stage1_pred: if singleton {
                StageOneLabel::Singleton
            } else {
                StageOneLabel::Merged
            },
            stage2_pred: (!singleton).then(|| pred.to_string()),
            final_pred: pred.to_string(),
            correct: truth == pred,
        }
    }

    fn stage_report(stage: Stage) -> StageReport {
        let standardized = Hyperplane::new(vec![1.0, -2.0], 0.5, CoordinateSpace::Standardized);
        let original = Hyperplane::new(vec![2.0, -4.0], 1.5, CoordinateSpace::Original);
        StageReport::new(
            stage,
            "test".to_string(),
            &["f1".to_string(), "f2".to_string()],
            &standardized,
            &original,
            Some(3),
        )
    }

    fn builder() -> CascadeReportBuilder {
        CascadeReportBuilder::new(ReportBuilderParams {
            input_source: "built-in iris".to_string(),
            label_column: "species".to_string(),
            feature_names: vec!["f1".to_string(), "f2".to_string()],
            c_stage1: 1.0,
            c_stage2: 1.0,
            test_size: 0.25,
            seed: 42,
            singleton_class: "setosa".to_string(),
            merged_classes: ["versicolor".to_string(), "virginica".to_string()],
        })
    }

    #[test]
    fn test_stage_report_pairs_weights() {
        let report = stage_report(Stage::Two);
        assert_eq!(report.stage, 2);
        assert_eq!(report.weights.len(), 2);
        assert_eq!(report.weights[1].feature, "f2");
        assert_eq!(report.weights[1].standardized, -2.0);
        assert_eq!(report.weights[1].original, -4.0);
        assert_eq!(report.bias_original, 1.5);
    }

    #[test]
    fn test_build_requires_evaluation() {
        let mut b = builder();
        b.set_stage(stage_report(Stage::One));
        b.set_stage(stage_report(Stage::Two));
        assert!(b.build().is_err());
    }

    #[test]
    fn test_build_without_projection_or_stage2_accuracy() {
        let mut b = builder();
        b.set_stage(stage_report(Stage::One));
        b.set_stage(stage_report(Stage::Two));
        b.set_evaluation(
            Metrics {
                accuracy: 1.0,
                stage1_accuracy: 1.0,
                stage2_accuracy: None,
                correct: 1,
                total: 1,
            },
            ConfusionMatrix {
                labels: vec!["setosa".to_string()],
                counts: vec![vec![1]],
            },
            vec![record(0, "setosa", "setosa")],
        );
        let report = b.build().unwrap();
        assert!(report.projection.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["metrics"]["stage2_accuracy"].is_null());
        assert!(json.get("projection").is_none());

        let html = crate::report::render_html(&report).unwrap();
        assert!(html.contains("Stage 2 Accuracy: n/a"));
        assert!(!html.contains("PCA 2D Scatter Plot"));
        assert_eq!(html.matches("<svg").count(), 1);
    }

    #[test]
    fn test_set_stage_replaces_existing() {
        let mut b = builder();
        b.set_stage(stage_report(Stage::Two));
        b.set_stage(stage_report(Stage::One));
        b.set_stage(stage_report(Stage::Two));
        let order: Vec<u8> = b.stages.iter().map(|s| s.stage).collect();
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn test_export_predictions_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.csv");
        let records = vec![
            record(0, "setosa", "setosa"),
            record(5, "virginica", "versicolor"),
        ];
        export_predictions_csv(&records, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "index,ground_truth,stage1_pred,stage2_pred,final_pred,correct"
        );
        assert_eq!(lines[1], "0,setosa,Singleton,,setosa,true");
        assert_eq!(lines[2], "5,virginica,Merged,versicolor,versicolor,false");
    }

    #[test]
    fn test_escape_csv_field() {
        assert_eq!(escape_csv_field("plain"), "plain");
        assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
