//! Accuracy, confusion matrix and the per-sample predictions table

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::cascade::CascadePrediction;
use super::error::CascadeError;
use super::labels::StageOneLabel;

/// One row of the predictions table, keyed by the sample's original row index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionRecord {
    pub index: usize,
    pub ground_truth: String,
    pub stage1_pred: StageOneLabel,
    pub stage2_pred: Option<String>,
    pub final_pred: String,
    pub correct: bool,
}

/// Square count matrix; `counts[i][j]` = true `labels[i]` predicted as `labels[j]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Correct predictions (sum of the diagonal)
    pub fn trace(&self) -> usize {
        self.counts.iter().enumerate().map(|(i, row)| row[i]).sum()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Per-class ground-truth counts
    pub fn row_totals(&self) -> Vec<usize> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    /// Largest single cell, used to scale heatmap colours
    pub fn max_count(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }
}

/// Summary metrics of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub accuracy: f64,
    pub stage1_accuracy: f64,
    /// `None` when no ground-truth row falls outside the singleton class
    pub stage2_accuracy: Option<f64>,
    pub correct: usize,
    pub total: usize,
}

fn check_lengths<S>(predictions: &[CascadePrediction], truth: &[S]) -> Result<(), CascadeError> {
    if predictions.len() != truth.len() {
        return Err(CascadeError::ShapeMismatch {
            expected: truth.len(),
            found: predictions.len(),
        });
    }
    if predictions.is_empty() {
        return Err(CascadeError::InsufficientData(
            "no predictions to evaluate".to_string(),
        ));
    }
    Ok(())
}

/// Fraction of rows whose final prediction equals the ground truth
pub fn accuracy<S: AsRef<str>>(
    predictions: &[CascadePrediction],
    truth: &[S],
) -> Result<f64, CascadeError> {
    check_lengths(predictions, truth)?;
    let correct = predictions
        .iter()
        .zip(truth)
        .filter(|(p, t)| p.final_label == t.as_ref())
        .count();
    Ok(correct as f64 / truth.len() as f64)
}

/// Stage-1 routing accuracy against the binary view of the ground truth
pub fn stage1_accuracy<S: AsRef<str>>(
    predictions: &[CascadePrediction],
    truth: &[S],
    singleton_class: &str,
) -> Result<f64, CascadeError> {
    check_lengths(predictions, truth)?;
    let correct = predictions
        .iter()
        .zip(truth)
        .filter(|(p, t)| p.stage1 == StageOneLabel::from_label(t.as_ref(), singleton_class))
        .count();
    Ok(correct as f64 / truth.len() as f64)
}

/// Final-prediction accuracy over the rows whose true label is not the singleton
pub fn stage2_accuracy<S: AsRef<str>>(
    predictions: &[CascadePrediction],
    truth: &[S],
    singleton_class: &str,
) -> Result<f64, CascadeError> {
    check_lengths(predictions, truth)?;
    let (correct, total) = predictions
        .iter()
        .zip(truth)
        .filter(|(_, t)| t.as_ref() != singleton_class)
        .fold((0usize, 0usize), |(correct, total), (p, t)| {
            (correct + usize::from(p.final_label == t.as_ref()), total + 1)
        });

    if total == 0 {
        return Err(CascadeError::InsufficientData(format!(
            "no rows outside singleton class '{}' to evaluate stage 2",
            singleton_class
        )));
    }
    Ok(correct as f64 / total as f64)
}

/// Confusion matrix over the sorted distinct ground-truth labels
pub fn confusion_matrix<S: AsRef<str>>(
    predictions: &[CascadePrediction],
    truth: &[S],
) -> Result<ConfusionMatrix, CascadeError> {
    check_lengths(predictions, truth)?;

    let labels: Vec<String> = truth
        .iter()
        .map(|t| t.as_ref())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect();
    let position: BTreeMap<&str, usize> = labels
        .iter()
        .enumerate()
        .map(|(i, l)| (l.as_str(), i))
        .collect();

    let mut counts = vec![vec![0usize; labels.len()]; labels.len()];
    for (p, t) in predictions.iter().zip(truth) {
        let (Some(&row), Some(&col)) = (
            position.get(t.as_ref()),
            position.get(p.final_label.as_str()),
        ) else {
            continue;
        };
        counts[row][col] += 1;
    }

    Ok(ConfusionMatrix { labels, counts })
}

/// Join predictions with ground truth, sorted by original row index
pub fn predictions_table<S: AsRef<str>>(
    indices: &[usize],
    predictions: &[CascadePrediction],
    truth: &[S],
) -> Result<Vec<PredictionRecord>, CascadeError> {
    check_lengths(predictions, truth)?;
    if indices.len() != truth.len() {
        return Err(CascadeError::ShapeMismatch {
            expected: truth.len(),
            found: indices.len(),
        });
    }

    let mut records: Vec<PredictionRecord> = indices
        .iter()
        .zip(predictions.iter().zip(truth))
        .map(|(&index, (p, t))| PredictionRecord {
            index,
            ground_truth: t.as_ref().to_string(),
            stage1_pred: p.stage1,
            stage2_pred: p.stage2.clone(),
            final_pred: p.final_label.clone(),
            correct: p.final_label == t.as_ref(),
        })
        .collect();
    records.sort_by_key(|r| r.index);
    Ok(records)
}

/// All summary metrics in one pass over the inputs
pub fn evaluate<S: AsRef<str>>(
    predictions: &[CascadePrediction],
    truth: &[S],
    singleton_class: &str,
) -> Result<Metrics, CascadeError> {
    let accuracy = accuracy(predictions, truth)?;
    let correct = predictions
        .iter()
        .zip(truth)
        .filter(|(p, t)| p.final_label == t.as_ref())
        .count();
    Ok(Metrics {
        accuracy,
        stage1_accuracy: stage1_accuracy(predictions, truth, singleton_class)?,
        stage2_accuracy: match stage2_accuracy(predictions, truth, singleton_class) {
            Ok(value) => Some(value),
            Err(CascadeError::InsufficientData(_)) => None,
            Err(err) => return Err(err),
        },
        correct,
        total: truth.len(),
    })
}
