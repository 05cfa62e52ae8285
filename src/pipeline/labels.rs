//! Class grouping for the cascade: one singleton class, two merged classes
//!
//! Stage 1 sees a binary view of the labels (singleton vs. merged); stage 2 sees
//! only the merged rows with their original labels.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::error::CascadeError;

/// Binary stage-1 label. Declared so that `Merged < Singleton`, the same order
/// as their names sort in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum StageOneLabel {
    Merged,
    Singleton,
}

impl StageOneLabel {
    /// Binary view of one original label
    pub fn from_label(label: &str, singleton_class: &str) -> Self {
        if label == singleton_class {
            StageOneLabel::Singleton
        } else {
            StageOneLabel::Merged
        }
    }
}

impl fmt::Display for StageOneLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOneLabel::Merged => write!(f, "Merged"),
            StageOneLabel::Singleton => write!(f, "Singleton"),
        }
    }
}

/// Partition of the three classes into a singleton and a merged pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSet {
    singleton: String,
    merged: [String; 2],
}

impl LabelSet {
    /// Build from the dataset's classes. Requires exactly three distinct
    /// classes with `singleton` among them; the merged pair is kept sorted.
    pub fn new<S: AsRef<str>>(classes: &[S], singleton: &str) -> Result<Self, CascadeError> {
        let distinct: BTreeSet<&str> = classes.iter().map(|c| c.as_ref()).collect();

        if distinct.len() != 3 {
            return Err(CascadeError::Configuration(format!(
                "a two-stage cascade needs exactly 3 classes, found {}: {:?}",
                distinct.len(),
                distinct
            )));
        }
        if !distinct.contains(singleton) {
            return Err(CascadeError::Configuration(format!(
                "singleton class '{}' is not one of {:?}",
                singleton, distinct
            )));
        }

        let mut merged = distinct
            .into_iter()
            .filter(|c| *c != singleton)
            .map(|c| c.to_string());
        let (Some(first), Some(second)) = (merged.next(), merged.next()) else {
            return Err(CascadeError::Configuration(
                "could not determine the merged class pair".to_string(),
            ));
        };

        Ok(Self {
            singleton: singleton.to_string(),
            merged: [first, second],
        })
    }

    pub fn singleton(&self) -> &str {
        &self.singleton
    }

    pub fn merged(&self) -> &[String; 2] {
        &self.merged
    }

    pub fn is_merged(&self, label: &str) -> bool {
        self.merged.iter().any(|m| m == label)
    }
}

/// Map every label to its stage-1 binary view
pub fn derive_stage1_labels<S: AsRef<str>>(
    labels: &[S],
    singleton_class: &str,
) -> Vec<StageOneLabel> {
    labels
        .iter()
        .map(|l| StageOneLabel::from_label(l.as_ref(), singleton_class))
        .collect()
}

/// Rows whose label is not the singleton, in their original order, with their
/// original labels
pub fn select_stage2_subset<S: AsRef<str>>(
    features: &[Vec<f64>],
    labels: &[S],
    singleton_class: &str,
) -> Result<(Vec<Vec<f64>>, Vec<String>), CascadeError> {
    if features.len() != labels.len() {
        return Err(CascadeError::ShapeMismatch {
            expected: features.len(),
            found: labels.len(),
        });
    }

    let (rows, sub_labels): (Vec<Vec<f64>>, Vec<String>) = features
        .iter()
        .zip(labels)
        .filter(|(_, label)| label.as_ref() != singleton_class)
        .map(|(row, label)| (row.clone(), label.as_ref().to_string()))
        .unzip();

    if rows.is_empty() {
        return Err(CascadeError::InsufficientData(format!(
            "no rows outside singleton class '{}' to train stage 2",
            singleton_class
        )));
    }

    Ok((rows, sub_labels))
}
