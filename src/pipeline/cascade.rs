//! Two-stage cascade classifier
//!
//! Stage 1 separates the singleton class from the merged pair. Stage 2 splits the
//! merged pair and is only consulted for rows stage 1 routed to the merged side.
//! Lifecycle: constructed -> stage 1 fitted -> stage 2 fitted -> ready to predict.

use std::collections::BTreeSet;

use serde::Serialize;

use super::error::{CascadeError, Stage};
use super::labels::{derive_stage1_labels, select_stage2_subset, LabelSet, StageOneLabel};
use super::scaler::FeatureScaler;
use super::svm::{LinearSeparator, LinearSvc, SvcOptions};

/// Coordinate system a hyperplane is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    Standardized,
    Original,
}

/// Separating hyperplane `w . x + b = 0` with its geometric margin `2 / ||w||`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hyperplane {
    pub weights: Vec<f64>,
    pub bias: f64,
    pub margin: f64,
    pub space: CoordinateSpace,
}

impl Hyperplane {
    pub fn new(weights: Vec<f64>, bias: f64, space: CoordinateSpace) -> Self {
        let margin = margin(&weights);
        Self {
            weights,
            bias,
            margin,
            space,
        }
    }

    /// `w . x + b`
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        self.weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + self.bias
    }

    /// Express a standardized-space hyperplane in raw feature units.
    /// The margin is recomputed from the transformed weights.
    pub fn to_original_space(&self, scaler: &FeatureScaler) -> Result<Hyperplane, CascadeError> {
        if self.space != CoordinateSpace::Standardized {
            return Err(CascadeError::Configuration(
                "hyperplane is already in original feature space".to_string(),
            ));
        }
        let (weights, bias) = back_transform(&self.weights, self.bias, scaler)?;
        Ok(Hyperplane::new(weights, bias, CoordinateSpace::Original))
    }
}

/// `2 / ||w||_2`
pub fn margin(weights: &[f64]) -> f64 {
    let norm = weights.iter().map(|w| w * w).sum::<f64>().sqrt();
    2.0 / norm
}

/// Convert a hyperplane fitted on z = (x - mean) / scale into raw coordinates:
///
///   w_orig[j] = w[j] / scale[j]
///   b_orig    = b - sum_j w[j] * mean[j] / scale[j]
///
/// so that `w . z + b` and `w_orig . x + b_orig` agree for every x.
pub fn back_transform(
    w_scaled: &[f64],
    b_scaled: f64,
    scaler: &FeatureScaler,
) -> Result<(Vec<f64>, f64), CascadeError> {
    if w_scaled.len() != scaler.n_features() {
        return Err(CascadeError::ShapeMismatch {
            expected: scaler.n_features(),
            found: w_scaled.len(),
        });
    }

    let w_original: Vec<f64> = w_scaled
        .iter()
        .zip(scaler.scale())
        .map(|(w, s)| w / s)
        .collect();

    let shift: f64 = w_scaled
        .iter()
        .zip(scaler.mean().iter().zip(scaler.scale()))
        .map(|(w, (m, s))| w * m / s)
        .sum();

    Ok((w_original, b_scaled - shift))
}

/// Where a classifier is in its training lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CascadeState {
    Constructed,
    Stage1Fitted,
    Stage2Fitted,
    Ready,
}

/// Per-row cascade output. `stage2` is `None` exactly when stage 1 said `Singleton`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadePrediction {
    pub stage1: StageOneLabel,
    pub stage2: Option<String>,
    pub final_label: String,
}

/// Cascade of two linear separators over a fixed singleton / merged-pair grouping
#[derive(Debug, Clone)]
pub struct CascadeClassifier<S1 = LinearSvc<StageOneLabel>, S2 = LinearSvc<String>> {
    label_set: LabelSet,
    stage1: S1,
    stage2: S2,
}

impl CascadeClassifier {
    /// Build a cascade of two linear SVCs. `classes` are the dataset's labels
    /// (duplicates allowed); `singleton_class` must be one of exactly three classes.
    pub fn new<S: AsRef<str>>(
        c_stage1: f64,
        c_stage2: f64,
        singleton_class: &str,
        classes: &[S],
    ) -> Result<Self, CascadeError> {
        for (stage, c) in [(Stage::One, c_stage1), (Stage::Two, c_stage2)] {
            if !(c.is_finite() && c > 0.0) {
                return Err(CascadeError::Configuration(format!(
                    "C for {} must be positive, got {}",
                    stage, c
                )));
            }
        }

        let label_set = LabelSet::new(classes, singleton_class)?;
        Ok(Self::with_separators(
            label_set,
            LinearSvc::new(Stage::One, SvcOptions::with_c(c_stage1)),
            LinearSvc::new(Stage::Two, SvcOptions::with_c(c_stage2)),
        ))
    }

    pub fn c_stage1(&self) -> f64 {
        self.stage1.c()
    }

    pub fn c_stage2(&self) -> f64 {
        self.stage2.c()
    }

    /// Support vector counts for (stage 1, stage 2), once fitted
    pub fn support_vector_counts(&self) -> (Option<usize>, Option<usize>) {
        (self.stage1.n_support(), self.stage2.n_support())
    }
}

impl<S1, S2> CascadeClassifier<S1, S2>
where
    S1: LinearSeparator<StageOneLabel>,
    S2: LinearSeparator<String>,
{
    /// Assemble a cascade from arbitrary separators
    pub fn with_separators(label_set: LabelSet, stage1: S1, stage2: S2) -> Self {
        Self {
            label_set,
            stage1,
            stage2,
        }
    }

    pub fn label_set(&self) -> &LabelSet {
        &self.label_set
    }

    pub fn singleton_class(&self) -> &str {
        self.label_set.singleton()
    }

    pub fn stage1_separator(&self) -> &S1 {
        &self.stage1
    }

    pub fn stage2_separator(&self) -> &S2 {
        &self.stage2
    }

    pub fn state(&self) -> CascadeState {
        match (self.stage1.is_fitted(), self.stage2.is_fitted()) {
            (false, false) => CascadeState::Constructed,
            (true, false) => CascadeState::Stage1Fitted,
            (false, true) => CascadeState::Stage2Fitted,
            (true, true) => CascadeState::Ready,
        }
    }

    /// Fit stage 1 on binary singleton/merged labels
    pub fn train_stage1(
        &mut self,
        x: &[Vec<f64>],
        y_binary: &[StageOneLabel],
    ) -> Result<(), CascadeError> {
        if x.is_empty() {
            return Err(CascadeError::InsufficientData(
                "no training rows for stage 1".to_string(),
            ));
        }
        let distinct = y_binary.iter().collect::<BTreeSet<_>>().len();
        if distinct != 2 {
            return Err(CascadeError::DegenerateLabels {
                stage: Stage::One,
                distinct,
            });
        }
        self.stage1.fit(x, y_binary)
    }

    /// Fit stage 2 on merged-group rows with their original labels
    pub fn train_stage2<S: AsRef<str>>(
        &mut self,
        x_merged: &[Vec<f64>],
        y_merged: &[S],
    ) -> Result<(), CascadeError> {
        if x_merged.is_empty() {
            return Err(CascadeError::InsufficientData(
                "no merged-group rows to train stage 2".to_string(),
            ));
        }
        if let Some(stray) = y_merged
            .iter()
            .map(|l| l.as_ref())
            .find(|l| !self.label_set.is_merged(l))
        {
            return Err(CascadeError::Configuration(format!(
                "stage 2 label '{}' is not one of the merged classes {:?}",
                stray,
                self.label_set.merged()
            )));
        }

        let labels: Vec<String> = y_merged.iter().map(|l| l.as_ref().to_string()).collect();
        let distinct = labels.iter().collect::<BTreeSet<_>>().len();
        if distinct != 2 {
            return Err(CascadeError::DegenerateLabels {
                stage: Stage::Two,
                distinct,
            });
        }
        self.stage2.fit(x_merged, &labels)
    }

    /// Derive both stages' training sets from the full labels and fit them in order
    pub fn fit<S: AsRef<str>>(&mut self, x: &[Vec<f64>], labels: &[S]) -> Result<(), CascadeError> {
        let singleton = self.label_set.singleton().to_string();
        let y_binary = derive_stage1_labels(labels, &singleton);
        self.train_stage1(x, &y_binary)?;

        let (x_merged, y_merged) = select_stage2_subset(x, labels, &singleton)?;
        self.train_stage2(&x_merged, &y_merged)
    }

    /// Fitted hyperplane of one stage, in the coordinates it was trained in
    pub fn hyperplane(&self, stage: Stage) -> Result<Hyperplane, CascadeError> {
        let (weights, bias) = match stage {
            Stage::One => (self.stage1.weights(), self.stage1.bias()),
            Stage::Two => (self.stage2.weights(), self.stage2.bias()),
        };
        match (weights, bias) {
            (Some(w), Some(b)) => Ok(Hyperplane::new(w.to_vec(), b, CoordinateSpace::Standardized)),
            _ => Err(CascadeError::NotFitted { stage }),
        }
    }

    /// Cascade prediction, one entry per row in input order.
    ///
    /// Stage 1 runs over the whole batch; stage 2 is evaluated row by row and
    /// only for rows stage 1 assigned to the merged group.
    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<CascadePrediction>, CascadeError> {
        let n_features = self
            .stage1
            .n_features()
            .ok_or(CascadeError::NotFitted { stage: Stage::One })?;
        let n_features_2 = self
            .stage2
            .n_features()
            .ok_or(CascadeError::NotFitted { stage: Stage::Two })?;
        if n_features_2 != n_features {
            return Err(CascadeError::ShapeMismatch {
                expected: n_features,
                found: n_features_2,
            });
        }
        if let Some(row) = x.iter().find(|r| r.len() != n_features) {
            return Err(CascadeError::ShapeMismatch {
                expected: n_features,
                found: row.len(),
            });
        }

        let stage1_preds = self.stage1.predict(x)?;

        x.iter()
            .zip(stage1_preds)
            .map(|(row, stage1)| match stage1 {
                StageOneLabel::Singleton => Ok(CascadePrediction {
                    stage1,
                    stage2: None,
                    final_label: self.label_set.singleton().to_string(),
                }),
                StageOneLabel::Merged => {
                    let label = self.stage2.predict_row(row)?;
                    Ok(CascadePrediction {
                        stage1,
                        stage2: Some(label.clone()),
                        final_label: label,
                    })
                }
            })
            .collect()
    }
}
