//! Labeled tabular dataset and CSV loading/export

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

use super::error::CascadeError;

/// A fixed-width numeric feature table with one categorical label per row
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<String>,
}

impl Dataset {
    /// Create a dataset, checking that every row has one label and the same width
    pub fn new(
        feature_names: Vec<String>,
        features: Vec<Vec<f64>>,
        labels: Vec<String>,
    ) -> Result<Self, CascadeError> {
        if features.len() != labels.len() {
            return Err(CascadeError::ShapeMismatch {
                expected: features.len(),
                found: labels.len(),
            });
        }
        let width = feature_names.len();
        if let Some(row) = features.iter().find(|row| row.len() != width) {
            return Err(CascadeError::ShapeMismatch {
                expected: width,
                found: row.len(),
            });
        }

        Ok(Self {
            feature_names,
            features,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Sorted distinct labels
    pub fn classes(&self) -> Vec<String> {
        self.class_counts().into_keys().collect()
    }

    /// Row count per label, keyed in sorted label order
    pub fn class_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Rows at `indices`, in the order given
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            feature_names: self.feature_names.clone(),
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
        }
    }
}

/// Load a dataset from CSV. Every column other than `label_column` must be numeric
/// and free of nulls and non-finite values; the label column is read as text.
///
/// `infer_schema_length` of 0 scans the whole file for type inference.
pub fn load_dataset_csv(
    path: &Path,
    label_column: &str,
    infer_schema_length: usize,
) -> Result<Dataset> {
    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(schema_length)
        .finish()
        .with_context(|| format!("Failed to load CSV file: {}", path.display()))?
        .collect()
        .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;

    dataset_from_dataframe(&df, label_column)
}

/// Convert a collected DataFrame into a [`Dataset`]
pub fn dataset_from_dataframe(df: &DataFrame, label_column: &str) -> Result<Dataset> {
    let column_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    if !column_names.iter().any(|c| c == label_column) {
        anyhow::bail!(
            "Label column '{}' not found in dataset. Available columns: {:?}",
            label_column,
            column_names
        );
    }

    let label_col = df.column(label_column)?;
    if label_col.null_count() > 0 {
        anyhow::bail!(
            "Label column '{}' contains {} null value(s)",
            label_column,
            label_col.null_count()
        );
    }
    let labels: Vec<String> = label_col
        .cast(&DataType::String)?
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect();

    let feature_names: Vec<String> = column_names
        .into_iter()
        .filter(|c| c != label_column)
        .collect();
    if feature_names.is_empty() {
        anyhow::bail!("Dataset has no feature columns besides '{}'", label_column);
    }

    let mut features = vec![Vec::with_capacity(feature_names.len()); df.height()];
    for name in &feature_names {
        let col = df.column(name)?;
        if !col.dtype().is_primitive_numeric() {
            anyhow::bail!(
                "Feature column '{}' is not numeric (found {})",
                name,
                col.dtype()
            );
        }
        if col.null_count() > 0 {
            anyhow::bail!(
                "Feature column '{}' contains {} missing value(s)",
                name,
                col.null_count()
            );
        }
        let values = col.cast(&DataType::Float64)?;
        for (i, (row, value)) in features
            .iter_mut()
            .zip(values.f64()?.into_iter())
            .enumerate()
        {
            match value {
                Some(v) if v.is_finite() => row.push(v),
                Some(v) => anyhow::bail!(
                    "Feature column '{}' has non-finite value {} at row {}",
                    name,
                    v,
                    i
                ),
                None => anyhow::bail!("Feature column '{}' has a missing value at row {}", name, i),
            }
        }
    }

    Ok(Dataset::new(feature_names, features, labels)?)
}

/// Write a dataset to CSV with the label as the last column
pub fn write_dataset_csv(dataset: &Dataset, label_column: &str, path: &Path) -> Result<()> {
    let mut columns: Vec<Column> = Vec::with_capacity(dataset.n_features() + 1);
    for (j, name) in dataset.feature_names.iter().enumerate() {
        let values: Vec<f64> = dataset.features.iter().map(|row| row[j]).collect();
        columns.push(Column::new(name.as_str().into(), values));
    }
    columns.push(Column::new(
        label_column.into(),
        dataset.labels.clone(),
    ));

    let mut df = DataFrame::new(columns).context("Failed to assemble dataset frame")?;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    CsvWriter::new(&mut file)
        .finish(&mut df)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;

    Ok(())
}
