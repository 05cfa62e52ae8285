//! Per-feature standardization: z = (x - mean) / scale

use serde::Serialize;

use super::error::CascadeError;

/// Fitted standardization parameters. Read-only after `fit`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl FeatureScaler {
    /// Fit on training rows. Scale is the population standard deviation;
    /// constant features get a scale of 1.0. Non-finite input is rejected.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, CascadeError> {
        let first = rows.first().ok_or_else(|| {
            CascadeError::InsufficientData("cannot fit a scaler on zero rows".to_string())
        })?;
        let width = first.len();
        check_widths(rows, width)?;
        if let Some((i, j)) = rows.iter().enumerate().find_map(|(i, row)| {
            row.iter().position(|x| !x.is_finite()).map(|j| (i, j))
        }) {
            return Err(CascadeError::Configuration(format!(
                "non-finite value {} in row {}, feature {}",
                rows[i][j], i, j
            )));
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut scale = vec![0.0; width];
        for row in rows {
            for ((s, x), m) in scale.iter_mut().zip(row).zip(&mean) {
                let dev = x - m;
                *s += dev * dev;
            }
        }
        for s in scale.iter_mut() {
            *s = (*s / n).sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        Ok(Self { mean, scale })
    }

    /// Build a scaler from known parameters
    pub fn from_parts(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, CascadeError> {
        if mean.len() != scale.len() {
            return Err(CascadeError::ShapeMismatch {
                expected: mean.len(),
                found: scale.len(),
            });
        }
        if let Some(bad) = scale.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(CascadeError::Configuration(format!(
                "scale must be positive and finite, got {}",
                bad
            )));
        }
        Ok(Self { mean, scale })
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, CascadeError> {
        check_width(row, self.n_features())?;
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, CascadeError> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    pub fn inverse_transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, CascadeError> {
        rows.iter()
            .map(|row| {
                check_width(row, self.n_features())?;
                Ok(row
                    .iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(z, (m, s))| z * s + m)
                    .collect())
            })
            .collect()
    }
}

fn check_width(row: &[f64], expected: usize) -> Result<(), CascadeError> {
    if row.len() != expected {
        return Err(CascadeError::ShapeMismatch {
            expected,
            found: row.len(),
        });
    }
    Ok(())
}

fn check_widths(rows: &[Vec<f64>], expected: usize) -> Result<(), CascadeError> {
    rows.iter().try_for_each(|row| check_width(row, expected))
}
