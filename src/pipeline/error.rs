//! Error types for cascade training, prediction and evaluation.
//!
//! Every failure in the core is local and non-retryable. The variants map
//! one-to-one onto the ways a cascade run can be misconfigured or misused;
//! callers surface them unchanged.

use std::fmt;

use thiserror::Error;

/// Which of the two cascade stages an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Singleton vs. merged group
    One,
    /// Split of the merged pair
    Two,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::One => write!(f, "stage 1"),
            Stage::Two => write!(f, "stage 2"),
        }
    }
}

/// Errors raised by the cascade core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CascadeError {
    /// Invalid singleton/class setup or hyperparameter.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Not enough rows to carry out the requested step.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A training call did not see exactly two distinct label values.
    #[error("Degenerate labels for {stage}: expected 2 distinct labels, found {distinct}")]
    DegenerateLabels { stage: Stage, distinct: usize },

    /// Parameters or predictions requested before the stage was trained.
    #[error("{stage} has not been fitted")]
    NotFitted { stage: Stage },

    /// Feature dimension (or row count) disagrees with what was expected.
    #[error("Shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: usize, found: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_labels_display() {
        let err = CascadeError::DegenerateLabels {
            stage: Stage::Two,
            distinct: 1,
        };
        assert_eq!(
            err.to_string(),
            "Degenerate labels for stage 2: expected 2 distinct labels, found 1"
        );
    }

    #[test]
    fn test_not_fitted_display() {
        let err = CascadeError::NotFitted { stage: Stage::One };
        assert_eq!(err.to_string(), "stage 1 has not been fitted");
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = CascadeError::ShapeMismatch {
            expected: 4,
            found: 3,
        };
        assert_eq!(err.to_string(), "Shape mismatch: expected 4, found 3");
    }

    #[test]
    fn test_errors_convert_into_anyhow() {
        let err: anyhow::Error = CascadeError::Configuration("bad".to_string()).into();
        assert!(err.to_string().contains("bad"));
        assert!(err.downcast_ref::<CascadeError>().is_some());
    }
}
