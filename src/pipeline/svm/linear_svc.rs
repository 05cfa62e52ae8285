//! Linear-kernel C-SVC over arbitrary binary labels

use std::collections::BTreeSet;

use super::smo::{gram_matrix, SmoOptions, SmoSolver};
use super::LinearSeparator;
use crate::pipeline::error::{CascadeError, Stage};

/// Hyperparameters for [`LinearSvc`]
#[derive(Debug, Clone)]
pub struct SvcOptions {
    /// Regularization strength (larger = harder margin)
    pub c: f64,
    pub smo: SmoOptions,
}

impl SvcOptions {
    pub fn with_c(c: f64) -> Self {
        Self {
            c,
            ..Default::default()
        }
    }
}

impl Default for SvcOptions {
    fn default() -> Self {
        Self {
            c: 1.0,
            smo: SmoOptions::default(),
        }
    }
}

#[derive(Debug, Clone)]
struct FittedSvc<L> {
    /// Sorted; `classes[1]` is the positive side of the hyperplane
    classes: [L; 2],
    weights: Vec<f64>,
    bias: f64,
    n_support: usize,
    iterations: usize,
    converged: bool,
}

/// Support vector classifier with a linear kernel, trained in the dual by SMO.
///
/// Labels are sorted and the larger one is treated as the positive class, so
/// `decision_function(x) > 0` predicts `classes()[1]`.
#[derive(Debug, Clone)]
pub struct LinearSvc<L> {
    stage: Stage,
    options: SvcOptions,
    fitted: Option<FittedSvc<L>>,
}

impl<L: Clone + Ord> LinearSvc<L> {
    pub fn new(stage: Stage, options: SvcOptions) -> Self {
        Self {
            stage,
            options,
            fitted: None,
        }
    }

    pub fn c(&self) -> f64 {
        self.options.c
    }

    /// Number of training rows with a non-zero multiplier
    pub fn n_support(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.n_support)
    }

    /// Solver iterations used by the last fit
    pub fn iterations(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.iterations)
    }

    /// Whether the last fit met the KKT tolerance before `max_iter`
    pub fn converged(&self) -> Option<bool> {
        self.fitted.as_ref().map(|f| f.converged)
    }

    fn model(&self) -> Result<&FittedSvc<L>, CascadeError> {
        self.fitted
            .as_ref()
            .ok_or(CascadeError::NotFitted { stage: self.stage })
    }
}

impl<L: Clone + Ord> LinearSeparator<L> for LinearSvc<L> {
    fn fit(&mut self, x: &[Vec<f64>], y: &[L]) -> Result<(), CascadeError> {
        if x.len() != y.len() {
            return Err(CascadeError::ShapeMismatch {
                expected: x.len(),
                found: y.len(),
            });
        }
        let width = x.first().map(|r| r.len()).ok_or_else(|| {
            CascadeError::InsufficientData(format!("no training rows for {}", self.stage))
        })?;
        if let Some(row) = x.iter().find(|r| r.len() != width) {
            return Err(CascadeError::ShapeMismatch {
                expected: width,
                found: row.len(),
            });
        }
        if !(self.options.c.is_finite() && self.options.c > 0.0) {
            return Err(CascadeError::Configuration(format!(
                "C for {} must be positive, got {}",
                self.stage, self.options.c
            )));
        }

        let distinct: BTreeSet<&L> = y.iter().collect();
        if distinct.len() != 2 {
            return Err(CascadeError::DegenerateLabels {
                stage: self.stage,
                distinct: distinct.len(),
            });
        }
        let mut sorted = distinct.into_iter().cloned();
        let (Some(negative), Some(positive)) = (sorted.next(), sorted.next()) else {
            return Err(CascadeError::DegenerateLabels {
                stage: self.stage,
                distinct: 0,
            });
        };

        let signs: Vec<f64> = y
            .iter()
            .map(|label| if *label == positive { 1.0 } else { -1.0 })
            .collect();

        let kernel = gram_matrix(x);
        let solution = SmoSolver::new(&kernel, &signs, self.options.c, &self.options.smo).solve();

        let mut weights = vec![0.0; width];
        for ((row, &a), &s) in x.iter().zip(&solution.alpha).zip(&signs) {
            if a > 0.0 {
                for (w, v) in weights.iter_mut().zip(row) {
                    *w += a * s * v;
                }
            }
        }

        // Retraining replaces the previous model outright
        self.fitted = Some(FittedSvc {
            classes: [negative, positive],
            weights,
            bias: -solution.rho,
            n_support: solution.alpha.iter().filter(|&&a| a > 0.0).count(),
            iterations: solution.iterations,
            converged: solution.converged,
        });

        Ok(())
    }

    fn decision_function(&self, row: &[f64]) -> Result<f64, CascadeError> {
        let model = self.model()?;
        if row.len() != model.weights.len() {
            return Err(CascadeError::ShapeMismatch {
                expected: model.weights.len(),
                found: row.len(),
            });
        }
        Ok(model
            .weights
            .iter()
            .zip(row)
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + model.bias)
    }

    fn predict_row(&self, row: &[f64]) -> Result<L, CascadeError> {
        let score = self.decision_function(row)?;
        let model = self.model()?;
        Ok(if score > 0.0 {
            model.classes[1].clone()
        } else {
            model.classes[0].clone()
        })
    }

    fn weights(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|f| f.weights.as_slice())
    }

    fn bias(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.bias)
    }

    fn classes(&self) -> Option<&[L]> {
        self.fitted.as_ref().map(|f| f.classes.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> (Vec<Vec<f64>>, Vec<&'static str>) {
        let x = vec![
            vec![1.0, 1.0],
            vec![1.5, 0.5],
            vec![0.5, 1.5],
            vec![-1.0, -1.0],
            vec![-1.5, -0.5],
            vec![-0.5, -1.5],
        ];
        let y = vec!["up", "up", "up", "down", "down", "down"];
        (x, y)
    }

    #[test]
    fn test_fit_and_predict_training_points() {
        let (x, y) = blobs();
        let mut svc = LinearSvc::new(Stage::One, SvcOptions::with_c(10.0));
        svc.fit(&x, &y).unwrap();

        assert_eq!(svc.predict(&x).unwrap(), y);
        assert_eq!(svc.classes().unwrap(), &["down", "up"]);
        assert_eq!(svc.converged(), Some(true));
    }

    #[test]
    fn test_positive_side_is_larger_label() {
        let (x, y) = blobs();
        let mut svc = LinearSvc::new(Stage::One, SvcOptions::default());
        svc.fit(&x, &y).unwrap();

        assert!(svc.decision_function(&[2.0, 2.0]).unwrap() > 0.0);
        assert_eq!(svc.predict_row(&[2.0, 2.0]).unwrap(), "up");
        assert_eq!(svc.predict_row(&[-2.0, -2.0]).unwrap(), "down");
    }

    #[test]
    fn test_symmetric_data_gives_symmetric_hyperplane() {
        let (x, y) = blobs();
        let mut svc = LinearSvc::new(Stage::One, SvcOptions::with_c(100.0));
        svc.fit(&x, &y).unwrap();

        let w = svc.weights().unwrap();
        assert!((w[0] - w[1]).abs() < 1e-6);
        assert!(svc.bias().unwrap().abs() < 1e-6);
        // Hard margin: nearest points (1,1) and (-1,-1) lie on w.x + b = +-1
        assert!((w[0] + w[1] - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_single_label_is_degenerate() {
        let x = vec![vec![1.0], vec![2.0]];
        let y = vec!["a", "a"];
        let mut svc = LinearSvc::new(Stage::Two, SvcOptions::default());
        assert_eq!(
            svc.fit(&x, &y).unwrap_err(),
            CascadeError::DegenerateLabels {
                stage: Stage::Two,
                distinct: 1
            }
        );
    }

    #[test]
    fn test_three_labels_is_degenerate() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let y = vec!["a", "b", "c"];
        let mut svc = LinearSvc::new(Stage::Two, SvcOptions::default());
        assert!(matches!(
            svc.fit(&x, &y),
            Err(CascadeError::DegenerateLabels { distinct: 3, .. })
        ));
    }

    #[test]
    fn test_unfitted_access_fails() {
        let svc: LinearSvc<String> = LinearSvc::new(Stage::Two, SvcOptions::default());
        assert!(svc.weights().is_none());
        assert!(!svc.is_fitted());
        assert_eq!(
            svc.decision_function(&[0.0]).unwrap_err(),
            CascadeError::NotFitted { stage: Stage::Two }
        );
    }

    #[test]
    fn test_wrong_width_at_predict() {
        let (x, y) = blobs();
        let mut svc = LinearSvc::new(Stage::One, SvcOptions::default());
        svc.fit(&x, &y).unwrap();
        assert!(matches!(
            svc.predict_row(&[1.0, 2.0, 3.0]),
            Err(CascadeError::ShapeMismatch {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn test_non_positive_c_rejected() {
        let (x, y) = blobs();
        let mut svc = LinearSvc::new(Stage::One, SvcOptions::with_c(0.0));
        assert!(matches!(
            svc.fit(&x, &y),
            Err(CascadeError::Configuration(_))
        ));
    }

    #[test]
    fn test_refit_overwrites_previous_model() {
        let (x, y) = blobs();
        let mut svc = LinearSvc::new(Stage::One, SvcOptions::with_c(10.0));
        svc.fit(&x, &y).unwrap();

        let flipped: Vec<&str> = y
            .iter()
            .map(|l| if *l == "up" { "down" } else { "up" })
            .collect();
        svc.fit(&x, &flipped).unwrap();

        assert_eq!(svc.predict(&x).unwrap(), flipped);
        assert!(svc.decision_function(&[2.0, 2.0]).unwrap() < 0.0);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = blobs();
        let mut a = LinearSvc::new(Stage::One, SvcOptions::default());
        let mut b = LinearSvc::new(Stage::One, SvcOptions::default());
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.weights(), b.weights());
        assert_eq!(a.bias(), b.bias());
    }
}
