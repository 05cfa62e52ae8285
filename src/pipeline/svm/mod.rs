//! Linear separators for the cascade stages
//!
//! The cascade only needs a deterministic linear fit exposing its weight vector
//! and bias. [`LinearSeparator`] captures that capability; [`LinearSvc`] is the
//! support vector implementation used by default.
//!
//! # Key Components
//!
//! - `LinearSeparator`: fit / decision / predict / weights / bias
//! - `LinearSvc`: C-SVC with a linear kernel
//! - `SmoSolver`: dual solver behind `LinearSvc`

mod linear_svc;
mod smo;

pub use linear_svc::{LinearSvc, SvcOptions};
pub use smo::{gram_matrix, SmoOptions, SmoSolution, SmoSolver};

use super::error::CascadeError;

/// A binary linear classifier `sign(w . x + b)` over labels of type `L`
pub trait LinearSeparator<L> {
    /// Train on rows `x` with labels `y`. Exactly two distinct labels are
    /// required. A second call replaces the previous fit.
    fn fit(&mut self, x: &[Vec<f64>], y: &[L]) -> Result<(), CascadeError>;

    /// Signed distance-like score `w . row + b`
    fn decision_function(&self, row: &[f64]) -> Result<f64, CascadeError>;

    fn predict_row(&self, row: &[f64]) -> Result<L, CascadeError>;

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<L>, CascadeError> {
        x.iter().map(|row| self.predict_row(row)).collect()
    }

    fn weights(&self) -> Option<&[f64]>;

    fn bias(&self) -> Option<f64>;

    /// The two labels seen at fit time, negative side first
    fn classes(&self) -> Option<&[L]>;

    fn is_fitted(&self) -> bool {
        self.weights().is_some()
    }

    fn n_features(&self) -> Option<usize> {
        self.weights().map(|w| w.len())
    }
}
