//! Pipeline module - dataset preparation, the two-stage cascade and its evaluation

pub mod cascade;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod iris;
pub mod labels;
pub mod pca;
pub mod scaler;
pub mod split;
pub mod svm;

pub use cascade::*;
pub use dataset::*;
pub use error::{CascadeError, Stage};
pub use evaluation::*;
pub use iris::*;
pub use labels::*;
pub use pca::Pca;
pub use scaler::FeatureScaler;
pub use split::*;
pub use svm::{LinearSeparator, LinearSvc, SvcOptions};
