//! Cascade-SVM: Two-Stage Linear SVM Cascade Library
//!
//! Splits a three-class problem into a singleton-vs-merged decision followed by a
//! binary split of the merged pair, recovers both separating hyperplanes in
//! standardized and original feature units, and renders a self-contained report.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
