//! Report module - structured results, charts, HTML page and console summary

pub mod bundle;
pub mod html;
pub mod plots;
pub mod results;
pub mod summary;

pub use bundle::*;
pub use html::*;
pub use results::*;
pub use summary::*;
