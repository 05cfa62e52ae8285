//! CLI module - argument parsing, interactive prompts and subcommands

mod args;
pub mod export;
mod prompts;

pub use args::{Cli, Commands, DataSource, RunConfig};
pub use prompts::*;
