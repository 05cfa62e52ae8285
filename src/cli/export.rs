//! `export-iris` subcommand: write the built-in dataset to CSV

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use crate::pipeline::{load_iris, write_dataset_csv};
use crate::utils::create_spinner;

/// Write the embedded Iris table as CSV with the given label column name
pub fn run_export_iris(output: &Path, label_column: &str) -> Result<()> {
    println!(
        "\n {} Exporting built-in Iris dataset",
        style("◆").cyan().bold()
    );
    println!("   Output: {}", style(output.display()).dim());
    println!();

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let dataset = load_iris();
    let spinner = create_spinner("Writing CSV...");
    write_dataset_csv(&dataset, label_column, output)?;
    spinner.finish_with_message(format!("{} CSV written", style("✓").green()));

    println!();
    println!(
        "   {} rows × {} columns",
        style(dataset.len()).yellow(),
        style(dataset.n_features() + 1).yellow()
    );
    println!();
    println!(" {} Export complete!", style("✓").green().bold());

    Ok(())
}
