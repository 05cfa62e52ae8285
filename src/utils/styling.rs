//! Terminal styling utilities

use std::time::Duration;

use console::{style, Emoji};

use crate::cli::RunConfig;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static DICE: Emoji<'_, '_> = Emoji("🎲 ", "");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "");

const CARD_WIDTH: usize = 56;

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
     ___   _   ___  ___   _   ___  ___     _____   ____  __
    / __| /_\ / __|/ __| /_\ |   \| __|___/ __\ \ / /  \/  |
   | (__ / _ \\__ \ (__ / _ \| |) | _|___\__ \\ V /| |\/| |
    \___/_/ \_\___/\___/_/ \_\___/|___|  |___/ \_/ |_|  |_|
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {} {}",
        style("⟂").magenta().bold(),
        style("Two hyperplanes, one cascade").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Print configuration card
pub fn print_config(config: &RunConfig) {
    let line = "─".repeat(CARD_WIDTH - 2);
    let row = |icon: &Emoji<'_, '_>, label: &str, value: String| {
        println!(
            "    │  {}{:<13}{:<37}│",
            icon,
            label,
            truncate_string(&value, 36)
        );
    };

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(CARD_WIDTH - 20)
    );
    println!("    ├{}┤", line);
    row(&FOLDER, "Input:", config.source.describe());
    row(&TARGET, "Label:", config.label_column.clone());
    row(&SAVE, "Output:", config.output_dir.display().to_string());
    println!("    ├{}┤", line);
    row(&TARGET, "Singleton:", config.singleton.clone());
    row(
        &CHART,
        "C:",
        format!("stage 1 = {}, stage 2 = {}", config.c_stage1, config.c_stage2),
    );
    row(
        &DICE,
        "Split:",
        format!(
            "{:.0}% test, seed {}",
            config.test_size * 100.0,
            config.seed
        ),
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, total: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}/{}", step_num, total)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print an indented key/value detail line
pub fn print_detail(key: &str, value: impl std::fmt::Display) {
    println!("      {}: {}", style(key).dim(), style(value).yellow());
}

/// Print how long a step took
pub fn print_step_time(elapsed: Duration) {
    println!("    {}{}", CLOCK, style(format!("{:.2?}", elapsed)).dim());
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!(
        "    {} {}",
        ROCKET,
        style("Cascade run complete!").green().bold()
    );
    println!();
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let tail: String = s
            .chars()
            .rev()
            .take(max_len.saturating_sub(3))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("...{}", tail)
    }
}
