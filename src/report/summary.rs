//! Run summary console display

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::{ConfusionMatrix, Metrics};

/// Summary of one cascade run, shown at the end of the CLI pipeline
#[derive(Debug, Default)]
pub struct RunSummary {
    pub n_train: usize,
    pub n_test: usize,
    pub metrics: Option<Metrics>,
    pub margins: Option<(f64, f64)>,
    pub confusion_matrix: Option<ConfusionMatrix>,
    pub load_time: Duration,
    pub train_time: Duration,
    pub predict_time: Duration,
    pub report_time: Duration,
}

impl RunSummary {
    pub fn new(n_train: usize, n_test: usize) -> Self {
        Self {
            n_train,
            n_test,
            ..Default::default()
        }
    }

    pub fn total_time(&self) -> Duration {
        self.load_time + self.train_time + self.predict_time + self.report_time
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("CASCADE SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("📁 Train Samples"), Cell::new(self.n_train)]);
        table.add_row(vec![Cell::new("🧪 Test Samples"), Cell::new(self.n_test)]);

        if let Some((m1, m2)) = self.margins {
            table.add_row(vec![
                Cell::new("📏 Stage 1 Margin"),
                Cell::new(format!("{:.6}", m1)),
            ]);
            table.add_row(vec![
                Cell::new("📏 Stage 2 Margin"),
                Cell::new(format!("{:.6}", m2)),
            ]);
        }

        if let Some(metrics) = &self.metrics {
            table.add_row(vec![
                Cell::new("1️⃣  Stage 1 Accuracy"),
                Cell::new(format!("{:.2}%", metrics.stage1_accuracy * 100.0)),
            ]);
            table.add_row(vec![
                Cell::new("2️⃣  Stage 2 Accuracy"),
                Cell::new(
                    metrics
                        .stage2_accuracy
                        .map_or_else(|| "n/a".to_string(), |a| format!("{:.2}%", a * 100.0)),
                ),
            ]);

            let color = if metrics.accuracy >= 0.95 {
                Color::Green
            } else if metrics.accuracy >= 0.8 {
                Color::Yellow
            } else {
                Color::Red
            };
            table.add_row(vec![
                Cell::new("✅ Accuracy"),
                Cell::new(format!(
                    "{:.2}% ({}/{})",
                    metrics.accuracy * 100.0,
                    metrics.correct,
                    metrics.total
                ))
                .fg(color)
                .add_attribute(Attribute::Bold),
            ]);
        }

        table.add_row(vec![
            Cell::new("⏱️  Total Time"),
            Cell::new(format!("{:.2?}", self.total_time())),
        ]);

        // Indent the table
        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        if let Some(cm) = &self.confusion_matrix {
            println!();
            println!(
                "    {} {}",
                style("🧮").cyan(),
                style("CONFUSION MATRIX").white().bold()
            );
            println!("    {}", style("─".repeat(50)).dim());
            println!();
            for line in confusion_table(cm).to_string().lines() {
                println!("    {}", line);
            }
        }
    }
}

/// Rows are true labels, columns predicted labels; the diagonal is highlighted
pub fn confusion_table(cm: &ConfusionMatrix) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);

    let mut header = vec![Cell::new("True \\ Predicted").add_attribute(Attribute::Bold)];
    header.extend(
        cm.labels
            .iter()
            .map(|l| Cell::new(l).add_attribute(Attribute::Bold)),
    );
    table.set_header(header);

    for (i, (label, row)) in cm.labels.iter().zip(&cm.counts).enumerate() {
        let mut cells = vec![Cell::new(label).add_attribute(Attribute::Bold)];
        cells.extend(row.iter().enumerate().map(|(j, count)| {
            let cell = Cell::new(count).set_alignment(CellAlignment::Right);
            if i == j {
                cell.fg(Color::Green)
            } else if *count > 0 {
                cell.fg(Color::Red)
            } else {
                cell
            }
        }));
        table.add_row(cells);
    }

    table
}
