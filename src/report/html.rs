//! Self-contained HTML report

use std::fmt::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::report::plots::{confusion_matrix_svg, pca_scatter_svg};
use crate::report::{CascadeReport, StageReport};

const STYLE: &str = r#"
        body {
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            max-width: 1200px;
            margin: 0 auto;
            padding: 20px;
            background-color: #f5f5f5;
        }
        .header {
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            color: white;
            padding: 30px;
            border-radius: 10px;
            margin-bottom: 30px;
        }
        h1 { margin: 0 0 10px 0; }
        .section {
            background: white;
            padding: 25px;
            margin-bottom: 20px;
            border-radius: 8px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }
        h2 {
            color: #667eea;
            border-bottom: 2px solid #667eea;
            padding-bottom: 10px;
        }
        table { width: 100%; border-collapse: collapse; margin: 15px 0; }
        th, td { padding: 12px; text-align: left; border-bottom: 1px solid #ddd; }
        th { background-color: #667eea; color: white; }
        tr:hover { background-color: #f5f5f5; }
        tr.wrong { background-color: #fdecea; }
        .metric {
            display: inline-block;
            background-color: #e7f3ff;
            padding: 10px 20px;
            border-radius: 5px;
            margin: 10px 10px 10px 0;
            font-weight: bold;
        }
        .img-container { text-align: center; margin: 20px 0; }
        .metadata { color: #eee; font-size: 0.9em; }
"#;

/// Escape text for HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn metric(html: &mut String, text: &str) -> fmt::Result {
    writeln!(html, r#"        <div class="metric">{}</div>"#, escape_html(text))
}

fn stage_section(html: &mut String, title: &str, stage: &StageReport) -> fmt::Result {
    writeln!(html, r#"    <div class="section">"#)?;
    writeln!(html, "        <h2>{}</h2>", escape_html(title))?;
    html.push_str(
        "        <table>\n            <tr><th>Feature</th><th>Weight (Standardized)</th><th>Weight (Original)</th></tr>\n",
    );
    for w in &stage.weights {
        writeln!(
            html,
            "            <tr><td>{}</td><td>{:.6}</td><td>{:.6}</td></tr>",
            escape_html(&w.feature),
            w.standardized,
            w.original
        )?;
    }
    html.push_str("        </table>\n");
    metric(html, &format!("Bias (Standardized): {:.6}", stage.bias_standardized))?;
    metric(html, &format!("Bias (Original): {:.6}", stage.bias_original))?;
    metric(html, &format!("Margin (Standardized): {:.6}", stage.margin_standardized))?;
    metric(html, &format!("Margin (Original): {:.6}", stage.margin_original))?;
    if let Some(n) = stage.n_support {
        metric(html, &format!("Support Vectors: {}", n))?;
    }
    html.push_str("    </div>\n");
    Ok(())
}

/// Render the full report page
pub fn render_html(report: &CascadeReport) -> Result<String> {
    let settings = &report.settings;
    let [merged_a, merged_b] = &settings.merged_classes;
    let stage1 = report.stage(1).context("Report has no stage 1 hyperplane")?;
    let stage2 = report.stage(2).context("Report has no stage 2 hyperplane")?;

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("    <meta charset=\"UTF-8\">\n");
    html.push_str(
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str("    <title>Two-Stage SVM Cascade Report</title>\n");
    writeln!(html, "    <style>{}    </style>", STYLE)?;
    html.push_str("</head>\n<body>\n");

    html.push_str("    <div class=\"header\">\n        <h1>Two-Stage SVM Cascade Report</h1>\n");
    writeln!(
        html,
        r#"        <p class="metadata">Generated: {}</p>"#,
        escape_html(&report.metadata.timestamp)
    )?;
    writeln!(
        html,
        r#"        <p class="metadata">cascade-svm {} | input: {}</p>"#,
        escape_html(&report.metadata.cascade_svm_version),
        escape_html(&report.metadata.input_source)
    )?;
    html.push_str("    </div>\n");

    // Training configuration
    html.push_str("    <div class=\"section\">\n        <h2>Training Configuration</h2>\n");
    metric(&mut html, "Kernel: Linear")?;
    metric(&mut html, &format!("Stage 1 C: {}", settings.c_stage1))?;
    metric(&mut html, &format!("Stage 2 C: {}", settings.c_stage2))?;
    metric(&mut html, "Scaling: Standardize (fit on train)")?;
    let test_pct = (settings.test_size * 100.0).round();
    metric(
        &mut html,
        &format!("Split: {}/{} Stratified", 100.0 - test_pct, test_pct),
    )?;
    metric(&mut html, &format!("Random State: {}", settings.seed))?;
    metric(
        &mut html,
        &format!(
            "Samples: {} train / {} test",
            report.metadata.n_train, report.metadata.n_test
        ),
    )?;
    html.push_str("        <p><strong>Class Grouping:</strong></p>\n        <ul>\n");
    writeln!(
        html,
        "            <li>Singleton: {}</li>",
        escape_html(&settings.singleton_class)
    )?;
    writeln!(
        html,
        "            <li>Merged: {} &cup; {}</li>",
        escape_html(merged_a),
        escape_html(merged_b)
    )?;
    html.push_str("        </ul>\n    </div>\n");

    stage_section(
        &mut html,
        "Stage 1 - Hyperplane & Margin (Singleton vs Merged)",
        stage1,
    )?;
    stage_section(
        &mut html,
        &format!("Stage 2 - Hyperplane & Margin ({} vs {})", merged_a, merged_b),
        stage2,
    )?;

    // Accuracy
    let metrics = &report.metrics;
    html.push_str("    <div class=\"section\">\n        <h2>Test Set Accuracy</h2>\n");
    metric(
        &mut html,
        &format!(
            "Accuracy: {:.4} ({:.2}%)",
            metrics.accuracy,
            metrics.accuracy * 100.0
        ),
    )?;
    metric(
        &mut html,
        &format!("Stage 1 Accuracy: {:.2}%", metrics.stage1_accuracy * 100.0),
    )?;
    metric(
        &mut html,
        &metrics.stage2_accuracy.map_or_else(
            || "Stage 2 Accuracy: n/a (no merged-class rows in the test set)".to_string(),
            |a| format!("Stage 2 Accuracy: {:.2}%", a * 100.0),
        ),
    )?;
    writeln!(
        html,
        "        <p>Correct predictions: {} / {}</p>",
        metrics.correct, metrics.total
    )?;
    html.push_str("    </div>\n");

    // Predictions table
    writeln!(
        html,
        "    <div class=\"section\">\n        <h2>Predictions vs Ground Truth ({:.0}% Test Set)</h2>",
        settings.test_size * 100.0
    )?;
    html.push_str(
        "        <table>\n            <tr><th>index</th><th>ground_truth</th><th>stage1_pred</th><th>stage2_pred</th><th>final_pred</th></tr>\n",
    );
    for record in &report.predictions {
        writeln!(
            html,
            "            <tr{}><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            if record.correct { "" } else { " class=\"wrong\"" },
            record.index,
            escape_html(&record.ground_truth),
            record.stage1_pred,
            escape_html(record.stage2_pred.as_deref().unwrap_or_default()),
            escape_html(&record.final_pred)
        )?;
    }
    html.push_str("        </table>\n    </div>\n");

    // Charts
    let n_classes = report.confusion_matrix.labels.len();
    writeln!(
        html,
        "    <div class=\"section\">\n        <h2>Confusion Matrix</h2>\n        <div class=\"img-container\">{}</div>",
        confusion_matrix_svg(&report.confusion_matrix)?
    )?;
    writeln!(
        html,
        "        <p><em>{0}&times;{0} confusion matrix comparing final predictions against ground truth.</em></p>\n    </div>",
        n_classes
    )?;

    if let Some(projection) = &report.projection {
        writeln!(
            html,
            "    <div class=\"section\">\n        <h2>PCA 2D Scatter Plot (Test Set)</h2>\n        <div class=\"img-container\">{}</div>",
            pca_scatter_svg(projection, &report.confusion_matrix.labels)?
        )?;
        html.push_str(
            "        <p><em>PCA projection of the test set. Circles (o) indicate correct predictions,\n        crosses (x) indicate misclassifications. Colors represent the true class.</em></p>\n    </div>\n",
        );
    }

    html.push_str("</body>\n</html>\n");
    Ok(html)
}

/// Render and write the report page
pub fn write_html_report(report: &CascadeReport, output_path: &Path) -> Result<()> {
    let html = render_html(report)?;
    std::fs::write(output_path, html)
        .with_context(|| format!("Failed to write HTML report to {}", output_path.display()))?;
    Ok(())
}
