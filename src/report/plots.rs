//! Inline SVG charts for the HTML report
//!
//! Both charts are plain SVG strings so the report stays a single
//! self-contained file with no external assets.

use std::fmt::Write;

use anyhow::Result;

use crate::pipeline::ConfusionMatrix;
use crate::report::html::escape_html;
use crate::report::ProjectionReport;

/// Categorical palette, indexed by class position in the sorted label list
const PALETTE: [&str; 6] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b",
];

const CELL: f64 = 90.0;
const CM_MARGIN_LEFT: f64 = 120.0;
const CM_MARGIN_TOP: f64 = 60.0;

const SCATTER_WIDTH: f64 = 640.0;
const SCATTER_HEIGHT: f64 = 480.0;
const SCATTER_PAD: f64 = 60.0;

pub fn class_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// Blend white towards dark blue by `t` in [0, 1]
fn blues(t: f64) -> (String, &'static str) {
    let t = t.clamp(0.0, 1.0);
    let lerp = |from: f64, to: f64| (from + (to - from) * t).round() as u8;
    let fill = format!(
        "#{:02x}{:02x}{:02x}",
        lerp(247.0, 8.0),
        lerp(251.0, 48.0),
        lerp(255.0, 107.0)
    );
    let text = if t > 0.5 { "#ffffff" } else { "#000000" };
    (fill, text)
}

/// Annotated heatmap: rows are true labels, columns predicted labels
pub fn confusion_matrix_svg(cm: &ConfusionMatrix) -> Result<String> {
    let n = cm.labels.len();
    let width = CM_MARGIN_LEFT + CELL * n as f64 + 20.0;
    let height = CM_MARGIN_TOP + CELL * n as f64 + 60.0;
    let max = cm.max_count().max(1) as f64;

    let mut svg = String::new();
    write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="13">"#,
        w = width,
        h = height
    )?;
    write!(
        svg,
        r#"<text x="{}" y="24" text-anchor="middle" font-size="16" font-weight="bold">Confusion Matrix - Final Predictions</text>"#,
        width / 2.0
    )?;

    for (i, row) in cm.counts.iter().enumerate() {
        for (j, &count) in row.iter().enumerate() {
            let x = CM_MARGIN_LEFT + CELL * j as f64;
            let y = CM_MARGIN_TOP + CELL * i as f64;
            let (fill, text) = blues(count as f64 / max);
            write!(
                svg,
                r##"<rect x="{x}" y="{y}" width="{c}" height="{c}" fill="{fill}" stroke="#ffffff"/><text x="{tx}" y="{ty}" text-anchor="middle" dominant-baseline="middle" fill="{text}" font-size="18">{count}</text>"##,
                c = CELL,
                tx = x + CELL / 2.0,
                ty = y + CELL / 2.0,
            )?;
        }
    }

    for (k, label) in cm.labels.iter().enumerate() {
        let label = escape_html(label);
        let centre = CELL * k as f64 + CELL / 2.0;
        write!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="end" dominant-baseline="middle">{}</text>"#,
            CM_MARGIN_LEFT - 8.0,
            CM_MARGIN_TOP + centre,
            label
        )?;
        write!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
            CM_MARGIN_LEFT + centre,
            CM_MARGIN_TOP + CELL * n as f64 + 20.0,
            label
        )?;
    }

    write!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-weight="bold">Predicted</text>"#,
        CM_MARGIN_LEFT + CELL * n as f64 / 2.0,
        height - 10.0
    )?;
    write!(
        svg,
        r#"<text x="16" y="{y}" text-anchor="middle" font-weight="bold" transform="rotate(-90 16 {y})">True</text>"#,
        y = CM_MARGIN_TOP + CELL * n as f64 / 2.0
    )?;
    svg.push_str("</svg>");
    Ok(svg)
}

/// Scatter of the test set in PCA space. Colour is the true class; circles are
/// correct predictions and crosses misclassifications.
pub fn pca_scatter_svg(projection: &ProjectionReport, labels: &[String]) -> Result<String> {
    let (min_x, max_x) = extent(projection.points.iter().map(|p| p.pc1));
    let (min_y, max_y) = extent(projection.points.iter().map(|p| p.pc2));
    let plot_w = SCATTER_WIDTH - 2.0 * SCATTER_PAD;
    let plot_h = SCATTER_HEIGHT - 2.0 * SCATTER_PAD;
    let sx = |v: f64| SCATTER_PAD + (v - min_x) / (max_x - min_x) * plot_w;
    let sy = |v: f64| SCATTER_HEIGHT - SCATTER_PAD - (v - min_y) / (max_y - min_y) * plot_h;

    let mut svg = String::new();
    write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="13">"#,
        w = SCATTER_WIDTH,
        h = SCATTER_HEIGHT + 40.0
    )?;
    write!(
        svg,
        r#"<text x="{}" y="24" text-anchor="middle" font-size="16" font-weight="bold">PCA 2D Scatter Plot - Test Set</text>"#,
        SCATTER_WIDTH / 2.0
    )?;
    write!(
        svg,
        r##"<rect x="{p}" y="{p}" width="{w}" height="{h}" fill="none" stroke="#cccccc"/>"##,
        p = SCATTER_PAD,
        w = plot_w,
        h = plot_h
    )?;

    for point in &projection.points {
        let color = labels
            .iter()
            .position(|l| *l == point.ground_truth)
            .map_or("#7f7f7f", class_color);
        let (x, y) = (sx(point.pc1), sy(point.pc2));
        if point.correct {
            write!(
                svg,
                r#"<circle cx="{x:.2}" cy="{y:.2}" r="6" fill="{color}" fill-opacity="0.7" stroke="{color}"><title>#{} {}</title></circle>"#,
                point.index,
                escape_html(&point.ground_truth)
            )?;
        } else {
            write!(
                svg,
                r#"<path d="M{:.2},{:.2} L{:.2},{:.2} M{:.2},{:.2} L{:.2},{:.2}" stroke="{color}" stroke-width="3"><title>#{} {} predicted as {}</title></path>"#,
                x - 7.0,
                y - 7.0,
                x + 7.0,
                y + 7.0,
                x - 7.0,
                y + 7.0,
                x + 7.0,
                y - 7.0,
                point.index,
                escape_html(&point.ground_truth),
                escape_html(&point.final_pred)
            )?;
        }
    }

    let [r1, r2] = projection.explained_variance_ratio;
    write!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle">PC1 ({:.2}% variance)</text>"#,
        SCATTER_WIDTH / 2.0,
        SCATTER_HEIGHT - SCATTER_PAD + 30.0,
        r1 * 100.0
    )?;
    write!(
        svg,
        r#"<text x="18" y="{y}" text-anchor="middle" transform="rotate(-90 18 {y})">PC2 ({:.2}% variance)</text>"#,
        r2 * 100.0,
        y = SCATTER_HEIGHT / 2.0
    )?;

    // Legend: one swatch per class plus the marker key
    let mut ly = SCATTER_HEIGHT + 10.0;
    let mut lx = SCATTER_PAD;
    for (k, label) in labels.iter().enumerate() {
        write!(
            svg,
            r#"<circle cx="{}" cy="{}" r="6" fill="{}"/><text x="{}" y="{}" dominant-baseline="middle">{}</text>"#,
            lx,
            ly,
            class_color(k),
            lx + 12.0,
            ly,
            escape_html(label)
        )?;
        lx += 130.0;
    }
    ly += 20.0;
    write!(
        svg,
        r##"<text x="{}" y="{}" dominant-baseline="middle" fill="#555555">o correct, x misclassified</text>"##,
        SCATTER_PAD, ly
    )?;

    svg.push_str("</svg>");
    Ok(svg)
}

/// Padded [min, max] of the values; never zero-width
fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (-1.0, 1.0);
    }
    let pad = ((max - min) * 0.05).max(0.5);
    (min - pad, max + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ProjectedPoint;

    fn labels() -> Vec<String> {
        vec!["a".to_string(), "b<c".to_string()]
    }

    #[test]
    fn test_confusion_matrix_svg_contains_counts_and_labels() {
        let cm = ConfusionMatrix {
            labels: labels(),
            counts: vec![vec![12, 0], vec![3, 9]],
        };
        let svg = confusion_matrix_svg(&cm).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<rect").count(), 4);
        assert!(svg.contains(">12</text>"));
        assert!(svg.contains("b&lt;c"));
        assert!(!svg.contains("b<c"));
    }

    #[test]
    fn test_blues_endpoints() {
        assert_eq!(blues(0.0).0, "#f7fbff");
        assert_eq!(blues(1.0).0, "#08306b");
        assert_eq!(blues(1.0).1, "#ffffff");
    }

    #[test]
    fn test_pca_scatter_marks_errors_with_crosses() {
        let projection = ProjectionReport {
            explained_variance_ratio: [0.7, 0.2],
            points: vec![
                ProjectedPoint {
                    index: 0,
                    pc1: -1.0,
                    pc2: 0.0,
                    ground_truth: "a".to_string(),
                    final_pred: "a".to_string(),
                    correct: true,
                },
                ProjectedPoint {
                    index: 1,
                    pc1: 1.0,
                    pc2: 0.5,
                    ground_truth: "b<c".to_string(),
                    final_pred: "a".to_string(),
                    correct: false,
                },
            ],
        };
        let svg = pca_scatter_svg(&projection, &labels()).unwrap();
        assert!(svg.contains("PC1 (70.00% variance)"));
        assert!(svg.contains("PC2 (20.00% variance)"));
        assert!(svg.contains("<path d=\"M"));
        assert!(svg.contains(class_color(1)));
    }

    #[test]
    fn test_extent_of_single_point_is_not_empty() {
        let (lo, hi) = extent([2.0].into_iter());
        assert!(hi > lo);
    }
}
