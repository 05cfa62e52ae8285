//! Cascade-SVM: Two-Stage Linear SVM Cascade CLI
//!
//! Trains a singleton-vs-merged SVM followed by an SVM splitting the merged pair,
//! evaluates the cascade on a stratified hold-out set and writes an HTML report.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use cascade_svm::cli::{self, confirm_overwrite, Cli, Commands, DataSource, RunConfig};
use cascade_svm::pipeline::{
    confusion_matrix, derive_stage1_labels, evaluate, load_dataset_csv, load_iris,
    predictions_table, select_stage2_subset, stratified_split, CascadeClassifier, Dataset,
    FeatureScaler, Pca, Stage,
};
use cascade_svm::report::{
    export_predictions_csv, export_results_json, package_reports, write_html_report,
    CascadeReportBuilder, ProjectionReport, ReportBuilderParams, RunSummary, StageReport,
};
use cascade_svm::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_detail, print_info, print_step_header, print_step_time, print_success,
};

const TOTAL_STEPS: u8 = 7;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle subcommands
    if let Some(command) = &cli.command {
        return match command {
            Commands::ExportIris {
                output,
                label_column,
            } => cli::export::run_export_iris(output, label_column),
        };
    }

    let config = cli.run_config();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&config);

    let existing = config.existing_outputs();
    if config.confirm && !existing.is_empty() && !confirm_overwrite(&existing)? {
        println!("Cancelled by user.");
        return Ok(());
    }

    run_pipeline(&config)?;

    print_completion();
    Ok(())
}

fn load_data(config: &RunConfig) -> Result<Dataset> {
    match &config.source {
        DataSource::BuiltInIris => Ok(load_iris()),
        DataSource::Csv(path) => {
            let spinner = create_spinner("Reading CSV...");
            let dataset = load_dataset_csv(path, &config.label_column, config.infer_schema_length)?;
            finish_with_success(&spinner, "CSV loaded");
            Ok(dataset)
        }
    }
}

fn run_pipeline(config: &RunConfig) -> Result<()> {
    // Step 1: Load dataset
    print_step_header(1, TOTAL_STEPS, "Load Dataset");
    let step_start = Instant::now();
    let dataset = load_data(config)?;
    print_success("Dataset loaded");
    print_detail("Source", config.source.describe());
    print_detail("Samples", dataset.len());
    print_detail("Features", dataset.n_features());
    for (class, count) in dataset.class_counts() {
        print_detail(&format!("  {}", class), count);
    }

    // Step 2: Split and standardize
    print_step_header(2, TOTAL_STEPS, "Stratified Split & Standardization");
    let split = stratified_split(&dataset, config.test_size, config.seed)
        .context("Failed to split dataset")?;
    print_success(&format!(
        "Train: {} samples | Test: {} samples",
        split.train.len(),
        split.test.len()
    ));

    let scaler = FeatureScaler::fit(&split.train.features).context("Failed to fit scaler")?;
    let x_train = scaler.transform(&split.train.features)?;
    let x_test = scaler.transform(&split.test.features)?;
    print_success("Scaler fitted on training data");

    let mut summary = RunSummary::new(split.train.len(), split.test.len());
    summary.load_time = step_start.elapsed();
    print_step_time(summary.load_time);

    // Step 3: Train stage 1
    print_step_header(3, TOTAL_STEPS, "Train Stage 1 SVM (Singleton vs Merged)");
    let step_start = Instant::now();
    let mut model = CascadeClassifier::new(
        config.c_stage1,
        config.c_stage2,
        &config.singleton,
        &dataset.labels,
    )
    .context("Invalid cascade configuration")?;
    let label_set = model.label_set().clone();
    let [merged_a, merged_b] = label_set.merged();

    let spinner = create_spinner("Solving stage 1...");
    let y_stage1 = derive_stage1_labels(&split.train.labels, &config.singleton);
    model
        .train_stage1(&x_train, &y_stage1)
        .context("Stage 1 training failed")?;
    finish_with_success(
        &spinner,
        &format!("Stage 1 trained: {} vs non-{}", config.singleton, config.singleton),
    );

    // Step 4: Train stage 2
    print_step_header(4, TOTAL_STEPS, "Train Stage 2 SVM (Split Merged Pair)");
    let spinner = create_spinner("Solving stage 2...");
    let (x_merged, y_merged) =
        select_stage2_subset(&x_train, &split.train.labels, &config.singleton)?;
    model
        .train_stage2(&x_merged, &y_merged)
        .context("Stage 2 training failed")?;
    finish_with_success(
        &spinner,
        &format!("Stage 2 trained: {} vs {}", merged_a, merged_b),
    );

    let (sv1, sv2) = model.support_vector_counts();
    let spinner = create_spinner("Checking solver convergence...");
    let converged = model.stage1_separator().converged().unwrap_or(false)
        && model.stage2_separator().converged().unwrap_or(false);
    if converged {
        finish_with_success(&spinner, "Both solvers converged");
    } else {
        finish_with_warning(&spinner, "Solver hit its iteration limit before converging");
    }
    print_detail(
        "Support vectors",
        format!("stage 1 = {}, stage 2 = {}", sv1.unwrap_or(0), sv2.unwrap_or(0)),
    );
    summary.train_time = step_start.elapsed();
    print_step_time(summary.train_time);

    // Step 5: Predict and evaluate
    print_step_header(5, TOTAL_STEPS, "Predict & Evaluate");
    let step_start = Instant::now();
    let predictions = model.predict(&x_test).context("Cascade prediction failed")?;
    let metrics = evaluate(&predictions, &split.test.labels, &config.singleton)?;
    let cm = confusion_matrix(&predictions, &split.test.labels)?;
    let records = predictions_table(&split.test_indices, &predictions, &split.test.labels)?;
    print_success(&format!(
        "Test accuracy: {:.4} ({:.2}%)",
        metrics.accuracy,
        metrics.accuracy * 100.0
    ));
    summary.predict_time = step_start.elapsed();
    print_step_time(summary.predict_time);

    // Step 6: Hyperplanes and projection
    print_step_header(6, TOTAL_STEPS, "Hyperplanes & PCA Projection");
    let step_start = Instant::now();
    let feature_names = dataset.feature_names.clone();
    let mut builder = CascadeReportBuilder::new(ReportBuilderParams {
        input_source: config.source.describe(),
        label_column: config.label_column.clone(),
        feature_names: feature_names.clone(),
        c_stage1: model.c_stage1(),
        c_stage2: model.c_stage2(),
        test_size: config.test_size,
        seed: config.seed,
        singleton_class: config.singleton.clone(),
        merged_classes: [merged_a.clone(), merged_b.clone()],
    });
    builder.set_split_sizes(split.train.len(), split.test.len());

    let mut margins = [0.0; 2];
    for (stage, n_support, description) in [
        (
            Stage::One,
            sv1,
            format!("{} vs {{{}, {}}}", config.singleton, merged_a, merged_b),
        ),
        (Stage::Two, sv2, format!("{} vs {}", merged_a, merged_b)),
    ] {
        let standardized = model.hyperplane(stage)?;
        let original = standardized.to_original_space(&scaler)?;
        print_info(&format!(
            "{}: margin {:.6}, bias {:.6} (original {:.6})",
            stage, standardized.margin, standardized.bias, original.bias
        ));
        let slot = match stage {
            Stage::One => 0,
            Stage::Two => 1,
        };
        margins[slot] = standardized.margin;
        builder.set_stage(StageReport::new(
            stage,
            description,
            &feature_names,
            &standardized,
            &original,
            n_support,
        ));
    }

    if dataset.n_features() >= 2 {
        let pca = Pca::fit(&x_train).context("PCA projection failed")?;
        let points = pca.transform(&x_test)?;
        // Records are sorted by row index; test rows are stored in the same order
        builder.set_projection(ProjectionReport::new(&pca, &points, &records));
        print_success(&format!(
            "PCA: PC1 {:.2}% | PC2 {:.2}% of variance",
            pca.explained_variance_ratio()[0] * 100.0,
            pca.explained_variance_ratio()[1] * 100.0
        ));
    } else {
        print_info("PCA projection skipped: fewer than two features");
    }

    summary.margins = Some((margins[0], margins[1]));
    summary.metrics = Some(metrics.clone());
    summary.confusion_matrix = Some(cm.clone());
    builder.set_evaluation(metrics, cm, records.clone());

    // Step 7: Write reports
    print_step_header(7, TOTAL_STEPS, "Write Reports");
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            config.output_dir.display()
        )
    })?;

    let spinner = create_spinner("Rendering report...");
    summary.report_time = step_start.elapsed();
    builder.set_timing(&summary);
    let report = builder.build()?;

    let report_path = config.report_path();
    let results_path = config.results_path();
    let predictions_path = config.predictions_path();
    write_html_report(&report, &report_path)?;
    export_results_json(&report, &results_path)?;
    export_predictions_csv(&records, &predictions_path)?;
    finish_with_success(&spinner, "Reports written");

    print_detail("HTML", report_path.display());
    print_detail("JSON", results_path.display());
    print_detail("CSV", predictions_path.display());

    if config.bundle {
        let bundle_path = config.bundle_path();
        package_reports(
            &[
                report_path.as_path(),
                results_path.as_path(),
                predictions_path.as_path(),
            ],
            &bundle_path,
        )?;
        print_detail("Bundle", bundle_path.display());
    }

    summary.report_time = step_start.elapsed();
    print_step_time(summary.report_time);

    summary.display();

    println!(
        "\n    {} Open {} in your web browser to view the results.",
        style("→").cyan(),
        style(report_path.display()).bold()
    );

    Ok(())
}
