//! fraudtrain: Fraud Model Training CLI
//!
//! Loads the labelled transaction export, trains every candidate classifier,
//! keeps the one with the best hold-out ROC-AUC and writes it as an ONNX graph
//! plus a native bundle.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use fraudtrain::cli::Cli;
use fraudtrain::export::export_artifacts;
use fraudtrain::pipeline::{load_training_data, train_and_select};
use fraudtrain::report::TrainingSummary;
use fraudtrain::utils::progress::{create_spinner, finish_with_success};
use fraudtrain::utils::styling::{
    print_banner, print_class_balance, print_completion, print_config, print_info,
    print_step_header, print_success,
};

fn main() -> Result<()> {
    let config = Cli::parse().into_config()?;
    let start = Instant::now();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&config);

    // Step 1: Load training data
    print_step_header(1, "Load Training Data");
    let spinner = create_spinner(&format!("Reading {}...", config.input.display()));
    let dataset = load_training_data(
        &config.input,
        &config.feature_columns,
        &config.label_column,
        config.infer_schema_length,
    )
    .with_context(|| format!("Failed to load training data from {}", config.input.display()))?;
    finish_with_success(&spinner, "Dataset loaded");
    print_class_balance(&dataset.class_balance());

    // Step 2: Train candidates and select the best by ROC-AUC
    print_step_header(2, "Train & Select");
    let outcome = train_and_select(&dataset, &config)?;
    print_info(&format!(
        "Split: {} train / {} test rows",
        outcome.train_size, outcome.test_size
    ));
    if let Some(best) = outcome.selected_result() {
        print_success(&format!(
            "Best Model: {} (AUC: {:.4})",
            best.kind, best.auc
        ));
    }

    // Step 3: Export both artifacts; one failing does not stop the other
    print_step_header(3, "Export");
    let exports = export_artifacts(&outcome, &config);

    let mut summary = TrainingSummary::new(&outcome);
    summary.add_exports(&exports);
    summary.display();

    exports.into_result()?;

    print_info(&format!("Total time: {:.1}s", start.elapsed().as_secs_f64()));
    print_completion(&config.onnx_output, &config.deploy_dir);
    Ok(())
}
