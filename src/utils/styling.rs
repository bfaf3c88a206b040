//! Terminal styling for the training run

use console::{style, Emoji};
use std::path::Path;

use crate::pipeline::{ClassBalance, TrainingConfig};

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static SEED: Emoji<'_, '_> = Emoji("🎲 ", "");

const CARD_WIDTH: usize = 56;

/// Print the application banner
pub fn print_banner(version: &str) {
    println!();
    println!(
        "    {} {}",
        style("fraudtrain").cyan().bold(),
        style(format!("v{}", version)).dim()
    );
    println!(
        "    {}",
        style("Train, select and export the fraud scoring model").dim()
    );
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Print the configuration card for this run
pub fn print_config(config: &TrainingConfig) {
    let line = "─".repeat(CARD_WIDTH - 2);
    let candidates = config
        .candidates
        .iter()
        .map(|c| c.cli_name())
        .collect::<Vec<_>>()
        .join(", ");

    println!("    ┌{}┐", line);
    println!("    │ {:<52} │", style("Configuration").cyan().bold());
    println!("    ├{}┤", line);
    println!(
        "    │  {}Input:    {:<38}│",
        FOLDER,
        truncate_path(&config.input, 38)
    );
    println!(
        "    │  {}Features: {:<38}│",
        CHART,
        truncate_string(&config.feature_columns.join(", "), 38)
    );
    println!(
        "    │  {}Label:    {:<38}│",
        TARGET,
        truncate_string(&config.label_column, 38)
    );
    println!(
        "    │  {}ONNX:     {:<38}│",
        SAVE,
        truncate_path(&config.onnx_output, 38)
    );
    println!(
        "    │  {}Bundle:   {:<38}│",
        SAVE,
        truncate_path(&config.bundle_output, 38)
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {}Seed: {:<10} Test fraction: {:<16}│",
        SEED,
        style(config.seed).yellow(),
        style(format!("{:.0}%", config.test_fraction * 100.0)).yellow()
    );
    println!(
        "    │  {}Models: {:<40}│",
        CHART,
        truncate_string(&candidates, 40)
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
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

/// Print an error to stderr
pub fn print_error(message: &str) {
    eprintln!("    {} {}", style("✗").red().bold(), style(message).red());
}

/// Print the record counts after loading
pub fn print_class_balance(balance: &ClassBalance) {
    println!(
        "      Loaded {} records",
        style(balance.total).yellow().bold()
    );
    println!(
        "      Fraud cases: {} {}",
        style(balance.positives).yellow().bold(),
        style(format!("({:.2}%)", percent(balance.positives, balance.total))).dim()
    );
    println!(
        "      Legitimate:  {} {}",
        style(balance.negatives).yellow().bold(),
        style(format!("({:.2}%)", percent(balance.negatives, balance.total))).dim()
    );
}

/// Print the final completion message with the deployment reminder
pub fn print_completion(onnx_path: &Path, deploy_dir: &str) {
    println!();
    println!(
        "    {}{}",
        ROCKET,
        style("Training complete!").green().bold()
    );
    println!();
    println!("    {}", style("Next steps:").white().bold());
    for step in next_steps(onnx_path, deploy_dir) {
        println!("      {}", style(step).cyan());
    }
    println!();
}

/// Deployment steps for the fraud service, numbered from 1
pub fn next_steps(onnx_path: &Path, deploy_dir: &str) -> [String; 3] {
    let file_name = onnx_path
        .file_name()
        .map_or_else(|| onnx_path.display().to_string(), |n| n.to_string_lossy().into_owned());
    [
        format!("1. Copy {} to {}", file_name, deploy_dir),
        "2. Uncomment TensorFlowFraudModel.java".to_string(),
        "3. Restart fraud-service".to_string(),
    ]
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

// Helper functions

fn truncate_path(path: &Path, max_len: usize) -> String {
    let path_str = path.display().to_string();
    truncate_string(&path_str, max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}
