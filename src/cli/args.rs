//! Command-line argument definitions using clap

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::models::CandidateKind;
use crate::pipeline::config::{
    TrainingConfig, DEFAULT_BUNDLE_OUTPUT, DEFAULT_DEPLOY_DIR, DEFAULT_INPUT,
    DEFAULT_LABEL_COLUMN, DEFAULT_ONNX_OUTPUT,
};

/// fraudtrain - Train fraud classifiers, keep the best by ROC-AUC and export it
#[derive(Parser, Debug)]
#[command(name = "fraudtrain")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Labelled training export (CSV or Parquet)
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Output path of the ONNX pipeline (scaler + classifier)
    #[arg(long, default_value = DEFAULT_ONNX_OUTPUT)]
    pub onnx_output: PathBuf,

    /// Output path of the native bundle (model, scaler, features)
    #[arg(long, default_value = DEFAULT_BUNDLE_OUTPUT)]
    pub bundle_output: PathBuf,

    /// Directory the scoring service loads models from (printed as a reminder)
    #[arg(long, default_value = DEFAULT_DEPLOY_DIR)]
    pub deploy_dir: String,

    /// Feature columns (comma-separated), in the order the exported graph expects
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "velocity_score,rule_score,ml_score"
    )]
    pub features: Vec<String>,

    /// Binary label column (1 = fraud, 0 = legitimate)
    #[arg(long, default_value = DEFAULT_LABEL_COLUMN)]
    pub label: String,

    /// Seed for the split and every candidate
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Fraction of rows held out for evaluation (0 < x < 1)
    #[arg(long, default_value = "0.2", value_parser = validate_test_fraction)]
    pub test_fraction: f64,

    /// Trees per ensemble (random forest and gradient boosting)
    #[arg(long, default_value = "100", value_parser = clap::value_parser!(u64).range(1..))]
    pub n_estimators: u64,

    /// Candidate models to evaluate (comma-separated).
    /// Options: "logistic", "random-forest", "gradient-boosting"
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "logistic,random-forest,gradient-boosting"
    )]
    pub models: Vec<CandidateKind>,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

impl Cli {
    /// Convert the parsed arguments into a validated training configuration
    pub fn into_config(self) -> Result<TrainingConfig> {
        let config = TrainingConfig {
            input: self.input,
            onnx_output: self.onnx_output,
            bundle_output: self.bundle_output,
            deploy_dir: self.deploy_dir,
            feature_columns: self
                .features
                .into_iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect(),
            label_column: self.label.trim().to_string(),
            seed: self.seed,
            test_fraction: self.test_fraction,
            n_estimators: self.n_estimators as usize,
            candidates: self.models,
            infer_schema_length: self.infer_schema_length,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Validator for test_fraction parameter
fn validate_test_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!(
            "test_fraction must be between 0.0 and 1.0 (exclusive), got {}",
            value
        ))
    }
}
