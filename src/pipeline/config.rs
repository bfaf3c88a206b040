//! Training run configuration

use std::path::PathBuf;

use anyhow::Result;

use crate::models::CandidateKind;

/// Default input CSV exported by the fraud service
pub const DEFAULT_INPUT: &str = "training_data.csv";

/// Default ONNX output path
pub const DEFAULT_ONNX_OUTPUT: &str = "fraud_model.onnx";

/// Default native bundle output path
pub const DEFAULT_BUNDLE_OUTPUT: &str = "fraud_model.pkl";

/// Resource directory the scoring service loads models from
pub const DEFAULT_DEPLOY_DIR: &str = "fraud-service/src/main/resources/models/";

/// Feature columns, in the order the exported graph expects them
pub const DEFAULT_FEATURE_COLUMNS: [&str; 3] = ["velocity_score", "rule_score", "ml_score"];

/// Binary label column (1 = fraud)
pub const DEFAULT_LABEL_COLUMN: &str = "is_fraud";

/// Seed shared by the split and every candidate
pub const DEFAULT_SEED: u64 = 42;

/// Fraction of rows held out for evaluation
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Trees per ensemble (forest and boosting)
pub const DEFAULT_N_ESTIMATORS: usize = 100;

/// Rows used for CSV schema inference
pub const DEFAULT_INFER_SCHEMA_LENGTH: usize = 10_000;

/// Everything a training run needs, injected rather than hard-coded.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub input: PathBuf,
    pub onnx_output: PathBuf,
    pub bundle_output: PathBuf,
    /// Printed as a reminder of where the ONNX artifact must be copied
    pub deploy_dir: String,
    pub feature_columns: Vec<String>,
    pub label_column: String,
    pub seed: u64,
    pub test_fraction: f64,
    pub n_estimators: usize,
    /// Candidates in evaluation order; ties on AUC go to the earlier entry
    pub candidates: Vec<CandidateKind>,
    pub infer_schema_length: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            onnx_output: PathBuf::from(DEFAULT_ONNX_OUTPUT),
            bundle_output: PathBuf::from(DEFAULT_BUNDLE_OUTPUT),
            deploy_dir: DEFAULT_DEPLOY_DIR.to_string(),
            feature_columns: DEFAULT_FEATURE_COLUMNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            seed: DEFAULT_SEED,
            test_fraction: DEFAULT_TEST_FRACTION,
            n_estimators: DEFAULT_N_ESTIMATORS,
            candidates: CandidateKind::ALL.to_vec(),
            infer_schema_length: DEFAULT_INFER_SCHEMA_LENGTH,
        }
    }
}

impl TrainingConfig {
    /// Check cross-field constraints that clap cannot express
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            anyhow::bail!(
                "Test fraction must be between 0 and 1 (exclusive), got {}",
                self.test_fraction
            );
        }
        if self.feature_columns.is_empty() {
            anyhow::bail!("At least one feature column is required");
        }
        if self.feature_columns.contains(&self.label_column) {
            anyhow::bail!(
                "Label column '{}' cannot also be a feature column",
                self.label_column
            );
        }
        for (i, name) in self.feature_columns.iter().enumerate() {
            if self.feature_columns[..i].contains(name) {
                anyhow::bail!("Feature column '{}' is listed more than once", name);
            }
        }
        if self.candidates.is_empty() {
            anyhow::bail!("At least one candidate model is required");
        }
        if self.n_estimators == 0 {
            anyhow::bail!("Number of estimators must be at least 1");
        }
        Ok(())
    }
}
