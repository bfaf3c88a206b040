//! Shared test utilities and fixture generators

#![allow(dead_code)]

use fraudtrain::pipeline::TrainingConfig;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Feature columns of the training export, in graph order
pub const FEATURES: [&str; 3] = ["velocity_score", "rule_score", "ml_score"];

/// Create a synthetic fraud export with `n_legit` legitimate and `n_fraud` fraud rows
///
/// Fraud rows score higher on all three features with overlapping noise, so
/// every candidate separates the classes well but not perfectly. Rows are
/// interleaved so fraud cases are spread through the file.
pub fn create_fraud_dataframe(n_legit: usize, n_fraud: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let total = n_legit + n_fraud;

    let mut velocity = Vec::with_capacity(total);
    let mut rule = Vec::with_capacity(total);
    let mut ml = Vec::with_capacity(total);
    let mut label = Vec::with_capacity(total);

    let fraud_every = if n_fraud == 0 { usize::MAX } else { total / n_fraud };
    let mut fraud_left = n_fraud;
    let mut legit_left = n_legit;

    for i in 0..total {
        let is_fraud = fraud_left > 0 && (legit_left == 0 || i % fraud_every == fraud_every - 1);
        let shift = if is_fraud { 0.35 } else { 0.0 };

        velocity.push((rng.gen::<f64>() * 0.6 + shift).min(1.0));
        rule.push((rng.gen::<f64>() * 0.7 + shift * 0.8).min(1.0));
        ml.push((rng.gen::<f64>() * 0.5 + shift * 1.2).min(1.0));
        label.push(i64::from(is_fraud));

        if is_fraud {
            fraud_left -= 1;
        } else {
            legit_left -= 1;
        }
    }

    df! {
        "transaction_id" => (0..total as i64).collect::<Vec<_>>(),
        "velocity_score" => velocity,
        "rule_score" => rule,
        "ml_score" => ml,
        "is_fraud" => label,
    }
    .unwrap()
}

/// The 1000-row export (950 legitimate, 50 fraud) used by the end-to-end tests
pub fn create_standard_fraud_dataframe() -> DataFrame {
    create_fraud_dataframe(950, 50, 7)
}

/// Create a temporary directory with the DataFrame written as `training_data.csv`
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("training_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with the DataFrame written as `training_data.parquet`
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("training_data.parquet");

    let mut file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Training config reading `input` and writing both artifacts into `out_dir`
///
/// Ensembles are kept small so the end-to-end tests stay quick.
pub fn test_config(input: &Path, out_dir: &Path) -> TrainingConfig {
    TrainingConfig {
        input: input.to_path_buf(),
        onnx_output: out_dir.join("fraud_model.onnx"),
        bundle_output: out_dir.join("fraud_model.pkl"),
        n_estimators: 20,
        ..Default::default()
    }
}

pub fn feature_names() -> Vec<String> {
    FEATURES.iter().map(|s| s.to_string()).collect()
}
