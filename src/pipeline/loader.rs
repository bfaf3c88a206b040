//! Dataset loader for the labelled training export (CSV or Parquet)

use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::Path;

/// Tolerance for floating point comparison when checking binary 0/1 labels
const TOLERANCE: f64 = 1e-9;

/// In-memory training set: one row of feature values plus a 0/1 label per record
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Feature column names, in row order
    pub feature_names: Vec<String>,
    /// Row-major feature matrix
    pub features: Vec<Vec<f64>>,
    /// Binary labels aligned with `features` (1 = fraud)
    pub labels: Vec<u8>,
}

/// Label counts reported after loading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassBalance {
    pub total: usize,
    pub positives: usize,
    pub negatives: usize,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn class_balance(&self) -> ClassBalance {
        let positives = self.labels.iter().filter(|&&y| y == 1).count();
        ClassBalance {
            total: self.labels.len(),
            positives,
            negatives: self.labels.len() - positives,
        }
    }

    /// Copy the rows at `indices` into a new feature matrix and label vector
    pub fn select(&self, indices: &[usize]) -> (Vec<Vec<f64>>, Vec<u8>) {
        let features = indices.iter().map(|&i| self.features[i].clone()).collect();
        let labels = indices.iter().map(|&i| self.labels[i]).collect();
        (features, labels)
    }
}

/// Load a dataset from a file (CSV or Parquet based on extension)
///
/// # Arguments
/// * `path` - Input file path
/// * `infer_schema_length` - Rows used for CSV type inference (0 = full scan)
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(schema_length)
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    let df = lf
        .collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;

    Ok(df)
}

/// Load the training export and extract the feature matrix and label vector
///
/// Fails if the file is missing or malformed, if any required column is absent,
/// or if a required column holds nulls, non-numeric or non-finite values.
/// Labels must be exactly 0 or 1.
pub fn load_training_data(
    path: &Path,
    feature_columns: &[String],
    label_column: &str,
    infer_schema_length: usize,
) -> Result<Dataset> {
    let df = load_dataset(path, infer_schema_length)?;
    dataset_from_frame(&df, feature_columns, label_column)
}

/// Extract a [`Dataset`] from an already collected DataFrame
pub fn dataset_from_frame(
    df: &DataFrame,
    feature_columns: &[String],
    label_column: &str,
) -> Result<Dataset> {
    let available: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    for required in feature_columns.iter().map(String::as_str).chain([label_column]) {
        if !available.iter().any(|c| c == required) {
            anyhow::bail!(
                "Required column '{}' not found in dataset. Available columns: {:?}",
                required,
                available
            );
        }
    }

    let feature_values: Vec<Vec<f64>> = feature_columns
        .iter()
        .map(|name| numeric_column(df, name))
        .collect::<Result<_>>()?;

    let label_values = numeric_column(df, label_column)?;
    let labels = label_values
        .iter()
        .enumerate()
        .map(|(row, &v)| {
            if v.abs() < TOLERANCE {
                Ok(0u8)
            } else if (v - 1.0).abs() < TOLERANCE {
                Ok(1u8)
            } else {
                anyhow::bail!(
                    "Label column '{}' must contain only 0 and 1, found {} at row {}",
                    label_column,
                    v,
                    row
                )
            }
        })
        .collect::<Result<Vec<u8>>>()?;

    let features = (0..df.height())
        .map(|row| feature_values.iter().map(|col| col[row]).collect())
        .collect();

    Ok(Dataset {
        feature_names: feature_columns.to_vec(),
        features,
        labels,
    })
}

/// Read a column as finite f64 values, rejecting nulls and unparsable entries
fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .with_context(|| format!("Required column '{}' not found", name))?;

    let original_nulls = column.null_count();
    if original_nulls > 0 {
        anyhow::bail!(
            "Column '{}' contains {} missing value(s)",
            name,
            original_nulls
        );
    }

    let float_col = column
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' must be numeric", name))?;

    if float_col.null_count() > original_nulls {
        anyhow::bail!("Column '{}' contains non-numeric values", name);
    }

    let ca = float_col
        .f64()
        .with_context(|| format!("Failed to access column '{}' as Float64", name))?;

    let mut values = Vec::with_capacity(ca.len());
    for (row, opt_val) in ca.iter().enumerate() {
        match opt_val {
            Some(v) if v.is_finite() => values.push(v),
            Some(v) => anyhow::bail!(
                "Column '{}' contains non-finite value {} at row {}",
                name,
                v,
                row
            ),
            None => anyhow::bail!("Column '{}' contains a missing value at row {}", name, row),
        }
    }

    Ok(values)
}
