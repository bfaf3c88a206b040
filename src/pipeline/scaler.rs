//! Per-feature standardization fitted on the training partition only

use serde::{Deserialize, Serialize};

use super::error::TrainingError;

/// Zero-mean, unit-variance transform with statistics frozen at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Per-feature mean of the fitting rows
    pub mean: Vec<f64>,
    /// Per-feature population standard deviation (1.0 for constant features)
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Compute mean and population standard deviation for each feature
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, TrainingError> {
        let n_features = check_rectangular(rows, None)?;
        let n = rows.len() as f64;

        let mut mean = vec![0.0; n_features];
        for row in rows {
            for (m, &x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut scale = vec![0.0; n_features];
        for row in rows {
            for ((s, &x), &m) in scale.iter_mut().zip(row).zip(&mean) {
                let d = x - m;
                *s += d * d;
            }
        }
        for s in &mut scale {
            *s = (*s / n).sqrt();
            if *s == 0.0 || !s.is_finite() {
                *s = 1.0;
            }
        }

        Ok(Self { mean, scale })
    }

    /// Fit on `rows` and return them transformed
    pub fn fit_transform(rows: &[Vec<f64>]) -> Result<(Self, Vec<Vec<f64>>), TrainingError> {
        let scaler = Self::fit(rows)?;
        let transformed = scaler.transform(rows)?;
        Ok((scaler, transformed))
    }

    /// Apply the fitted statistics without refitting
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, TrainingError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        check_rectangular(rows, Some(self.n_features()))?;
        Ok(rows.iter().map(|row| self.transform_row(row)).collect())
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect()
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }
}

/// Verify every row has the same width (or `expected` when given)
pub(crate) fn check_rectangular(
    rows: &[Vec<f64>],
    expected: Option<usize>,
) -> Result<usize, TrainingError> {
    let first = rows.first().ok_or(TrainingError::EmptyDataset {
        context: "Feature matrix",
    })?;
    let width = expected.unwrap_or(first.len());
    for (row, values) in rows.iter().enumerate() {
        if values.len() != width {
            return Err(TrainingError::RaggedRow {
                row,
                actual: values.len(),
                expected: width,
            });
        }
    }
    Ok(width)
}
