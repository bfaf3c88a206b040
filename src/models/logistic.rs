//! L2-regularized logistic regression on top of `linfa-logistic`

use linfa::prelude::*;
use linfa::Dataset;
use linfa_logistic::LogisticRegression;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::pipeline::TrainingError;

use super::sigmoid;

/// Solver settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticParams {
    /// Inverse regularization strength (larger = weaker penalty)
    pub c: f64,
    pub max_iter: u64,
    /// L-BFGS stops once the gradient norm falls below this
    pub tol: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tol: 1e-4,
        }
    }
}

/// Fitted linear decision function `sigmoid(w·x + b)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    pub fn decision_function(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }

    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        sigmoid(self.decision_function(row))
    }
}

/// Minimize `0.5 * ||w||² + C * Σ logloss` with an unpenalized intercept
///
/// linfa scales the penalty by `alpha`, so `alpha = 1 / C`. The fitted
/// probability is that of the larger label, i.e. class 1.
pub fn fit_logistic(
    x: &[Vec<f64>],
    y: &[u8],
    n_features: usize,
    params: &LogisticParams,
) -> Result<LogisticModel, TrainingError> {
    let records = Array2::from_shape_fn((x.len(), n_features), |(i, j)| x[i][j]);
    let targets: Array1<usize> = y.iter().map(|&v| v as usize).collect();
    let dataset = Dataset::new(records, targets);

    let fitted = LogisticRegression::default()
        .alpha(1.0 / params.c)
        .with_intercept(true)
        .max_iterations(params.max_iter)
        .gradient_tolerance(params.tol)
        .fit(&dataset)
        .map_err(|e| TrainingError::FitFailed {
            model: "Logistic Regression",
            message: e.to_string(),
        })?;

    let coefficients: Vec<f64> = fitted.params().iter().copied().collect();
    let intercept = fitted.intercept();
    if !intercept.is_finite() || coefficients.iter().any(|w| !w.is_finite()) {
        return Err(TrainingError::FitFailed {
            model: "Logistic Regression",
            message: "solver produced non-finite coefficients".to_string(),
        });
    }

    Ok(LogisticModel {
        coefficients,
        intercept,
    })
}
