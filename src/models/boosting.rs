//! Gradient-boosted regression trees on the binary log-loss
//!
//! Each round fits a shallow squared-error tree to the residuals `y - p`, then
//! replaces every leaf with a single Newton step
//! `Σ residual / Σ p(1 - p)` before adding it with the learning rate.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::sigmoid;
use super::tree::{grow_regression_tree, DecisionTree, TreeParams};

/// Denominators below this make the Newton leaf update zero
const MIN_HESSIAN: f64 = 1e-150;

/// Boosting settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Seeds the feature order examined at each split
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

/// Additive model on the log-odds scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingModel {
    pub n_features: usize,
    /// Log-odds of the training prior
    pub init_raw: f64,
    pub learning_rate: f64,
    /// Leaves store unscaled Newton steps
    pub trees: Vec<DecisionTree>,
}

impl GradientBoostingModel {
    pub fn raw_score(&self, row: &[f64]) -> f64 {
        self.init_raw
            + self.learning_rate * self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }

    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        sigmoid(self.raw_score(row))
    }
}

/// Fit the boosted ensemble; labels must hold both classes
pub fn fit_boosting(
    x: &[Vec<f64>],
    y: &[u8],
    n_features: usize,
    params: &BoostingParams,
) -> GradientBoostingModel {
    let n = x.len();
    let labels: Vec<f64> = y.iter().map(|&v| v as f64).collect();

    let prior = labels.iter().sum::<f64>() / n as f64;
    let init_raw = (prior / (1.0 - prior)).ln();

    let tree_params = TreeParams {
        max_depth: params.max_depth,
        min_samples_split: params.min_samples_split,
        min_samples_leaf: params.min_samples_leaf,
    };

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut raw = vec![init_raw; n];
    let mut trees = Vec::with_capacity(params.n_estimators);

    for _round in 0..params.n_estimators {
        let probs: Vec<f64> = raw.iter().map(|&r| sigmoid(r)).collect();
        let residuals: Vec<f64> = labels.iter().zip(&probs).map(|(y, p)| y - p).collect();

        let newton_leaf = |rows: &[usize]| -> f64 {
            let numerator: f64 = rows.iter().map(|&i| residuals[i]).sum();
            let denominator: f64 = rows.iter().map(|&i| probs[i] * (1.0 - probs[i])).sum();
            if denominator.abs() < MIN_HESSIAN {
                0.0
            } else {
                numerator / denominator
            }
        };

        let tree = grow_regression_tree(x, &residuals, &tree_params, &newton_leaf, &mut rng);

        for (r, row) in raw.iter_mut().zip(x) {
            *r += params.learning_rate * tree.predict_row(row);
        }
        trees.push(tree);
    }

    GradientBoostingModel {
        n_features,
        init_raw,
        learning_rate: params.learning_rate,
        trees,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_raw_is_prior_log_odds() {
        let x = vec![vec![0.0]; 4];
        let y = vec![1, 0, 0, 0];
        let params = BoostingParams {
            n_estimators: 0,
            ..Default::default()
        };
        let model = fit_boosting(&x, &y, 1, &params);
        assert!((model.init_raw - (1.0f64 / 3.0).ln()).abs() < 1e-12);
        assert!((model.predict_proba_row(&[0.0]) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_boosting_reduces_training_loss() {
        let x: Vec<Vec<f64>> = (0..50).map(|i| vec![i as f64, (i % 5) as f64]).collect();
        let y: Vec<u8> = (0..50).map(|i| u8::from(i >= 35)).collect();

        let log_loss = |model: &GradientBoostingModel| -> f64 {
            x.iter()
                .zip(&y)
                .map(|(row, &t)| {
                    let p = model.predict_proba_row(row).clamp(1e-15, 1.0 - 1e-15);
                    if t == 1 {
                        -p.ln()
                    } else {
                        -(1.0 - p).ln()
                    }
                })
                .sum::<f64>()
                / x.len() as f64
        };

        let short = fit_boosting(
            &x,
            &y,
            2,
            &BoostingParams {
                n_estimators: 2,
                ..Default::default()
            },
        );
        let long = fit_boosting(&x, &y, 2, &BoostingParams::default());

        assert!(log_loss(&long) < log_loss(&short));
        assert!(long.predict_proba_row(&[45.0, 0.0]) > 0.9);
        assert!(long.predict_proba_row(&[5.0, 0.0]) < 0.1);
    }

    #[test]
    fn test_trees_respect_depth_limit() {
        let x: Vec<Vec<f64>> = (0..64).map(|i| vec![i as f64, (i * 7 % 13) as f64]).collect();
        let y: Vec<u8> = (0..64).map(|i| u8::from(i % 3 == 0)).collect();
        let model = fit_boosting(
            &x,
            &y,
            2,
            &BoostingParams {
                n_estimators: 5,
                ..Default::default()
            },
        );
        assert_eq!(model.trees.len(), 5);
        assert!(model.trees.iter().all(|t| t.depth() <= 3));
    }
}
