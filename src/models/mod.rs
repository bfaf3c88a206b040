//! Candidate classifiers behind a uniform fit / predict surface
//!
//! Three families are evaluated per run: L2 logistic regression, a random
//! forest of gini trees and gradient-boosted regression trees on the log-loss.
//! Every candidate outputs the probability of the positive (fraud) class.

pub mod boosting;
pub mod forest;
pub mod logistic;
pub mod tree;

use serde::{Deserialize, Serialize};

use crate::pipeline::scaler::check_rectangular;
use crate::pipeline::TrainingError;

pub use boosting::{BoostingParams, GradientBoostingModel};
pub use forest::{ForestParams, RandomForestModel};
pub use logistic::{LogisticParams, LogisticModel};
pub use tree::{DecisionTree, TreeNode};

/// Probability cut-off used by `predict`
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Logistic function, stable for large |z|
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Classifier family under evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    LogisticRegression,
    RandomForest,
    GradientBoosting,
}

impl CandidateKind {
    /// Every candidate, in evaluation order
    pub const ALL: [CandidateKind; 3] = [
        CandidateKind::LogisticRegression,
        CandidateKind::RandomForest,
        CandidateKind::GradientBoosting,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            CandidateKind::LogisticRegression => "Logistic Regression",
            CandidateKind::RandomForest => "Random Forest",
            CandidateKind::GradientBoosting => "Gradient Boosting",
        }
    }

    /// Name accepted on the command line
    pub fn cli_name(&self) -> &'static str {
        match self {
            CandidateKind::LogisticRegression => "logistic",
            CandidateKind::RandomForest => "random-forest",
            CandidateKind::GradientBoosting => "gradient-boosting",
        }
    }

    /// Hyperparameters for this family
    ///
    /// `n_estimators` applies to the ensembles; `seed` drives every source of
    /// randomness so repeated runs produce identical models.
    pub fn build(&self, n_estimators: usize, seed: u64) -> ModelSpec {
        match self {
            CandidateKind::LogisticRegression => ModelSpec::Logistic(LogisticParams::default()),
            CandidateKind::RandomForest => ModelSpec::Forest(ForestParams {
                n_estimators,
                seed,
                ..Default::default()
            }),
            CandidateKind::GradientBoosting => ModelSpec::Boosting(BoostingParams {
                n_estimators,
                seed,
                ..Default::default()
            }),
        }
    }
}

impl std::fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for CandidateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "logistic" | "logistic-regression" => Ok(CandidateKind::LogisticRegression),
            "forest" | "random-forest" => Ok(CandidateKind::RandomForest),
            "boosting" | "gradient-boosting" => Ok(CandidateKind::GradientBoosting),
            _ => Err(format!(
                "Unknown model: '{}'. Use 'logistic', 'random-forest' or 'gradient-boosting'.",
                s
            )),
        }
    }
}

/// Unfitted candidate with its hyperparameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelSpec {
    Logistic(LogisticParams),
    Forest(ForestParams),
    Boosting(BoostingParams),
}

impl ModelSpec {
    pub fn kind(&self) -> CandidateKind {
        match self {
            ModelSpec::Logistic(_) => CandidateKind::LogisticRegression,
            ModelSpec::Forest(_) => CandidateKind::RandomForest,
            ModelSpec::Boosting(_) => CandidateKind::GradientBoosting,
        }
    }

    /// Fit on row-major features `x` and 0/1 labels `y`
    ///
    /// # Errors
    /// Empty or ragged input, mismatched lengths, non-binary labels, or labels
    /// holding a single class.
    pub fn fit(&self, x: &[Vec<f64>], y: &[u8]) -> Result<FittedModel, TrainingError> {
        let n_features = validate_training_input(x, y, self.kind().display_name())?;

        let model = match self {
            ModelSpec::Logistic(params) => {
                FittedModel::Logistic(logistic::fit_logistic(x, y, n_features, params)?)
            }
            ModelSpec::Forest(params) => {
                FittedModel::Forest(forest::fit_forest(x, y, n_features, params)?)
            }
            ModelSpec::Boosting(params) => {
                FittedModel::Boosting(boosting::fit_boosting(x, y, n_features, params))
            }
        };
        Ok(model)
    }
}

/// A trained candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FittedModel {
    Logistic(LogisticModel),
    Forest(RandomForestModel),
    Boosting(GradientBoostingModel),
}

impl FittedModel {
    pub fn kind(&self) -> CandidateKind {
        match self {
            FittedModel::Logistic(_) => CandidateKind::LogisticRegression,
            FittedModel::Forest(_) => CandidateKind::RandomForest,
            FittedModel::Boosting(_) => CandidateKind::GradientBoosting,
        }
    }

    /// Number of input features the model was fitted on
    pub fn n_features(&self) -> usize {
        match self {
            FittedModel::Logistic(m) => m.coefficients.len(),
            FittedModel::Forest(m) => m.n_features,
            FittedModel::Boosting(m) => m.n_features,
        }
    }

    /// Check that the model can score `n_features`-wide rows without
    /// indexing out of bounds
    ///
    /// Fitted models always pass; this guards models read back from disk.
    pub fn validate(&self, n_features: usize) -> Result<(), TrainingError> {
        let model = self.kind().display_name();
        if self.n_features() != n_features {
            return Err(TrainingError::InvalidModel {
                model,
                message: format!("expects {} features, not {}", self.n_features(), n_features),
            });
        }

        let trees = match self {
            FittedModel::Logistic(m) => {
                if !m.intercept.is_finite() || m.coefficients.iter().any(|w| !w.is_finite()) {
                    return Err(TrainingError::InvalidModel {
                        model,
                        message: "non-finite coefficients".to_string(),
                    });
                }
                return Ok(());
            }
            FittedModel::Forest(m) => &m.trees,
            FittedModel::Boosting(m) => {
                if !m.init_raw.is_finite() || !m.learning_rate.is_finite() {
                    return Err(TrainingError::InvalidModel {
                        model,
                        message: "non-finite initial score or learning rate".to_string(),
                    });
                }
                &m.trees
            }
        };
        if trees.is_empty() {
            return Err(TrainingError::InvalidModel {
                model,
                message: "no trees".to_string(),
            });
        }
        trees.iter().try_for_each(|t| t.validate(n_features, model))
    }

    /// Fraud probability for one (already scaled) row
    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        match self {
            FittedModel::Logistic(m) => m.predict_proba_row(row),
            FittedModel::Forest(m) => m.predict_proba_row(row),
            FittedModel::Boosting(m) => m.predict_proba_row(row),
        }
    }

    pub fn predict_proba(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_proba_row(row)).collect()
    }

    /// Hard labels: 1 when the fraud probability exceeds 0.5
    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<u8> {
        rows.iter()
            .map(|row| u8::from(self.predict_proba_row(row) > DECISION_THRESHOLD))
            .collect()
    }
}

fn validate_training_input(
    x: &[Vec<f64>],
    y: &[u8],
    model: &'static str,
) -> Result<usize, TrainingError> {
    if x.is_empty() {
        return Err(TrainingError::EmptyDataset { context: model });
    }
    if x.len() != y.len() {
        return Err(TrainingError::LengthMismatch {
            rows: x.len(),
            labels: y.len(),
        });
    }
    let n_features = check_rectangular(x, None)?;
    if n_features == 0 {
        return Err(TrainingError::FitFailed {
            model,
            message: "no feature columns".to_string(),
        });
    }

    let mut seen = [false; 2];
    for (row, &value) in y.iter().enumerate() {
        if value > 1 {
            return Err(TrainingError::NonBinaryLabel { row, value });
        }
        seen[value as usize] = true;
    }
    if !(seen[0] && seen[1]) {
        return Err(TrainingError::SingleClass {
            context: model,
            present: u8::from(seen[1]),
        });
    }

    Ok(n_features)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<u8>) {
        let x: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![i as f64 / 10.0 - 2.0, ((i * 3) % 7) as f64 / 7.0])
            .collect();
        let y: Vec<u8> = (0..40).map(|i| u8::from(i >= 30)).collect();
        (x, y)
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-15);
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert_eq!(sigmoid(1000.0), 1.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_candidate_kind_parsing() {
        assert_eq!(
            "logistic".parse::<CandidateKind>().unwrap(),
            CandidateKind::LogisticRegression
        );
        assert_eq!(
            "Forest".parse::<CandidateKind>().unwrap(),
            CandidateKind::RandomForest
        );
        assert_eq!(
            "gradient-boosting".parse::<CandidateKind>().unwrap(),
            CandidateKind::GradientBoosting
        );
        assert!("svm".parse::<CandidateKind>().is_err());
    }

    #[test]
    fn test_cli_names_round_trip() {
        for kind in CandidateKind::ALL {
            assert_eq!(kind.cli_name().parse::<CandidateKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_build_passes_ensemble_settings() {
        match CandidateKind::RandomForest.build(7, 99) {
            ModelSpec::Forest(p) => {
                assert_eq!(p.n_estimators, 7);
                assert_eq!(p.seed, 99);
            }
            other => panic!("unexpected spec {:?}", other),
        }
        assert_eq!(
            CandidateKind::GradientBoosting.build(7, 99).kind(),
            CandidateKind::GradientBoosting
        );
    }

    #[test]
    fn test_every_candidate_fits_and_predicts() {
        let (x, y) = separable();
        for kind in CandidateKind::ALL {
            let model = kind.build(10, 42).fit(&x, &y).unwrap();
            assert_eq!(model.kind(), kind);
            assert_eq!(model.n_features(), 2);

            let proba = model.predict_proba(&x);
            let labels = model.predict(&x);
            assert_eq!(proba.len(), x.len());
            for (p, l) in proba.iter().zip(&labels) {
                assert!((0.0..=1.0).contains(p));
                assert_eq!(*l, u8::from(*p > 0.5));
            }
        }
    }

    #[test]
    fn test_fit_rejects_single_class() {
        let x = vec![vec![1.0], vec![2.0]];
        let err = CandidateKind::LogisticRegression
            .build(10, 42)
            .fit(&x, &[1, 1])
            .unwrap_err();
        assert_eq!(
            err,
            TrainingError::SingleClass {
                context: "Logistic Regression",
                present: 1
            }
        );
    }

    #[test]
    fn test_fit_rejects_non_binary_and_ragged() {
        let spec = CandidateKind::RandomForest.build(5, 1);
        assert_eq!(
            spec.fit(&[vec![1.0], vec![2.0]], &[0, 2]).unwrap_err(),
            TrainingError::NonBinaryLabel { row: 1, value: 2 }
        );
        assert!(matches!(
            spec.fit(&[vec![1.0, 2.0], vec![2.0]], &[0, 1]),
            Err(TrainingError::RaggedRow { row: 1, .. })
        ));
        assert!(matches!(
            spec.fit(&[], &[]),
            Err(TrainingError::EmptyDataset { .. })
        ));
    }

    #[test]
    fn test_validate_accepts_fitted_models() {
        let (x, y) = separable();
        for kind in CandidateKind::ALL {
            let model = kind.build(5, 42).fit(&x, &y).unwrap();
            model.validate(2).unwrap();
            assert!(matches!(
                model.validate(3),
                Err(TrainingError::InvalidModel { .. })
            ));
        }
    }

    #[test]
    fn test_validate_rejects_empty_ensemble() {
        let model = FittedModel::Forest(RandomForestModel {
            n_features: 2,
            trees: vec![],
        });
        assert_eq!(
            model.validate(2).unwrap_err(),
            TrainingError::InvalidModel {
                model: "Random Forest",
                message: "no trees".to_string()
            }
        );
    }

    #[test]
    fn test_fitted_model_serde_round_trip_scores_identically() {
        let (x, y) = separable();
        let model = CandidateKind::GradientBoosting.build(5, 3).fit(&x, &y).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let restored: FittedModel = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.predict_proba(&x), model.predict_proba(&x));
    }
}
