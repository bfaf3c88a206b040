//! Native model bundle: the fitted model, its scaler and the feature order
//!
//! Stored as JSON with exactly three top-level keys (`model`, `scaler`,
//! `features`). Only this crate can rebuild the model from it; the ONNX file is
//! the portable artifact.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ExportError;
use crate::models::FittedModel;
use crate::pipeline::{StandardScaler, TrainingError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NativeBundle {
    pub model: FittedModel,
    pub scaler: StandardScaler,
    pub features: Vec<String>,
}

impl NativeBundle {
    pub fn new(model: FittedModel, scaler: StandardScaler, features: Vec<String>) -> Self {
        Self {
            model,
            scaler,
            features,
        }
    }

    /// Fraud probabilities for raw (unscaled) feature rows
    pub fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, TrainingError> {
        let scaled = self.scaler.transform(rows)?;
        Ok(self.model.predict_proba(&scaled))
    }

    /// Hard labels for raw (unscaled) feature rows
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<u8>, TrainingError> {
        let scaled = self.scaler.transform(rows)?;
        Ok(self.model.predict(&scaled))
    }

    /// Check that scaler, model and feature list agree on the input width and
    /// that every tree only references nodes and features that exist
    pub fn validate(&self) -> Result<(), TrainingError> {
        let n_features = self.features.len();
        let scaler = &self.scaler;
        if scaler.mean.len() != n_features || scaler.scale.len() != n_features {
            return Err(TrainingError::InvalidModel {
                model: "Standard Scaler",
                message: format!(
                    "has {} means and {} scales for {} features",
                    scaler.mean.len(),
                    scaler.scale.len(),
                    n_features
                ),
            });
        }
        if scaler.mean.iter().any(|m| !m.is_finite())
            || scaler.scale.iter().any(|s| !s.is_finite() || *s == 0.0)
        {
            return Err(TrainingError::InvalidModel {
                model: "Standard Scaler",
                message: "statistics must be finite with non-zero scales".to_string(),
            });
        }
        self.model.validate(n_features)
    }
}

/// Serialize `bundle` to `path`
pub fn save_bundle(path: &Path, bundle: &NativeBundle) -> Result<(), ExportError> {
    let json = serde_json::to_vec_pretty(bundle)?;
    fs::write(path, json).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a bundle written by `save_bundle`
///
/// The bundle is validated before it is returned, so an edited file whose
/// trees point past their arena fails here instead of when scoring.
pub fn load_bundle(path: &Path) -> Result<NativeBundle, ExportError> {
    let bytes = fs::read(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bundle: NativeBundle = serde_json::from_slice(&bytes)?;
    bundle.validate()?;
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DecisionTree, LogisticModel, RandomForestModel, TreeNode};
    use tempfile::tempdir;

    fn bundle() -> NativeBundle {
        NativeBundle::new(
            FittedModel::Logistic(LogisticModel {
                coefficients: vec![0.7, -0.3, 1.1],
                intercept: -2.5,
            }),
            StandardScaler {
                mean: vec![0.5, 0.4, 0.3],
                scale: vec![0.1, 0.2, 0.3],
            },
            vec![
                "velocity_score".to_string(),
                "rule_score".to_string(),
                "ml_score".to_string(),
            ],
        )
    }

    #[test]
    fn test_bundle_has_exactly_three_keys() {
        let value = serde_json::to_value(bundle()).unwrap();
        let mut keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(|k| k.as_str())
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["features", "model", "scaler"]);
    }

    #[test]
    fn test_save_and_load_preserve_scoring() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fraud_model.pkl");
        let original = bundle();

        save_bundle(&path, &original).unwrap();
        let loaded = load_bundle(&path).unwrap();

        let rows = vec![vec![0.9, 0.1, 0.8], vec![0.2, 0.6, 0.1]];
        assert_eq!(loaded, original);
        assert_eq!(
            loaded.predict_proba(&rows).unwrap(),
            original.predict_proba(&rows).unwrap()
        );
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let err = bundle().predict(&[vec![1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, TrainingError::RaggedRow { expected: 3, .. }));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = load_bundle(&dir.path().join("absent.pkl")).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }

    fn forest_bundle(left: usize, feature: usize) -> NativeBundle {
        let tree = DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold: 0.0,
                    left,
                    right: 2,
                },
                TreeNode::Leaf { value: 0.1 },
                TreeNode::Leaf { value: 0.9 },
            ],
        };
        NativeBundle::new(
            FittedModel::Forest(RandomForestModel {
                n_features: 3,
                trees: vec![tree],
            }),
            bundle().scaler,
            bundle().features,
        )
    }

    #[test]
    fn test_load_rejects_child_outside_arena() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fraud_model.pkl");
        save_bundle(&path, &forest_bundle(9, 0)).unwrap();

        let err = load_bundle(&path).unwrap_err();
        assert!(matches!(
            err,
            ExportError::InvalidBundle(TrainingError::InvalidModel { model: "Random Forest", .. })
        ));
    }

    #[test]
    fn test_load_rejects_unknown_split_feature() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fraud_model.pkl");
        save_bundle(&path, &forest_bundle(1, 7)).unwrap();

        assert!(matches!(
            load_bundle(&path),
            Err(ExportError::InvalidBundle(_))
        ));
    }

    #[test]
    fn test_load_rejects_short_scaler() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fraud_model.pkl");
        let mut edited = bundle();
        edited.scaler.scale.pop();
        save_bundle(&path, &edited).unwrap();

        let err = load_bundle(&path).unwrap_err();
        assert!(matches!(
            err,
            ExportError::InvalidBundle(TrainingError::InvalidModel { model: "Standard Scaler", .. })
        ));
    }

    #[test]
    fn test_load_rejects_mismatched_coefficients() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fraud_model.pkl");
        let mut edited = bundle();
        edited.features.push("amount".to_string());
        edited.scaler.mean.push(0.0);
        edited.scaler.scale.push(1.0);
        save_bundle(&path, &edited).unwrap();

        assert!(matches!(
            load_bundle(&path),
            Err(ExportError::InvalidBundle(_))
        ));
    }
}
