//! Error types for artifact export.

use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::TrainingError;

/// Errors raised while converting or writing a trained model.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A component disagrees with the feature list on the input width.
    #[error("{component} expects {actual} features but the feature list has {expected}")]
    FeatureMismatch {
        /// Component with the wrong width ("scaler", "model", ...)
        component: &'static str,
        actual: usize,
        expected: usize,
    },

    /// A parameter cannot be represented in the exported graph.
    #[error("{component} has a non-finite {parameter}")]
    NonFinite {
        component: &'static str,
        parameter: &'static str,
    },

    /// A tree ensemble without trees.
    #[error("{model} has no trees to export")]
    EmptyEnsemble { model: &'static str },

    /// Reading or writing an artifact failed.
    #[error("cannot access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The ONNX bytes could not be decoded.
    #[error("invalid ONNX model")]
    Decode(#[from] prost::DecodeError),

    /// The native bundle could not be (de)serialized.
    #[error("invalid model bundle")]
    Bundle(#[from] serde_json::Error),

    /// The native bundle decoded but its contents cannot be scored.
    #[error("inconsistent model bundle")]
    InvalidBundle(#[from] TrainingError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_mismatch_display() {
        let err = ExportError::FeatureMismatch {
            component: "scaler",
            actual: 2,
            expected: 3,
        };
        assert_eq!(
            err.to_string(),
            "scaler expects 2 features but the feature list has 3"
        );
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err = ExportError::Io {
            path: PathBuf::from("out/model.onnx"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.to_string(), "cannot access out/model.onnx");
        assert!(std::error::Error::source(&err).is_some());
    }
}
