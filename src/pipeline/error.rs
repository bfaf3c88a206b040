//! Error types for the training pipeline.
//!
//! These cover the statistical degeneracies that make a split, a fit or a
//! metric undefined. They are fatal: the trainer never retries or falls back
//! to another candidate.

use thiserror::Error;

/// Errors raised while splitting, scaling, fitting or scoring.
#[derive(Debug, Error, PartialEq)]
pub enum TrainingError {
    /// No rows were available for the requested operation.
    #[error("{context}: dataset is empty")]
    EmptyDataset {
        /// Operation that received the empty input
        context: &'static str,
    },

    /// Rows do not all have the expected number of features.
    #[error("Row {row} has {actual} features, expected {expected}")]
    RaggedRow {
        /// Zero-based row index
        row: usize,
        /// Number of values found in the row
        actual: usize,
        /// Number of values expected
        expected: usize,
    },

    /// Feature rows and labels have different lengths.
    #[error("Feature rows ({rows}) and labels ({labels}) have different lengths")]
    LengthMismatch {
        /// Number of feature rows
        rows: usize,
        /// Number of labels
        labels: usize,
    },

    /// A label outside {0, 1} was supplied.
    #[error("Label {value} at row {row} is not binary (expected 0 or 1)")]
    NonBinaryLabel {
        /// Zero-based row index
        row: usize,
        /// Offending label value
        value: u8,
    },

    /// Only a single class is present where both are required.
    #[error("{context}: only class {present} is present, both 0 and 1 are required")]
    SingleClass {
        /// Operation that needed both classes
        context: &'static str,
        /// The class that was present
        present: u8,
    },

    /// A class has too few members to be stratified.
    #[error(
        "The least populated class ({class}) has only {count} member(s), at least 2 are required for a stratified split"
    )]
    ClassTooSmall {
        /// Class label
        class: u8,
        /// Number of rows with that label
        count: usize,
    },

    /// Train or test partition would be smaller than the number of classes.
    #[error("{partition} partition would have {size} row(s), fewer than the {classes} classes")]
    PartitionTooSmall {
        /// "train" or "test"
        partition: &'static str,
        /// Resulting partition size
        size: usize,
        /// Number of classes that must be represented
        classes: usize,
    },

    /// Test fraction outside the open interval (0, 1).
    #[error("test fraction must be between 0 and 1 (exclusive), got {0}")]
    InvalidTestFraction(f64),

    /// A fitted model's structure cannot be evaluated safely.
    #[error("{model} is invalid: {message}")]
    InvalidModel {
        /// Display name of the model
        model: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// The numerical solver failed to produce a usable model.
    #[error("{model} fit failed: {message}")]
    FitFailed {
        /// Display name of the model
        model: &'static str,
        /// Detailed error message
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_class_display() {
        let err = TrainingError::SingleClass {
            context: "ROC-AUC",
            present: 0,
        };
        assert_eq!(
            err.to_string(),
            "ROC-AUC: only class 0 is present, both 0 and 1 are required"
        );
    }

    #[test]
    fn test_class_too_small_display() {
        let err = TrainingError::ClassTooSmall { class: 1, count: 1 };
        assert!(err.to_string().contains("only 1 member(s)"));
    }

    #[test]
    fn test_ragged_row_display() {
        let err = TrainingError::RaggedRow {
            row: 4,
            actual: 2,
            expected: 3,
        };
        assert_eq!(err.to_string(), "Row 4 has 2 features, expected 3");
    }
}
