//! Tests for the ONNX and native bundle artifacts of a full training run

use fraudtrain::export::onnx::proto::data_type;
use fraudtrain::export::onnx::{INPUT_NAME, LABEL_OUTPUT, PROBABILITIES_OUTPUT};
use fraudtrain::export::{export_artifacts, load_bundle, load_onnx};
use fraudtrain::models::CandidateKind;
use fraudtrain::pipeline::{dataset_from_frame, train_and_select, TrainingConfig, TrainingOutcome};
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

use common::*;

fn trained(candidates: Vec<CandidateKind>) -> (TempDir, TrainingConfig, TrainingOutcome) {
    let mut df = create_standard_fraud_dataframe();
    let (temp_dir, csv_path) = create_temp_csv(&mut df);
    let mut config = test_config(&csv_path, temp_dir.path());
    config.candidates = candidates;

    let dataset = dataset_from_frame(&df, &feature_names(), "is_fraud").unwrap();
    let outcome = train_and_select(&dataset, &config).unwrap();
    (temp_dir, config, outcome)
}

#[test]
fn test_onnx_declares_batch_by_three_interface() {
    let (_dir, config, outcome) = trained(CandidateKind::ALL.to_vec());
    let exports = export_artifacts(&outcome, &config);
    assert!(exports.all_succeeded(), "{:?}", exports);

    let model = load_onnx(&config.onnx_output).unwrap();
    let graph = model.graph.as_ref().unwrap();

    assert_eq!(graph.input.len(), 1);
    assert_eq!(graph.input[0].name, INPUT_NAME);
    assert_eq!(
        graph.input[0].tensor_shape(),
        Some((data_type::FLOAT, vec![None, Some(3)]))
    );

    let outputs: Vec<&str> = graph.output.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(outputs, vec![LABEL_OUTPUT, PROBABILITIES_OUTPUT]);
    assert_eq!(
        graph.output[0].tensor_shape(),
        Some((data_type::INT64, vec![None]))
    );
    assert_eq!(
        graph.output[1].tensor_shape(),
        Some((data_type::FLOAT, vec![None, Some(2)]))
    );

    assert_eq!(graph.node[0].op_type, "Scaler");
    assert_eq!(
        model.metadata("selected_model"),
        Some(outcome.selected.display_name())
    );
    assert_eq!(
        model.metadata("feature_names"),
        Some("velocity_score,rule_score,ml_score")
    );
    assert!(model.metadata("trained_at").is_some());
}

#[test]
fn test_each_family_exports_its_classifier() {
    let expected = [
        (CandidateKind::LogisticRegression, "LinearClassifier"),
        (CandidateKind::RandomForest, "TreeEnsembleClassifier"),
        (CandidateKind::GradientBoosting, "TreeEnsembleRegressor"),
    ];
    for (kind, op) in expected {
        let (_dir, config, outcome) = trained(vec![kind]);
        let exports = export_artifacts(&outcome, &config);
        assert!(exports.all_succeeded());

        let model = load_onnx(&config.onnx_output).unwrap();
        let graph = model.graph.as_ref().unwrap();
        assert_eq!(graph.node[1].op_type, op, "{}", kind);
        assert_eq!(graph.input[0].tensor_shape().unwrap().1, vec![None, Some(3)]);
    }
}

#[test]
fn test_bundle_keys_and_feature_order() {
    let (_dir, config, outcome) = trained(CandidateKind::ALL.to_vec());
    export_artifacts(&outcome, &config);

    let raw = std::fs::read_to_string(&config.bundle_output).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let mut keys: Vec<&str> = value
        .as_object()
        .unwrap()
        .keys()
        .map(|k| k.as_str())
        .collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["features", "model", "scaler"]);
    assert_eq!(
        value["features"],
        serde_json::json!(["velocity_score", "rule_score", "ml_score"])
    );
}

#[test]
fn test_reloaded_bundle_scores_like_trained_model() {
    let (_dir, config, outcome) = trained(CandidateKind::ALL.to_vec());
    export_artifacts(&outcome, &config);

    let bundle = load_bundle(&config.bundle_output).unwrap();
    let rows = vec![vec![0.9, 0.8, 0.95], vec![0.1, 0.2, 0.05], vec![0.5, 0.5, 0.5]];

    let expected = outcome
        .model
        .predict_proba(&outcome.scaler.transform(&rows).unwrap());
    assert_eq!(bundle.predict_proba(&rows).unwrap(), expected);
    assert_eq!(bundle.model.kind(), outcome.selected);
}

#[test]
fn test_failed_onnx_export_still_writes_bundle() {
    let (dir, mut config, outcome) = trained(vec![CandidateKind::LogisticRegression]);
    config.onnx_output = dir.path().join("missing_dir").join("fraud_model.onnx");

    let exports = export_artifacts(&outcome, &config);

    assert!(!exports.onnx.succeeded());
    assert!(exports.bundle.succeeded());
    assert!(config.bundle_output.exists());
    let err = exports.into_result().unwrap_err().to_string();
    assert!(err.contains("ONNX model"));
}

#[test]
fn test_failed_bundle_export_still_writes_onnx() {
    let (dir, mut config, outcome) = trained(vec![CandidateKind::LogisticRegression]);
    config.bundle_output = dir.path().join("missing_dir").join("fraud_model.pkl");

    let exports = export_artifacts(&outcome, &config);

    assert!(exports.onnx.succeeded());
    assert!(!exports.bundle.succeeded());
    assert!(config.onnx_output.exists());
}
