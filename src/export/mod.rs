//! Export module - writes the ONNX graph and the native bundle
//!
//! The two exports are independent: a failure writing one artifact is recorded
//! and the other is still attempted.

pub mod bundle;
pub mod error;
pub mod onnx;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

pub use bundle::{load_bundle, save_bundle, NativeBundle};
pub use error::ExportError;
pub use onnx::{build_pipeline_graph, export_onnx, load_onnx, ModelMetadata};

use crate::pipeline::{TrainingConfig, TrainingOutcome};
use crate::utils::styling::{print_error, print_info, print_success};

/// Which artifact an outcome refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Onnx,
    Bundle,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Onnx => write!(f, "ONNX model"),
            ArtifactKind::Bundle => write!(f, "native bundle"),
        }
    }
}

/// Result of writing one artifact
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactOutcome {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    /// Error chain when the export failed
    pub error: Option<String>,
}

impl ArtifactOutcome {
    fn from_result(kind: ArtifactKind, path: &Path, result: Result<(), ExportError>) -> Self {
        Self {
            kind,
            path: path.to_path_buf(),
            error: result.err().map(|e| format!("{:#}", anyhow::Error::new(e))),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcomes of both exports
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub onnx: ArtifactOutcome,
    pub bundle: ArtifactOutcome,
}

impl ExportSummary {
    pub fn artifacts(&self) -> [&ArtifactOutcome; 2] {
        [&self.onnx, &self.bundle]
    }

    pub fn all_succeeded(&self) -> bool {
        self.artifacts().iter().all(|a| a.succeeded())
    }

    /// `Err` naming every artifact that could not be written
    pub fn into_result(self) -> Result<()> {
        let failed: Vec<String> = self
            .artifacts()
            .iter()
            .filter(|a| !a.succeeded())
            .map(|a| format!("{} ({})", a.kind, a.path.display()))
            .collect();
        if !failed.is_empty() {
            bail!("Export failed for: {}", failed.join(", "));
        }
        Ok(())
    }
}

/// Write the ONNX graph and the native bundle for a finished training run
pub fn export_artifacts(outcome: &TrainingOutcome, config: &TrainingConfig) -> ExportSummary {
    let auc = outcome.selected_result().map_or(f64::NAN, |r| r.auc);
    let metadata = ModelMetadata::now(outcome.selected, auc);

    let onnx_result = export_onnx(
        &config.onnx_output,
        &outcome.model,
        &outcome.scaler,
        &outcome.feature_names,
        &metadata,
    );
    let onnx = ArtifactOutcome::from_result(ArtifactKind::Onnx, &config.onnx_output, onnx_result);
    report_artifact(&onnx);
    if onnx.succeeded() {
        print_info(&format!("Copy this file to: {}", config.deploy_dir));
    }

    let native = NativeBundle::new(
        outcome.model.clone(),
        outcome.scaler.clone(),
        outcome.feature_names.clone(),
    );
    let bundle_result = save_bundle(&config.bundle_output, &native);
    let bundle =
        ArtifactOutcome::from_result(ArtifactKind::Bundle, &config.bundle_output, bundle_result);
    report_artifact(&bundle);

    ExportSummary { onnx, bundle }
}

fn report_artifact(artifact: &ArtifactOutcome) {
    match &artifact.error {
        None => print_success(&format!(
            "{} exported to: {}",
            artifact.kind,
            artifact.path.display()
        )),
        Some(e) => print_error(&format!("{} export failed: {}", artifact.kind, e)),
    }
}
