//! Candidate training, evaluation and selection

use anyhow::{Context, Result};
use serde::Serialize;

use super::config::TrainingConfig;
use super::loader::Dataset;
use super::metrics::{roc_auc, ClassificationReport, ConfusionMatrix};
use super::scaler::StandardScaler;
use super::split::stratified_split;
use crate::models::{CandidateKind, FittedModel, ModelSpec};
use crate::report::print_evaluation;
use crate::utils::progress::{create_spinner, finish_with_error, finish_with_success};

/// Hold-out scores of one fitted candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub kind: CandidateKind,
    /// ROC-AUC of the fraud probabilities on the test partition
    pub auc: f64,
    pub report: ClassificationReport,
    pub confusion: ConfusionMatrix,
}

/// Everything the exporters need from a training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Winning model, fitted on the scaled training partition
    pub model: FittedModel,
    /// Scaler fitted on the training partition only
    pub scaler: StandardScaler,
    pub feature_names: Vec<String>,
    pub selected: CandidateKind,
    /// One entry per candidate, in evaluation order
    pub results: Vec<EvaluationResult>,
    pub train_size: usize,
    pub test_size: usize,
}

impl TrainingOutcome {
    /// Evaluation of the selected candidate
    pub fn selected_result(&self) -> Option<&EvaluationResult> {
        self.results.iter().find(|r| r.kind == self.selected)
    }
}

/// Index of the highest-AUC result; the earliest one wins exact ties
pub fn select_best(results: &[EvaluationResult]) -> Option<usize> {
    results
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (idx, result)| match best {
            Some((_, best_auc)) if result.auc <= best_auc => best,
            _ => Some((idx, result.auc)),
        })
        .map(|(idx, _)| idx)
}

/// Fit one candidate on the training rows and score it on the test rows
pub fn evaluate_candidate(
    spec: &ModelSpec,
    x_train: &[Vec<f64>],
    y_train: &[u8],
    x_test: &[Vec<f64>],
    y_test: &[u8],
) -> Result<(FittedModel, EvaluationResult)> {
    let kind = spec.kind();
    let model = spec
        .fit(x_train, y_train)
        .with_context(|| format!("Failed to fit {}", kind))?;

    let predicted = model.predict(x_test);
    let proba = model.predict_proba(x_test);

    let confusion = ConfusionMatrix::from_predictions(y_test, &predicted);
    let report = ClassificationReport::from_confusion(&confusion);
    let auc = roc_auc(y_test, &proba)
        .with_context(|| format!("Failed to compute ROC-AUC for {}", kind))?;

    Ok((
        model,
        EvaluationResult {
            kind,
            auc,
            report,
            confusion,
        },
    ))
}

/// Split, scale, fit every configured candidate and keep the best by ROC-AUC
///
/// Any split, fit or metric failure aborts the run; there is no fallback
/// candidate.
pub fn train_and_select(dataset: &Dataset, config: &TrainingConfig) -> Result<TrainingOutcome> {
    config.validate()?;

    let split = stratified_split(&dataset.labels, config.test_fraction, config.seed)
        .context("Failed to split dataset into train and test partitions")?;
    let (x_train_raw, y_train) = dataset.select(&split.train);
    let (x_test_raw, y_test) = dataset.select(&split.test);

    let (scaler, x_train) =
        StandardScaler::fit_transform(&x_train_raw).context("Failed to fit feature scaler")?;
    let x_test = scaler
        .transform(&x_test_raw)
        .context("Failed to scale test partition")?;

    let mut fitted = Vec::with_capacity(config.candidates.len());
    let mut results = Vec::with_capacity(config.candidates.len());

    for kind in &config.candidates {
        let spec = kind.build(config.n_estimators, config.seed);
        let spinner = create_spinner(&format!("Training {}...", kind));

        match evaluate_candidate(&spec, &x_train, &y_train, &x_test, &y_test) {
            Ok((model, result)) => {
                finish_with_success(
                    &spinner,
                    &format!("{} trained (ROC-AUC {:.4})", kind, result.auc),
                );
                print_evaluation(&result);
                fitted.push(model);
                results.push(result);
            }
            Err(e) => {
                finish_with_error(&spinner, &format!("{} failed", kind));
                return Err(e);
            }
        }
    }

    let best = select_best(&results).context("No candidate models were evaluated")?;
    let selected = results[best].kind;
    let model = fitted.swap_remove(best);

    Ok(TrainingOutcome {
        model,
        scaler,
        feature_names: dataset.feature_names.clone(),
        selected,
        results,
        train_size: split.train.len(),
        test_size: split.test.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(kind: CandidateKind, auc: f64) -> EvaluationResult {
        let confusion = ConfusionMatrix::default();
        EvaluationResult {
            kind,
            auc,
            report: ClassificationReport::from_confusion(&confusion),
            confusion,
        }
    }

    #[test]
    fn test_select_best_picks_highest_auc() {
        let results = vec![
            result(CandidateKind::LogisticRegression, 0.81),
            result(CandidateKind::RandomForest, 0.93),
            result(CandidateKind::GradientBoosting, 0.88),
        ];
        assert_eq!(select_best(&results), Some(1));
    }

    #[test]
    fn test_select_best_first_seen_wins_ties() {
        let results = vec![
            result(CandidateKind::LogisticRegression, 0.9),
            result(CandidateKind::RandomForest, 0.95),
            result(CandidateKind::GradientBoosting, 0.95),
        ];
        assert_eq!(select_best(&results), Some(1));
    }

    #[test]
    fn test_select_best_empty() {
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn test_evaluate_candidate_scores_hold_out() {
        let x_train: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64 / 10.0 - 2.0]).collect();
        let y_train: Vec<u8> = (0..40).map(|i| u8::from(i >= 30)).collect();
        let x_test = vec![vec![-1.5], vec![-1.0], vec![1.5], vec![1.9]];
        let y_test = vec![0, 0, 1, 1];

        let spec = CandidateKind::LogisticRegression.build(10, 42);
        let (model, eval) =
            evaluate_candidate(&spec, &x_train, &y_train, &x_test, &y_test).unwrap();

        assert_eq!(eval.kind, CandidateKind::LogisticRegression);
        assert!((eval.auc - 1.0).abs() < 1e-12);
        assert_eq!(eval.confusion.total(), 4);
        assert_eq!(model.kind(), CandidateKind::LogisticRegression);
    }
}
