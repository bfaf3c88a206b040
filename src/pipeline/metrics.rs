//! Evaluation metrics for binary classifiers

use serde::Serialize;

use super::error::TrainingError;

/// Area under the ROC curve via the Mann-Whitney U statistic
///
/// Only exactly equal scores are tied; they share their average rank, so a
/// constant scorer yields 0.5.
///
/// # Errors
/// Length mismatch, empty input, or a label vector holding a single class
/// (the ROC curve is undefined without both classes).
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Result<f64, TrainingError> {
    if labels.len() != scores.len() {
        return Err(TrainingError::LengthMismatch {
            rows: scores.len(),
            labels: labels.len(),
        });
    }
    if labels.is_empty() {
        return Err(TrainingError::EmptyDataset { context: "ROC-AUC" });
    }

    let positives = labels.iter().filter(|&&y| y == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(TrainingError::SingleClass {
            context: "ROC-AUC",
            present: if positives == 0 { 0 } else { 1 },
        });
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let n = order.len();
    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < n {
        let current = scores[order[i]];
        let mut j = i;
        while j < n && scores[order[j]] == current {
            j += 1;
        }

        // Ranks i+1..=j share their mean
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        let pos_in_group = order[i..j].iter().filter(|&&k| labels[k] == 1).count();
        rank_sum_pos += avg_rank * pos_in_group as f64;

        i = j;
    }

    let p = positives as f64;
    let u = rank_sum_pos - p * (p + 1.0) / 2.0;
    Ok((u / (p * negatives as f64)).clamp(0.0, 1.0))
}

/// 2x2 confusion matrix indexed `[truth][predicted]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    pub fn from_predictions(truth: &[u8], predicted: &[u8]) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in truth.iter().zip(predicted) {
            if t < 2 && p < 2 {
                cm.counts[t as usize][p as usize] += 1;
            }
        }
        cm
    }

    pub fn get(&self, truth: u8, predicted: u8) -> usize {
        self.counts[truth as usize][predicted as usize]
    }

    pub fn true_positives(&self) -> usize {
        self.get(1, 1)
    }

    pub fn false_positives(&self) -> usize {
        self.get(0, 1)
    }

    pub fn false_negatives(&self) -> usize {
        self.get(1, 0)
    }

    pub fn true_negatives(&self) -> usize {
        self.get(0, 0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

/// Precision, recall and F1 for one class (or one average)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class report in the familiar precision/recall/F1/support layout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    /// Index 0 = legitimate, 1 = fraud
    pub per_class: [ClassMetrics; 2],
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let per_class = [class_metrics(cm, 0), class_metrics(cm, 1)];
        let total = cm.total();

        let accuracy = ratio(cm.true_positives() + cm.true_negatives(), total);

        let macro_avg = ClassMetrics {
            precision: per_class.iter().map(|m| m.precision).sum::<f64>() / 2.0,
            recall: per_class.iter().map(|m| m.recall).sum::<f64>() / 2.0,
            f1: per_class.iter().map(|m| m.f1).sum::<f64>() / 2.0,
            support: total,
        };

        let weighted = |f: fn(&ClassMetrics) -> f64| -> f64 {
            if total == 0 {
                return 0.0;
            }
            per_class
                .iter()
                .map(|m| f(m) * m.support as f64)
                .sum::<f64>()
                / total as f64
        };
        let weighted_avg = ClassMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            support: total,
        };

        Self {
            per_class,
            accuracy,
            macro_avg,
            weighted_avg,
        }
    }
}

fn class_metrics(cm: &ConfusionMatrix, class: u8) -> ClassMetrics {
    let other = 1 - class;
    let tp = cm.get(class, class);
    let fp = cm.get(other, class);
    let fn_ = cm.get(class, other);

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };

    ClassMetrics {
        precision,
        recall,
        f1,
        support: tp + fn_,
    }
}

/// Zero-division yields 0.0
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
