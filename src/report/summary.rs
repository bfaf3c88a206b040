//! End-of-run summary table

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::export::ExportSummary;
use crate::models::CandidateKind;
use crate::pipeline::TrainingOutcome;

/// One candidate's line in the summary
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateLine {
    pub kind: CandidateKind,
    pub auc: f64,
    pub selected: bool,
}

/// One artifact's line in the summary
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactLine {
    pub name: String,
    pub path: String,
    pub error: Option<String>,
}

/// Summary of a training run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSummary {
    pub train_size: usize,
    pub test_size: usize,
    pub candidates: Vec<CandidateLine>,
    pub artifacts: Vec<ArtifactLine>,
}

impl TrainingSummary {
    pub fn new(outcome: &TrainingOutcome) -> Self {
        Self {
            train_size: outcome.train_size,
            test_size: outcome.test_size,
            candidates: outcome
                .results
                .iter()
                .map(|r| CandidateLine {
                    kind: r.kind,
                    auc: r.auc,
                    selected: r.kind == outcome.selected,
                })
                .collect(),
            artifacts: Vec::new(),
        }
    }

    pub fn add_exports(&mut self, exports: &ExportSummary) {
        self.artifacts = exports
            .artifacts()
            .iter()
            .map(|a| ArtifactLine {
                name: a.kind.to_string(),
                path: a.path.display().to_string(),
                error: a.error.clone(),
            })
            .collect();
    }

    pub fn selected(&self) -> Option<&CandidateLine> {
        self.candidates.iter().find(|c| c.selected)
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Item").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new("Train / Test rows"),
            Cell::new(format!("{} / {}", self.train_size, self.test_size)),
        ]);

        for candidate in &self.candidates {
            let value = format!("{:.4}", candidate.auc);
            let cell = if candidate.selected {
                Cell::new(format!("{}  ★ selected", value))
                    .fg(Color::Green)
                    .add_attribute(Attribute::Bold)
            } else {
                Cell::new(value)
            };
            table.add_row(vec![
                Cell::new(format!("{} ROC-AUC", candidate.kind.display_name())),
                cell,
            ]);
        }

        for artifact in &self.artifacts {
            let cell = match &artifact.error {
                None => Cell::new(&artifact.path).fg(Color::Green),
                Some(_) => Cell::new(format!("FAILED ({})", artifact.path)).fg(Color::Red),
            };
            table.add_row(vec![Cell::new(&artifact.name), cell]);
        }
        table
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("TRAINING SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        // Indent the table
        for line in self.to_table().to_string().lines() {
            println!("    {}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> TrainingSummary {
        TrainingSummary {
            train_size: 800,
            test_size: 200,
            candidates: vec![
                CandidateLine {
                    kind: CandidateKind::LogisticRegression,
                    auc: 0.91,
                    selected: false,
                },
                CandidateLine {
                    kind: CandidateKind::RandomForest,
                    auc: 0.97,
                    selected: true,
                },
            ],
            artifacts: vec![ArtifactLine {
                name: "native bundle".to_string(),
                path: "fraud_model.pkl".to_string(),
                error: Some("denied".to_string()),
            }],
        }
    }

    #[test]
    fn test_selected_candidate() {
        assert_eq!(
            summary().selected().map(|c| c.kind),
            Some(CandidateKind::RandomForest)
        );
    }

    #[test]
    fn test_table_marks_winner_and_failures() {
        let rendered = summary().to_table().to_string();
        assert!(rendered.contains("800 / 200"));
        assert!(rendered.contains("0.9700  ★ selected"));
        assert!(rendered.contains("FAILED (fraud_model.pkl)"));
    }
}
