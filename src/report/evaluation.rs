//! Per-candidate evaluation tables

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::{ClassMetrics, ClassificationReport, ConfusionMatrix, EvaluationResult};

const CLASS_NAMES: [&str; 2] = ["Legitimate (0)", "Fraud (1)"];

fn metric_row(label: &str, m: &ClassMetrics) -> Vec<Cell> {
    vec![
        Cell::new(label),
        Cell::new(format!("{:.4}", m.precision)).set_alignment(CellAlignment::Right),
        Cell::new(format!("{:.4}", m.recall)).set_alignment(CellAlignment::Right),
        Cell::new(format!("{:.4}", m.f1)).set_alignment(CellAlignment::Right),
        Cell::new(m.support).set_alignment(CellAlignment::Right),
    ]
}

/// Precision / recall / F1 / support per class, plus accuracy and averages
pub fn classification_report_table(report: &ClassificationReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Class").add_attribute(Attribute::Bold),
        Cell::new("Precision").add_attribute(Attribute::Bold),
        Cell::new("Recall").add_attribute(Attribute::Bold),
        Cell::new("F1").add_attribute(Attribute::Bold),
        Cell::new("Support").add_attribute(Attribute::Bold),
    ]);

    for (name, metrics) in CLASS_NAMES.iter().zip(&report.per_class) {
        table.add_row(metric_row(name, metrics));
    }
    table.add_row(vec![
        Cell::new("Accuracy"),
        Cell::new(""),
        Cell::new(""),
        Cell::new(format!("{:.4}", report.accuracy))
            .fg(Color::Cyan)
            .set_alignment(CellAlignment::Right),
        Cell::new(report.macro_avg.support).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(metric_row("Macro avg", &report.macro_avg));
    table.add_row(metric_row("Weighted avg", &report.weighted_avg));
    table
}

/// 2x2 matrix with truth as rows and predictions as columns
pub fn confusion_matrix_table(cm: &ConfusionMatrix) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Actual \\ Predicted").add_attribute(Attribute::Bold),
        Cell::new(CLASS_NAMES[0]).add_attribute(Attribute::Bold),
        Cell::new(CLASS_NAMES[1]).add_attribute(Attribute::Bold),
    ]);

    for truth in 0..2u8 {
        let cells = (0..2u8).map(|pred| {
            let color = if truth == pred { Color::Green } else { Color::Red };
            Cell::new(cm.get(truth, pred))
                .fg(color)
                .set_alignment(CellAlignment::Right)
        });
        let mut row = vec![Cell::new(CLASS_NAMES[truth as usize])];
        row.extend(cells);
        table.add_row(row);
    }
    table
}

/// Print one candidate's report, confusion matrix and ROC-AUC
pub fn print_evaluation(result: &EvaluationResult) {
    println!();
    println!(
        "    {} {}",
        style(result.kind.display_name()).white().bold(),
        style(format!("ROC-AUC: {:.4}", result.auc)).yellow()
    );
    for line in classification_report_table(&result.report).to_string().lines() {
        println!("    {}", line);
    }
    for line in confusion_matrix_table(&result.confusion).to_string().lines() {
        println!("    {}", line);
    }
}
