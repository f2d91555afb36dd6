//! The `keygrade summary` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use keygrade_core::report::BatchReport;
use keygrade_core::results::Grade;
use keygrade_core::statistics::HIGH_PERFORMER_THRESHOLD;

pub fn execute(report_path: PathBuf) -> Result<()> {
    let report = BatchReport::load_json(&report_path)?;

    println!(
        "Exam: {}, {} sheet(s) submitted, {} scored",
        report.exam.title,
        report.sheets_submitted(),
        report.results.len()
    );
    print_statistics(&report);

    Ok(())
}

/// Print overall, per-set and per-subject statistics.
pub fn print_statistics(report: &BatchReport) {
    let stats = &report.statistics;

    let mut overall = Table::new();
    overall.set_header(vec!["Sheets", "Mean %", "Min %", "Max %", "High performers"]);
    overall.add_row(vec![
        Cell::new(stats.count),
        Cell::new(format!("{:.1}", stats.mean_percentage)),
        Cell::new(percent_or_dash(stats.min_percentage)),
        Cell::new(percent_or_dash(stats.max_percentage)),
        Cell::new(format!(
            "{} ({:.1}% at >= {HIGH_PERFORMER_THRESHOLD})",
            stats.high_performers,
            stats.high_performer_rate()
        )),
    ]);
    println!("\n{overall}");

    if !stats.per_variant.is_empty() {
        let mut sets = Table::new();
        sets.set_header(vec!["Set", "Sheets", "Mean %", "Min %", "Max %", "High performers"]);
        for (label, set) in &stats.per_variant {
            sets.add_row(vec![
                Cell::new(label),
                Cell::new(set.count),
                Cell::new(format!("{:.1}", set.mean_percentage)),
                Cell::new(format!("{:.1}", set.min_percentage)),
                Cell::new(format!("{:.1}", set.max_percentage)),
                Cell::new(set.high_performers),
            ]);
        }
        println!("\n{sets}");
    }

    if !stats.per_subject.is_empty() {
        let mut subjects = Table::new();
        subjects.set_header(vec!["Subject", "Correct", "Mean %"]);
        for subject in &report.exam.subjects {
            if let Some(s) = stats.per_subject.get(&subject.name) {
                subjects.add_row(vec![
                    Cell::new(&s.subject),
                    Cell::new(format!("{}/{}", s.total_correct, s.total_questions)),
                    Cell::new(format!("{:.1}", s.mean_percentage)),
                ]);
            }
        }
        println!("\n{subjects}");
    }

    if stats.count > 0 {
        let grades: Vec<String> = Grade::ALL
            .iter()
            .rev()
            .filter_map(|g| {
                stats
                    .grade_distribution
                    .get(g)
                    .map(|n| format!("{g}: {n} ({:.1}%)", stats.grade_share(*g)))
            })
            .collect();
        println!("\nGrades: {}", grades.join(", "));
    }
}

fn percent_or_dash(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.1}"))
        .unwrap_or_else(|| "-".to_string())
}
