//! The `keygrade validate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use keygrade_core::answer_key::AnswerKeyStore;
use keygrade_core::parser::{parse_exam, validate_exam};
use keygrade_sources::load_key_tables;

pub fn execute(exam_path: PathBuf, keys_path: Option<PathBuf>) -> Result<()> {
    let exam = parse_exam(&exam_path)?;
    println!(
        "Exam: {} ({} questions, {} subjects)",
        exam.title(),
        exam.total_questions(),
        exam.subjects().len()
    );
    for (name, range) in exam.subject_ranges() {
        println!("  {name}: questions {}-{}", range.start + 1, range.end);
    }

    let mut total_warnings = 0;
    for w in validate_exam(&exam) {
        let prefix = w
            .field
            .as_ref()
            .map(|f| format!("  [{f}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
        total_warnings += 1;
    }

    if let Some(keys_path) = keys_path {
        let tables = load_key_tables(&keys_path)?;
        let store = AnswerKeyStore::build(&exam, &tables)
            .with_context(|| format!("invalid answer key {}", keys_path.display()))?;

        println!("\nAnswer key: {} ({} table(s))", keys_path.display(), tables.len());
        for (label, table) in &store.detection().mapping {
            let questions = store.variant(*label).map(|v| v.answers.len()).unwrap_or(0);
            println!("  Set {label} <- '{table}' ({questions} answers)");
        }
        for w in store.warnings() {
            let prefix = w
                .table
                .as_ref()
                .map(|t| format!("  [{t}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += store.warnings().len();
    }

    if total_warnings == 0 {
        println!("All checks passed.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
