//! The `keygrade score` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use keygrade_core::answer_key::AnswerKeyStore;
use keygrade_core::engine::{BatchEngine, ProgressReporter};
use keygrade_core::model::VariantLabel;
use keygrade_core::parser::{parse_exam, validate_exam};
use keygrade_core::report::BatchReport;
use keygrade_core::results::ScoredResult;
use keygrade_sources::config::load_config_from;
use keygrade_sources::{load_key_tables, ManifestRecognizer};

use super::summary::print_statistics;

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_sheet_start(&self, sheet_id: &str, variant: VariantLabel) {
        eprintln!("  Scoring: {sheet_id} (set {variant})");
    }

    fn on_sheet_scored(&self, result: &ScoredResult) {
        eprintln!(
            "  Done: {} [set {}] {}/{} ({:.1}%, {})",
            result.sheet_id,
            result.variant,
            result.overall_correct,
            result.total_questions,
            result.overall_percentage,
            result.grade,
        );
    }

    fn on_sheet_error(&self, sheet_id: &str, error: &str) {
        eprintln!("  ERROR: {sheet_id}: {error}");
    }

    fn on_batch_complete(&self, total: usize, scored: usize, failed: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {scored}/{total} scored, {failed} failed ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

pub struct ScoreArgs {
    pub exam: PathBuf,
    pub keys: PathBuf,
    pub answers: PathBuf,
    pub default_set: Option<VariantLabel>,
    pub parallelism: Option<usize>,
    pub confidence_threshold: Option<f64>,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: ScoreArgs) -> Result<()> {
    // Load config, then let flags override it
    let config = load_config_from(args.config.as_deref())?;
    let mut batch_config = config.batch_config();
    if let Some(set) = args.default_set {
        batch_config.default_variant = Some(set);
    }
    if let Some(parallelism) = args.parallelism {
        anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");
        batch_config.parallelism = parallelism;
    }
    if let Some(threshold) = args.confidence_threshold {
        anyhow::ensure!(
            (0.0..=1.0).contains(&threshold),
            "confidence threshold must be between 0.0 and 1.0"
        );
        batch_config.confidence_threshold = threshold;
    }
    let output = args.output.unwrap_or(config.output_dir);

    let exam = parse_exam(&args.exam)?;
    for w in validate_exam(&exam) {
        eprintln!("Warning: {}", w.message);
    }

    let tables = load_key_tables(&args.keys)?;
    let keys = AnswerKeyStore::build(&exam, &tables)
        .with_context(|| format!("invalid answer key {}", args.keys.display()))?;
    for w in keys.warnings() {
        eprintln!("Warning: {}", w.message);
    }
    anyhow::ensure!(
        !keys.is_empty(),
        "no answer set could be detected in {}",
        args.keys.display()
    );

    let recognizer = ManifestRecognizer::from_path(&args.answers)?;
    let sheets = recognizer.assignments().to_vec();

    eprintln!(
        "keygrade v{}: scoring {} sheet(s) for '{}' against set(s) {}",
        env!("CARGO_PKG_VERSION"),
        sheets.len(),
        exam.title(),
        keys.labels()
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    eprintln!();

    let engine = BatchEngine::new(Arc::new(recognizer), batch_config);
    let report = engine
        .run(Arc::new(exam), Arc::new(keys), &sheets, &ConsoleReporter)
        .await?;

    print_results(&report);
    print_statistics(&report);

    std::fs::create_dir_all(&output)?;
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
    let path = output.join(format!("report-{timestamp}.json"));
    report.save_json(&path)?;
    eprintln!("Results saved to: {}", path.display());

    Ok(())
}

fn print_results(report: &BatchReport) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    let mut header = vec!["Sheet".to_string(), "Set".to_string()];
    header.extend(report.exam.subjects.iter().map(|s| s.name.clone()));
    header.extend(["Score %".to_string(), "Grade".to_string(), "Confidence".to_string()]);
    table.set_header(header);

    for result in &report.results {
        let mut row = vec![
            Cell::new(&result.sheet_id),
            Cell::new(result.variant),
        ];
        row.extend(
            result
                .subject_scores
                .iter()
                .map(|s| Cell::new(format!("{}/{}", s.correct, s.total))),
        );
        row.push(Cell::new(format!("{:.1}", result.overall_percentage)));
        row.push(Cell::new(result.grade));
        row.push(Cell::new(
            result
                .confidence
                .map(|c| format!("{c:.2}"))
                .unwrap_or_else(|| "-".to_string()),
        ));
        table.add_row(row);
    }

    println!("{table}");

    for failure in &report.failures {
        println!("Not scored: {} ({})", failure.sheet_id, failure.reason);
    }
    if !report.low_confidence.is_empty() {
        println!("Review (low confidence): {}", report.low_confidence.join(", "));
    }
}
