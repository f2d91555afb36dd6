//! TOML exam file parser.
//!
//! Loads exam configurations from TOML files and checks them for issues
//! that are legal but probably unintended.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::detect::DETECTABLE_SETS;
use crate::model::{ExamConfiguration, ExamDraft};

/// Intermediate TOML structure for parsing exam files.
#[derive(Debug, Deserialize)]
struct TomlExamFile {
    exam: ExamDraft,
}

/// Parse a single TOML file into an `ExamConfiguration`.
pub fn parse_exam(path: &Path) -> Result<ExamConfiguration> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exam file: {}", path.display()))?;

    parse_exam_str(&content, path)
}

/// Parse a TOML string into an `ExamConfiguration` (useful for testing).
pub fn parse_exam_str(content: &str, source_path: &Path) -> Result<ExamConfiguration> {
    let parsed: TomlExamFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let exam = ExamConfiguration::new(parsed.exam)
        .with_context(|| format!("invalid exam in {}", source_path.display()))?;
    Ok(exam)
}

/// A warning from exam validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The field concerned (if applicable).
    pub field: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Check an exam for configurations that parse but are likely mistakes.
pub fn validate_exam(exam: &ExamConfiguration) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if exam.expected_variants().is_empty() {
        warnings.push(ValidationWarning {
            field: Some("expected_sets".into()),
            message: "no expected sets declared; missing answer keys will not be reported".into(),
        });
    }

    // Only A-D can ever be detected from table names
    for label in exam.expected_variants() {
        if !DETECTABLE_SETS.contains(&label.as_char()) {
            warnings.push(ValidationWarning {
                field: Some("expected_sets".into()),
                message: format!("set {label} can never be detected from a table name"),
            });
        }
    }

    for subject in exam.subjects() {
        if subject.questions == 0 {
            warnings.push(ValidationWarning {
                field: Some("subjects".into()),
                message: format!("subject '{}' has no questions", subject.name),
            });
        }
    }

    if exam.option_letters().len() < 2 {
        warnings.push(ValidationWarning {
            field: Some("option_letters".into()),
            message: format!(
                "only one option letter ('{}') per question",
                exam.option_letters()
            ),
        });
    }

    if exam.duration_minutes() == Some(0) {
        warnings.push(ValidationWarning {
            field: Some("duration_minutes".into()),
            message: "duration is zero minutes".into(),
        });
    }

    warnings
}
