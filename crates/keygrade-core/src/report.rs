//! Batch report types with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{ExamConfiguration, Subject, VariantLabel};
use crate::results::ScoredResult;
use crate::statistics::BatchStatistics;

/// A complete batch report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Summary of the exam the batch was scored for.
    pub exam: ExamSummary,
    /// Sets for which answer keys were loaded.
    pub sets_loaded: Vec<VariantLabel>,
    /// Scored sheets, ordered by sheet id.
    pub results: Vec<ScoredResult>,
    /// Aggregate statistics over `results`.
    pub statistics: BatchStatistics,
    /// Sheets that could not be scored.
    #[serde(default)]
    pub failures: Vec<SheetFailure>,
    /// Sheets whose recognizer confidence fell below the review threshold.
    #[serde(default)]
    pub low_confidence: Vec<String>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Summary of an exam (without the full configuration).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSummary {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub exam_date: Option<NaiveDate>,
    pub total_questions: usize,
    pub subjects: Vec<Subject>,
}

impl From<&ExamConfiguration> for ExamSummary {
    fn from(exam: &ExamConfiguration) -> Self {
        Self {
            id: exam.id(),
            title: exam.title().to_string(),
            exam_date: exam.exam_date(),
            total_questions: exam.total_questions(),
            subjects: exam.subjects().to_vec(),
        }
    }
}

/// A sheet that was dropped from the batch, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetFailure {
    pub sheet_id: String,
    pub reason: String,
}

impl BatchReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: BatchReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Number of sheets submitted to the batch, scored or not.
    pub fn sheets_submitted(&self) -> usize {
        self.results.len() + self.failures.len()
    }
}
