//! Scored-sheet result types and the append-only results log.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::VariantLabel;

/// Letter grade, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A+")]
    APlus,
}

/// Inclusive lower bound of each tier above B-, highest tier first.
pub const GRADE_LADDER: [(f64, Grade); 5] = [
    (90.0, Grade::APlus),
    (85.0, Grade::A),
    (80.0, Grade::AMinus),
    (75.0, Grade::BPlus),
    (70.0, Grade::B),
];

impl Grade {
    /// Every grade, lowest first.
    pub const ALL: [Grade; 6] = [
        Grade::BMinus,
        Grade::B,
        Grade::BPlus,
        Grade::AMinus,
        Grade::A,
        Grade::APlus,
    ];

    /// Walk the ladder top-down; anything below the last tier is B-.
    pub fn from_percentage(percentage: f64) -> Grade {
        GRADE_LADDER
            .iter()
            .find(|(min, _)| percentage >= *min)
            .map(|(_, grade)| *grade)
            .unwrap_or(Grade::BMinus)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grade::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown grade: {s}"))
    }
}

/// Correct answers within one subject's question range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectScore {
    pub subject: String,
    pub correct: usize,
    pub total: usize,
    /// `100 * correct / total`, or 0 for a subject with no questions.
    pub percentage: f64,
}

impl SubjectScore {
    pub fn new(subject: impl Into<String>, correct: usize, total: usize) -> Self {
        Self {
            subject: subject.into(),
            correct,
            total,
            percentage: percentage(correct, total),
        }
    }
}

/// Percentage of `correct` out of `total`; 0 when `total` is 0.
pub fn percentage(correct: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (correct * 100) as f64 / total as f64
    }
}

/// The outcome of scoring one sheet. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub sheet_id: String,
    pub variant: VariantLabel,
    /// One entry per subject, in the exam's declared order.
    pub subject_scores: Vec<SubjectScore>,
    pub overall_correct: usize,
    pub total_questions: usize,
    pub overall_percentage: f64,
    pub grade: Grade,
    #[serde(default)]
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl ScoredResult {
    pub fn subject(&self, name: &str) -> Option<&SubjectScore> {
        self.subject_scores.iter().find(|s| s.subject == name)
    }
}

/// Append-only log of scored results for one session or batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultsLog {
    entries: Vec<ScoredResult>,
}

impl ResultsLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result and return a reference to the stored entry.
    pub fn append(&mut self, result: ScoredResult) -> &ScoredResult {
        self.entries.push(result);
        &self.entries[self.entries.len() - 1]
    }

    pub fn as_slice(&self) -> &[ScoredResult] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<ScoredResult> {
        self.entries
    }
}

impl Extend<ScoredResult> for ResultsLog {
    fn extend<T: IntoIterator<Item = ScoredResult>>(&mut self, iter: T) {
        self.entries.extend(iter);
    }
}
