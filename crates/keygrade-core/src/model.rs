//! Core data model types for keygrade.
//!
//! An [`ExamConfiguration`] is validated once from an [`ExamDraft`] and is
//! immutable afterwards; everything downstream shares it behind an `Arc`
//! and records only its id.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GradingError;

/// Identifier of one question-set variant (`A`, `B`, `C`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VariantLabel(char);

impl VariantLabel {
    /// Build a label from an ASCII letter, normalised to upper case.
    pub fn new(c: char) -> Option<Self> {
        c.is_ascii_alphabetic().then(|| VariantLabel(c.to_ascii_uppercase()))
    }

    pub fn as_char(self) -> char {
        self.0
    }
}

impl fmt::Display for VariantLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VariantLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                VariantLabel::new(c).ok_or_else(|| format!("invalid set label: '{trimmed}'"))
            }
            _ => Err(format!("invalid set label: '{trimmed}'")),
        }
    }
}

impl TryFrom<String> for VariantLabel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VariantLabel> for String {
    fn from(label: VariantLabel) -> Self {
        label.0.to_string()
    }
}

/// A set of option letters marked on, or accepted for, one question.
///
/// Letters are stored lower-case. The text form is comma-separated
/// (`"a,b"`); the empty string is the empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionSet(BTreeSet<char>);

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_letters<I: IntoIterator<Item = char>>(letters: I) -> Self {
        OptionSet(letters.into_iter().map(|c| c.to_ascii_lowercase()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, letter: char) -> bool {
        self.0.contains(&letter.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.0.iter().copied()
    }

    /// Letters of this set that are not part of `alphabet`.
    pub fn letters_outside(&self, alphabet: &str) -> Vec<char> {
        self.iter().filter(|c| !alphabet.contains(*c)).collect()
    }
}

impl fmt::Display for OptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letters: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", letters.join(","))
    }
}

impl FromStr for OptionSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut letters = BTreeSet::new();
        for piece in s.split(|c: char| c == ',' || c.is_whitespace()) {
            for c in piece.chars() {
                if !c.is_ascii_alphabetic() {
                    return Err(format!("invalid option letter '{c}' in '{}'", s.trim()));
                }
                letters.insert(c.to_ascii_lowercase());
            }
        }
        Ok(OptionSet(letters))
    }
}

/// One subject and the number of consecutive questions it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub questions: usize,
}

/// Unvalidated exam description, as typed by an administrator or read
/// from an exam TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub exam_date: Option<NaiveDate>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    pub total_questions: usize,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub expected_sets: Vec<VariantLabel>,
    #[serde(default = "default_option_letters")]
    pub option_letters: String,
}

fn default_option_letters() -> String {
    "abcd".to_string()
}

impl Default for ExamDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            exam_date: None,
            duration_minutes: None,
            total_questions: 0,
            subjects: Vec::new(),
            expected_sets: Vec::new(),
            option_letters: default_option_letters(),
        }
    }
}

/// Immutable description of one exam.
#[derive(Debug, Clone, Serialize)]
pub struct ExamConfiguration {
    id: Uuid,
    title: String,
    description: String,
    exam_date: Option<NaiveDate>,
    duration_minutes: Option<u32>,
    total_questions: usize,
    subjects: Vec<Subject>,
    expected_variants: Vec<VariantLabel>,
    option_letters: String,
    created_at: DateTime<Utc>,
}

impl ExamConfiguration {
    /// Validate a draft and freeze it into a configuration with a fresh id.
    pub fn new(draft: ExamDraft) -> Result<Self, GradingError> {
        if draft.title.trim().is_empty() {
            return Err(GradingError::validation("title", "exam title is required"));
        }
        if draft.total_questions == 0 {
            return Err(GradingError::validation(
                "total_questions",
                "an exam needs at least one question",
            ));
        }
        if draft.subjects.is_empty() {
            return Err(GradingError::validation(
                "subjects",
                "at least one subject must be declared",
            ));
        }

        let mut names = HashSet::new();
        for subject in &draft.subjects {
            let name = subject.name.trim();
            if name.is_empty() {
                return Err(GradingError::validation("subjects", "subject name is empty"));
            }
            if !names.insert(name.to_string()) {
                return Err(GradingError::validation(
                    "subjects",
                    format!("duplicate subject '{name}'"),
                ));
            }
        }

        let configured: usize = draft.subjects.iter().map(|s| s.questions).sum();
        if configured != draft.total_questions {
            return Err(GradingError::validation(
                "subjects",
                format!(
                    "subject question counts sum to {configured} but total_questions is {}",
                    draft.total_questions
                ),
            ));
        }

        let option_letters = draft.option_letters.trim().to_ascii_lowercase();
        if option_letters.is_empty() {
            return Err(GradingError::validation(
                "option_letters",
                "the option alphabet is empty",
            ));
        }
        let mut seen = HashSet::new();
        for c in option_letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(GradingError::validation(
                    "option_letters",
                    format!("'{c}' is not a letter"),
                ));
            }
            if !seen.insert(c) {
                return Err(GradingError::validation(
                    "option_letters",
                    format!("letter '{c}' is listed twice"),
                ));
            }
        }

        let mut expected_variants = Vec::new();
        for label in draft.expected_sets {
            if !expected_variants.contains(&label) {
                expected_variants.push(label);
            }
        }

        let subjects = draft
            .subjects
            .into_iter()
            .map(|s| Subject {
                name: s.name.trim().to_string(),
                questions: s.questions,
            })
            .collect();

        Ok(Self {
            id: Uuid::new_v4(),
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            exam_date: draft.exam_date,
            duration_minutes: draft.duration_minutes,
            total_questions: draft.total_questions,
            subjects,
            expected_variants,
            option_letters,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn exam_date(&self) -> Option<NaiveDate> {
        self.exam_date
    }

    pub fn duration_minutes(&self) -> Option<u32> {
        self.duration_minutes
    }

    pub fn total_questions(&self) -> usize {
        self.total_questions
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Sets the institution anticipates. Advisory only.
    pub fn expected_variants(&self) -> &[VariantLabel] {
        &self.expected_variants
    }

    /// The legal option alphabet, lower case.
    pub fn option_letters(&self) -> &str {
        &self.option_letters
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Zero-based question index range of every subject, in declared order.
    pub fn subject_ranges(&self) -> Vec<(&str, Range<usize>)> {
        let mut start = 0;
        self.subjects
            .iter()
            .map(|s| {
                let range = start..start + s.questions;
                start = range.end;
                (s.name.as_str(), range)
            })
            .collect()
    }
}

/// One answer sheet's recognized marks plus the set it must be scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSubmission {
    /// File name or other identifier, unique per batch.
    pub sheet_id: String,
    /// Operator-assigned set; authoritative, never inferred from the image.
    pub assigned_variant: VariantLabel,
    /// Marked letters per question. An empty set is a blank.
    pub recognized_answers: Vec<OptionSet>,
    /// Recognizer confidence in `[0, 1]`, when the recognizer reports one.
    #[serde(default)]
    pub confidence: Option<f64>,
}
