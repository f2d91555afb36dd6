//! Answer-key parsing.
//!
//! A key source is a list of named raw tables. Each table holds one
//! variant's answers as cells like `"12 - b"` or `"16 - a,c"`, with one
//! column per subject in the exam's declared order. Parsing turns the
//! loosely-shaped grid into a strictly-typed [`KeyVariant`] before any
//! scoring happens.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::detect::{detect, SetDetection};
use crate::error::GradingError;
use crate::model::{ExamConfiguration, OptionSet, VariantLabel};

lazy_static::lazy_static! {
    static ref ANSWER_CELL_RE: Regex =
        Regex::new(r"^\s*(\d+)\s*-\s*([A-Za-z](?:\s*,\s*[A-Za-z])*)\s*$").unwrap();
}

/// A named 2-D grid of cell strings, as supplied by a key-source loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub name: String,
    #[serde(default)]
    pub grid: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, grid: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            grid,
        }
    }
}

/// One parsed `"<question> - <letters>"` cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerCell {
    /// 1-based question number.
    pub question: usize,
    pub answer: OptionSet,
}

impl fmt::Display for AnswerCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.question, self.answer)
    }
}

/// Parse a key cell. Returns `None` for anything not in the cell convention.
pub fn parse_answer_cell(cell: &str) -> Option<AnswerCell> {
    let caps = ANSWER_CELL_RE.captures(cell)?;
    let question = caps[1].parse().ok()?;
    let answer = caps[2].parse().ok()?;
    Some(AnswerCell { question, answer })
}

/// The accepted answers of one question-set variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyVariant {
    pub label: VariantLabel,
    /// Name of the raw table this variant was read from.
    pub source_table: String,
    /// Accepted letters per question, indexed by question number - 1.
    pub answers: Vec<OptionSet>,
}

impl KeyVariant {
    /// Accepted letters for a 1-based question number.
    pub fn answer(&self, question: usize) -> Option<&OptionSet> {
        question.checked_sub(1).and_then(|i| self.answers.get(i))
    }
}

/// A non-fatal finding while building a key store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyWarning {
    /// The table concerned, if the warning is about a single table.
    pub table: Option<String>,
    pub message: String,
}

/// All answer-key variants detected in one key source.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerKeyStore {
    exam_id: Uuid,
    variants: BTreeMap<VariantLabel, KeyVariant>,
    detection: SetDetection,
    warnings: Vec<KeyWarning>,
}

impl AnswerKeyStore {
    /// Detect the variants among `tables` and parse each detected table.
    ///
    /// Tables without a detectable set letter are skipped with a warning.
    /// Expected sets that are missing are reported as warnings, never as
    /// errors; only variants actually present become queryable.
    pub fn build(exam: &ExamConfiguration, tables: &[RawTable]) -> Result<Self, GradingError> {
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(GradingError::structure(
                    *name,
                    "table name appears more than once in the key source",
                ));
            }
        }
        let detection = detect(names.as_slice());
        let mut warnings = Vec::new();

        for name in &detection.undetected {
            warnings.push(KeyWarning {
                table: Some(name.clone()),
                message: format!("no set letter (A-D) detected in table '{name}'; table skipped"),
            });
        }

        let mut variants = BTreeMap::new();
        for (label, name) in &detection.mapping {
            let Some(table) = tables.iter().find(|t| &t.name == name) else {
                continue;
            };
            let answers = parse_table(exam, table)?;
            tracing::debug!(
                "parsed set {label} from table '{name}' ({} questions)",
                answers.len()
            );
            variants.insert(
                *label,
                KeyVariant {
                    label: *label,
                    source_table: name.clone(),
                    answers,
                },
            );
        }

        for expected in exam.expected_variants() {
            if !variants.contains_key(expected) {
                tracing::warn!("expected set {expected} not found in key source");
                warnings.push(KeyWarning {
                    table: None,
                    message: format!("expected set {expected} was not found in the key source"),
                });
            }
        }

        Ok(Self {
            exam_id: exam.id(),
            variants,
            detection,
            warnings,
        })
    }

    /// Id of the exam this store was validated against.
    pub fn exam_id(&self) -> Uuid {
        self.exam_id
    }

    pub fn variant(&self, label: VariantLabel) -> Option<&KeyVariant> {
        self.variants.get(&label)
    }

    /// Like [`variant`](Self::variant), but an absent set is an error.
    pub fn require(&self, label: VariantLabel) -> Result<&KeyVariant, GradingError> {
        self.variant(label).ok_or(GradingError::UnknownVariant(label))
    }

    /// Detected labels in ascending order.
    pub fn labels(&self) -> Vec<VariantLabel> {
        self.variants.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn detection(&self) -> &SetDetection {
        &self.detection
    }

    pub fn warnings(&self) -> &[KeyWarning] {
        &self.warnings
    }

    /// Re-serialise a variant into the `"n - letters"` column layout it was
    /// read from: one column per subject, shorter columns padded with "".
    ///
    /// Returns `None` for an absent set or an exam other than the one the
    /// store was built for.
    pub fn to_cells(
        &self,
        exam: &ExamConfiguration,
        label: VariantLabel,
    ) -> Option<Vec<Vec<String>>> {
        if exam.id() != self.exam_id {
            return None;
        }
        let variant = self.variant(label)?;
        let ranges = exam.subject_ranges();
        let height = ranges.iter().map(|(_, r)| r.len()).max().unwrap_or(0);

        let rows = (0..height)
            .map(|row| {
                ranges
                    .iter()
                    .map(|(_, range)| {
                        let index = range.start + row;
                        if index < range.end {
                            AnswerCell {
                                question: index + 1,
                                answer: variant.answers[index].clone(),
                            }
                            .to_string()
                        } else {
                            String::new()
                        }
                    })
                    .collect()
            })
            .collect();
        Some(rows)
    }
}

/// Parse one raw table into per-question accepted answers.
fn parse_table(exam: &ExamConfiguration, table: &RawTable) -> Result<Vec<OptionSet>, GradingError> {
    let name = table.name.as_str();
    let total = exam.total_questions();
    let subjects = exam.subject_ranges();

    let is_blank = |row: &Vec<String>| row.iter().all(|c| c.trim().is_empty());
    let first = table.grid.iter().position(|row| !is_blank(row));
    let last = table.grid.iter().rposition(|row| !is_blank(row));
    let (first, last) = match (first, last) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(GradingError::structure(name, "table contains no answer cells"));
        }
    };

    let mut data_start = first;
    if !table.grid[first].iter().any(|c| parse_answer_cell(c).is_some()) {
        tracing::debug!("treating row {} of table '{name}' as a header", first + 1);
        data_start += 1;
    }

    let width = table.grid[first..=last]
        .iter()
        .map(|row| row.len())
        .max()
        .unwrap_or(0);
    if width < subjects.len() {
        return Err(GradingError::structure(
            name,
            format!(
                "table has {width} column(s) but the exam declares {} subjects",
                subjects.len()
            ),
        ));
    }
    if width > subjects.len() {
        tracing::debug!(
            "ignoring {} extra column(s) in table '{name}'",
            width - subjects.len()
        );
    }

    let mut answers: Vec<Option<OptionSet>> = vec![None; total];

    for (col, (subject, range)) in subjects.iter().enumerate() {
        let mut blank_row: Option<usize> = None;

        for row_index in data_start..=last {
            let row_no = row_index + 1;
            let cell = table.grid[row_index]
                .get(col)
                .map(|c| c.trim())
                .unwrap_or("");

            if cell.is_empty() {
                blank_row.get_or_insert(row_no);
                continue;
            }
            if let Some(blank) = blank_row {
                return Err(GradingError::structure(
                    name,
                    format!("empty answer cell at row {blank}, column {}", col + 1),
                ));
            }

            let parsed = parse_answer_cell(cell).ok_or_else(|| {
                GradingError::structure(
                    name,
                    format!(
                        "unparseable answer cell '{cell}' at row {row_no}, column {}",
                        col + 1
                    ),
                )
            })?;
            let q = parsed.question;

            if q == 0 || q > total {
                return Err(GradingError::structure(
                    name,
                    format!("question {q} at row {row_no} is outside 1..={total}"),
                ));
            }
            if !range.contains(&(q - 1)) {
                let covers = if range.is_empty() {
                    "no questions".to_string()
                } else {
                    format!("questions {}..={}", range.start + 1, range.end)
                };
                return Err(GradingError::structure(
                    name,
                    format!("question {q} is listed under subject '{subject}', which covers {covers}"),
                ));
            }

            let outside = parsed.answer.letters_outside(exam.option_letters());
            if !outside.is_empty() {
                let letters: String = outside.into_iter().collect();
                return Err(GradingError::structure(
                    name,
                    format!(
                        "question {q} uses option(s) '{letters}' outside the alphabet '{}'",
                        exam.option_letters()
                    ),
                ));
            }

            let slot = &mut answers[q - 1];
            if slot.is_some() {
                return Err(GradingError::structure(
                    name,
                    format!("question {q} appears more than once"),
                ));
            }
            *slot = Some(parsed.answer);
        }
    }

    answers
        .into_iter()
        .enumerate()
        .map(|(i, answer)| {
            answer.ok_or_else(|| {
                GradingError::structure(name, format!("question {} has no answer", i + 1))
            })
        })
        .collect()
}
