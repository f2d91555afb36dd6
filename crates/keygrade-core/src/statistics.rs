//! Batch aggregation: cohort-wide and set-wise statistics.
//!
//! [`aggregate`] is a pure function of its input. Floating-point sums are
//! taken over sorted values, so any permutation of the same results
//! produces bit-identical statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::VariantLabel;
use crate::results::{Grade, ScoredResult};

/// Sheets at or above this overall percentage count as high performers.
pub const HIGH_PERFORMER_THRESHOLD: f64 = 80.0;

/// Statistics for a whole batch of scored sheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    /// Number of scored sheets.
    pub count: usize,
    /// Mean overall percentage (0 for an empty batch).
    pub mean_percentage: f64,
    pub min_percentage: Option<f64>,
    pub max_percentage: Option<f64>,
    /// Mean recognizer confidence over the sheets that reported one.
    pub mean_confidence: Option<f64>,
    /// Sheets at or above [`HIGH_PERFORMER_THRESHOLD`].
    pub high_performers: usize,
    /// Sheets per grade; grades nobody received are absent.
    pub grade_distribution: BTreeMap<Grade, usize>,
    /// Per-set breakdown; sets without sheets are absent.
    pub per_variant: BTreeMap<VariantLabel, VariantStatistics>,
    /// Cohort performance per subject.
    pub per_subject: BTreeMap<String, SubjectStatistics>,
}

/// Statistics for the sheets scored against one set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantStatistics {
    pub variant: VariantLabel,
    pub count: usize,
    pub mean_percentage: f64,
    pub min_percentage: f64,
    pub max_percentage: f64,
    pub mean_confidence: Option<f64>,
    pub high_performers: usize,
    pub grade_distribution: BTreeMap<Grade, usize>,
}

/// Cohort totals for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectStatistics {
    pub subject: String,
    pub total_correct: usize,
    pub total_questions: usize,
    /// Mean of the per-sheet subject percentages.
    pub mean_percentage: f64,
}

impl BatchStatistics {
    /// Share of sheets with `grade`, in percent.
    pub fn grade_share(&self, grade: Grade) -> f64 {
        share(self.grade_distribution.get(&grade).copied().unwrap_or(0), self.count)
    }

    /// Share of high performers, in percent.
    pub fn high_performer_rate(&self) -> f64 {
        share(self.high_performers, self.count)
    }
}

impl VariantStatistics {
    pub fn grade_share(&self, grade: Grade) -> f64 {
        share(self.grade_distribution.get(&grade).copied().unwrap_or(0), self.count)
    }
}

fn share(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Order-independent mean: values are sorted before summing.
fn stable_mean(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn grade_histogram<'a>(results: impl Iterator<Item = &'a ScoredResult>) -> BTreeMap<Grade, usize> {
    let mut histogram = BTreeMap::new();
    for r in results {
        *histogram.entry(r.grade).or_insert(0) += 1;
    }
    histogram
}

fn is_high_performer(result: &ScoredResult) -> bool {
    result.overall_percentage >= HIGH_PERFORMER_THRESHOLD
}

/// Compute batch statistics from a sequence of scored results.
///
/// An empty input yields zero counts, a 0.0 mean and no breakdowns.
pub fn aggregate(results: &[ScoredResult]) -> BatchStatistics {
    let percentages: Vec<f64> = results.iter().map(|r| r.overall_percentage).collect();
    let confidences: Vec<f64> = results.iter().filter_map(|r| r.confidence).collect();

    let mut by_variant: BTreeMap<VariantLabel, Vec<&ScoredResult>> = BTreeMap::new();
    for r in results {
        by_variant.entry(r.variant).or_default().push(r);
    }

    let per_variant = by_variant
        .into_iter()
        .map(|(variant, group)| {
            let scores: Vec<f64> = group.iter().map(|r| r.overall_percentage).collect();
            let stats = VariantStatistics {
                variant,
                count: group.len(),
                min_percentage: scores.iter().copied().fold(f64::INFINITY, f64::min),
                max_percentage: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                mean_percentage: stable_mean(scores).unwrap_or(0.0),
                mean_confidence: stable_mean(group.iter().filter_map(|r| r.confidence).collect()),
                high_performers: group.iter().filter(|r| is_high_performer(r)).count(),
                grade_distribution: grade_histogram(group.iter().copied()),
            };
            (variant, stats)
        })
        .collect();

    let mut by_subject: BTreeMap<String, (usize, usize, Vec<f64>)> = BTreeMap::new();
    for r in results {
        for s in &r.subject_scores {
            let entry = by_subject.entry(s.subject.clone()).or_default();
            entry.0 += s.correct;
            entry.1 += s.total;
            entry.2.push(s.percentage);
        }
    }
    let per_subject = by_subject
        .into_iter()
        .map(|(subject, (total_correct, total_questions, percentages))| {
            let stats = SubjectStatistics {
                subject: subject.clone(),
                total_correct,
                total_questions,
                mean_percentage: stable_mean(percentages).unwrap_or(0.0),
            };
            (subject, stats)
        })
        .collect();

    BatchStatistics {
        count: results.len(),
        min_percentage: percentages.iter().copied().reduce(f64::min),
        max_percentage: percentages.iter().copied().reduce(f64::max),
        mean_percentage: stable_mean(percentages).unwrap_or(0.0),
        mean_confidence: stable_mean(confidences),
        high_performers: results.iter().filter(|r| is_high_performer(r)).count(),
        grade_distribution: grade_histogram(results.iter()),
        per_variant,
        per_subject,
    }
}
