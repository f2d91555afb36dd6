//! Scoring one sheet against its assigned answer-key variant.

use chrono::Utc;
use uuid::Uuid;

use crate::answer_key::KeyVariant;
use crate::error::GradingError;
use crate::model::{ExamConfiguration, OptionSet, SheetSubmission};
use crate::results::{percentage, Grade, ScoredResult, SubjectScore};

/// A question is correct only when the marked letters equal the accepted
/// letters exactly. Subsets, supersets and blanks are all incorrect.
pub fn is_correct(recognized: &OptionSet, accepted: &OptionSet) -> bool {
    !recognized.is_empty() && recognized == accepted
}

/// Score a submission against `key`.
///
/// Both answer sequences must hold exactly `exam.total_questions()` entries.
/// A blank or unmarked sheet is a legitimate zero score, not an error.
pub fn score(
    exam: &ExamConfiguration,
    key: &KeyVariant,
    submission: &SheetSubmission,
) -> Result<ScoredResult, GradingError> {
    let total = exam.total_questions();

    if key.answers.len() != total {
        return Err(GradingError::LengthMismatch {
            context: format!("answer key for set {}", key.label),
            expected: total,
            actual: key.answers.len(),
        });
    }
    if submission.recognized_answers.len() != total {
        return Err(GradingError::LengthMismatch {
            context: format!("sheet '{}'", submission.sheet_id),
            expected: total,
            actual: submission.recognized_answers.len(),
        });
    }
    if key.label != submission.assigned_variant {
        tracing::warn!(
            "sheet '{}' is assigned set {} but scored against set {}",
            submission.sheet_id,
            submission.assigned_variant,
            key.label
        );
    }

    let correct: Vec<bool> = submission
        .recognized_answers
        .iter()
        .zip(&key.answers)
        .map(|(recognized, accepted)| is_correct(recognized, accepted))
        .collect();

    let subject_scores: Vec<SubjectScore> = exam
        .subject_ranges()
        .into_iter()
        .map(|(subject, range)| {
            let questions = range.len();
            let hits = correct[range].iter().filter(|c| **c).count();
            SubjectScore::new(subject, hits, questions)
        })
        .collect();

    let overall_correct: usize = subject_scores.iter().map(|s| s.correct).sum();
    let overall_percentage = percentage(overall_correct, total);
    let grade = Grade::from_percentage(overall_percentage);

    tracing::debug!(
        "scored '{}' (set {}): {overall_correct}/{total} = {overall_percentage:.1}% {grade}",
        submission.sheet_id,
        submission.assigned_variant
    );

    Ok(ScoredResult {
        id: Uuid::new_v4(),
        exam_id: exam.id(),
        sheet_id: submission.sheet_id.clone(),
        variant: submission.assigned_variant,
        subject_scores,
        overall_correct,
        total_questions: total,
        overall_percentage,
        grade,
        confidence: submission.confidence,
        created_at: Utc::now(),
    })
}
