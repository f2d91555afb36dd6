//! Batch orchestration.
//!
//! Resolves each sheet's answer set, asks the recognizer for its marks with
//! bounded parallelism, scores every sheet and assembles a [`BatchReport`].
//! Scoring is a pure per-sheet call, so sheets complete in any order; the
//! report re-sorts them by sheet id.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::answer_key::AnswerKeyStore;
use crate::model::{ExamConfiguration, SheetSubmission, VariantLabel};
use crate::report::{BatchReport, ExamSummary, SheetFailure};
use crate::results::{ResultsLog, ScoredResult};
use crate::scoring::score;
use crate::statistics::aggregate;
use crate::traits::{RecognizeRequest, Recognizer};

/// Configuration for the batch engine.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum sheets recognized concurrently.
    pub parallelism: usize,
    /// Set applied to sheets the operator did not assign individually.
    pub default_variant: Option<VariantLabel>,
    /// Sheets whose confidence is below this are flagged for review.
    pub confidence_threshold: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            default_variant: None,
            confidence_threshold: 0.8,
        }
    }
}

/// One sheet to process and the set the operator picked for it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetAssignment {
    pub sheet_id: String,
    pub variant: Option<VariantLabel>,
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_sheet_start(&self, sheet_id: &str, variant: VariantLabel);
    fn on_sheet_scored(&self, result: &ScoredResult);
    fn on_sheet_error(&self, sheet_id: &str, error: &str);
    fn on_batch_complete(&self, total: usize, scored: usize, failed: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_sheet_start(&self, _: &str, _: VariantLabel) {}
    fn on_sheet_scored(&self, _: &ScoredResult) {}
    fn on_sheet_error(&self, _: &str, _: &str) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: usize, _: Duration) {}
}

/// The batch scoring engine.
pub struct BatchEngine {
    recognizer: Arc<dyn Recognizer>,
    config: BatchConfig,
}

impl BatchEngine {
    pub fn new(recognizer: Arc<dyn Recognizer>, config: BatchConfig) -> Self {
        Self { recognizer, config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// The operator's choice wins; otherwise the batch default applies.
    pub fn resolve_variant(&self, sheet: &SheetAssignment) -> Option<VariantLabel> {
        sheet.variant.or(self.config.default_variant)
    }

    /// Recognize and score every sheet.
    ///
    /// Per-sheet problems (no set assigned, no key for the set, recognizer
    /// failure, wrong answer count) are recorded as failures in the report
    /// and never abort the batch.
    pub async fn run(
        &self,
        exam: Arc<ExamConfiguration>,
        keys: Arc<AnswerKeyStore>,
        sheets: &[SheetAssignment],
        progress: &dyn ProgressReporter,
    ) -> Result<BatchReport> {
        anyhow::ensure!(self.config.parallelism >= 1, "parallelism must be at least 1");
        anyhow::ensure!(
            keys.exam_id() == exam.id(),
            "answer keys were built for a different exam"
        );

        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism));
        let mut failures = Vec::new();
        let mut seen = HashSet::new();
        let mut futures = FuturesUnordered::new();

        for sheet in sheets {
            if !seen.insert(sheet.sheet_id.as_str()) {
                failures.push(fail(progress, &sheet.sheet_id, "duplicate sheet id in batch"));
                continue;
            }
            let Some(variant) = self.resolve_variant(sheet) else {
                failures.push(fail(progress, &sheet.sheet_id, "no answer set assigned"));
                continue;
            };
            if let Err(e) = keys.require(variant) {
                failures.push(fail(progress, &sheet.sheet_id, &e.to_string()));
                continue;
            }

            progress.on_sheet_start(&sheet.sheet_id, variant);

            let recognizer = Arc::clone(&self.recognizer);
            let semaphore = Arc::clone(&semaphore);
            let exam = Arc::clone(&exam);
            let keys = Arc::clone(&keys);
            let sheet_id = sheet.sheet_id.clone();

            futures.push(async move {
                let ctx_sheet_id = sheet_id.clone();
                let inner = async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| anyhow::anyhow!("semaphore closed"))?;

                    let recognition = recognizer
                        .recognize(&RecognizeRequest {
                            sheet_id: sheet_id.clone(),
                            total_questions: exam.total_questions(),
                            option_letters: exam.option_letters().to_string(),
                        })
                        .await?;

                    let submission = SheetSubmission {
                        sheet_id,
                        assigned_variant: variant,
                        recognized_answers: recognition.answers,
                        confidence: recognition.confidence,
                    };
                    let key = keys.require(variant)?;
                    let result = score(&exam, key, &submission)?;
                    Ok::<_, anyhow::Error>(result)
                };
                (ctx_sheet_id, inner.await)
            });
        }

        let total = sheets.len();
        let mut log = ResultsLog::new();
        let mut low_confidence = Vec::new();

        while let Some((sheet_id, outcome)) = futures.next().await {
            match outcome {
                Ok(result) => {
                    if result
                        .confidence
                        .is_some_and(|c| c < self.config.confidence_threshold)
                    {
                        tracing::warn!(
                            "sheet '{sheet_id}' recognized with low confidence {:.2}",
                            result.confidence.unwrap_or_default()
                        );
                        low_confidence.push(sheet_id.clone());
                    }
                    progress.on_sheet_scored(&result);
                    log.append(result);
                }
                Err(e) => {
                    tracing::error!("scoring failed for {sheet_id}: {e:#}");
                    failures.push(fail(progress, &sheet_id, &format!("{e:#}")));
                }
            }
        }

        let elapsed = start.elapsed();
        progress.on_batch_complete(total, log.len(), failures.len(), elapsed);

        let mut results = log.into_vec();
        results.sort_by(|a, b| a.sheet_id.cmp(&b.sheet_id));
        failures.sort_by(|a, b| a.sheet_id.cmp(&b.sheet_id));
        low_confidence.sort();

        let statistics = aggregate(&results);

        Ok(BatchReport {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            exam: ExamSummary::from(exam.as_ref()),
            sets_loaded: keys.labels(),
            results,
            statistics,
            failures,
            low_confidence,
            duration_ms: elapsed.as_millis() as u64,
        })
    }
}

fn fail(progress: &dyn ProgressReporter, sheet_id: &str, reason: &str) -> SheetFailure {
    progress.on_sheet_error(sheet_id, reason);
    SheetFailure {
        sheet_id: sheet_id.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::answer_key::RawTable;
    use crate::model::{ExamDraft, OptionSet, Subject};
    use crate::traits::Recognition;

    struct FixedRecognizer(HashMap<String, (Vec<&'static str>, Option<f64>)>);

    #[async_trait]
    impl Recognizer for FixedRecognizer {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn recognize(&self, request: &RecognizeRequest) -> anyhow::Result<Recognition> {
            let (answers, confidence) = self
                .0
                .get(&request.sheet_id)
                .ok_or_else(|| anyhow::anyhow!("sheet not scanned: {}", request.sheet_id))?;
            Ok(Recognition {
                answers: answers
                    .iter()
                    .map(|a| a.parse::<OptionSet>().map_err(anyhow::Error::msg))
                    .collect::<Result<_>>()?,
                confidence: *confidence,
            })
        }
    }

    fn setup() -> (Arc<ExamConfiguration>, Arc<AnswerKeyStore>) {
        let exam = ExamConfiguration::new(ExamDraft {
            title: "Engine".into(),
            total_questions: 2,
            subjects: vec![Subject {
                name: "S1".into(),
                questions: 2,
            }],
            ..Default::default()
        })
        .unwrap();
        let tables = vec![
            RawTable::new("Set - A", vec![vec!["1 - a".into()], vec!["2 - b".into()]]),
            RawTable::new("Set - B", vec![vec!["1 - c".into()], vec!["2 - d".into()]]),
        ];
        let keys = AnswerKeyStore::build(&exam, &tables).unwrap();
        (Arc::new(exam), Arc::new(keys))
    }

    fn sheet(id: &str, set: Option<char>) -> SheetAssignment {
        SheetAssignment {
            sheet_id: id.into(),
            variant: set.and_then(VariantLabel::new),
        }
    }

    #[tokio::test]
    async fn batch_scores_and_collects_failures() {
        let (exam, keys) = setup();
        let recognizer = FixedRecognizer(HashMap::from([
            ("s1".to_string(), (vec!["a", "b"], Some(0.95))),
            ("s2".to_string(), (vec!["c", ""], Some(0.60))),
            ("s3".to_string(), (vec!["a"], None)),
        ]));
        let engine = BatchEngine::new(
            Arc::new(recognizer),
            BatchConfig {
                parallelism: 2,
                default_variant: VariantLabel::new('A'),
                ..Default::default()
            },
        );
        let sheets = vec![
            sheet("s2", Some('B')),
            sheet("s1", None),
            sheet("s3", None),
            sheet("s4", Some('D')),
            sheet("s5", None),
            sheet("s1", Some('B')),
        ];

        let report = engine.run(exam, keys, &sheets, &NoopReporter).await.unwrap();

        let ids: Vec<&str> = report.results.iter().map(|r| r.sheet_id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
        assert_eq!(report.results[0].overall_percentage, 100.0);
        assert_eq!(report.results[1].variant, VariantLabel::new('B').unwrap());
        assert_eq!(report.results[1].overall_correct, 1);
        assert_eq!(report.low_confidence, vec!["s2".to_string()]);

        let failed: Vec<&str> = report.failures.iter().map(|f| f.sheet_id.as_str()).collect();
        assert_eq!(failed, vec!["s1", "s3", "s4", "s5"]);
        assert!(report.failures[0].reason.contains("duplicate"));
        assert!(report.failures[1].reason.contains("length mismatch"));
        assert!(report.failures[2].reason.contains("set D"));
        assert!(report.failures[3].reason.contains("not scanned"));
        assert_eq!(report.statistics.count, 2);
        assert_eq!(report.sheets_submitted(), 6);
    }

    #[tokio::test]
    async fn unassigned_sheet_without_default_fails() {
        let (exam, keys) = setup();
        let engine = BatchEngine::new(
            Arc::new(FixedRecognizer(HashMap::new())),
            BatchConfig::default(),
        );
        let report = engine
            .run(exam, keys, &[sheet("lonely", None)], &NoopReporter)
            .await
            .unwrap();
        assert!(report.results.is_empty());
        assert_eq!(report.failures[0].reason, "no answer set assigned");
        assert_eq!(report.statistics.count, 0);
        assert_eq!(engine.config().confidence_threshold, 0.8);
    }

    #[tokio::test]
    async fn keys_from_another_exam_are_rejected() {
        let (exam, _) = setup();
        let (_, other_keys) = setup();
        let engine = BatchEngine::new(
            Arc::new(FixedRecognizer(HashMap::new())),
            BatchConfig::default(),
        );
        let err = engine
            .run(exam, other_keys, &[], &NoopReporter)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("different exam"));
    }
}
