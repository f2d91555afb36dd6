//! Explicit grading session context.
//!
//! Holds what an interactive session accumulates: the current exam, the
//! loaded answer keys and the running results log. The surrounding
//! application owns one context and threads it through its calls.

use std::sync::Arc;

use crate::answer_key::{AnswerKeyStore, KeyWarning, RawTable};
use crate::error::GradingError;
use crate::model::{ExamConfiguration, SheetSubmission};
use crate::results::{ResultsLog, ScoredResult};
use crate::scoring::score;
use crate::statistics::{aggregate, BatchStatistics};

pub struct GradingContext {
    exam: Arc<ExamConfiguration>,
    keys: Option<AnswerKeyStore>,
    results: ResultsLog,
}

impl GradingContext {
    pub fn new(exam: Arc<ExamConfiguration>) -> Self {
        Self {
            exam,
            keys: None,
            results: ResultsLog::new(),
        }
    }

    pub fn exam(&self) -> &Arc<ExamConfiguration> {
        &self.exam
    }

    /// Build a key store from `tables` and make it current.
    ///
    /// On error the previously loaded keys stay in place.
    pub fn load_keys(&mut self, tables: &[RawTable]) -> Result<&[KeyWarning], GradingError> {
        let store = AnswerKeyStore::build(&self.exam, tables)?;
        tracing::info!(
            "loaded answer keys for set(s) {:?} ({} warning(s))",
            store.labels().iter().map(|l| l.to_string()).collect::<Vec<_>>(),
            store.warnings().len()
        );
        Ok(self.keys.insert(store).warnings())
    }

    pub fn keys(&self) -> Option<&AnswerKeyStore> {
        self.keys.as_ref()
    }

    /// Score a submission against its assigned set and log the result.
    pub fn score(&mut self, submission: &SheetSubmission) -> Result<&ScoredResult, GradingError> {
        let keys = self
            .keys
            .as_ref()
            .ok_or(GradingError::UnknownVariant(submission.assigned_variant))?;
        let key = keys.require(submission.assigned_variant)?;
        let result = score(&self.exam, key, submission)?;
        Ok(self.results.append(result))
    }

    pub fn results(&self) -> &[ScoredResult] {
        self.results.as_slice()
    }

    /// Aggregate everything scored so far.
    pub fn statistics(&self) -> BatchStatistics {
        aggregate(self.results.as_slice())
    }
}
