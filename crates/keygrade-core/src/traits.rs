//! Collaborator traits for key-source loaders and answer recognizers.
//!
//! These are implemented by the `keygrade-sources` crate. Optical bubble
//! detection itself lives outside keygrade; a [`Recognizer`] only hands
//! over its already-decoded output.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::answer_key::RawTable;
use crate::model::OptionSet;

// ---------------------------------------------------------------------------
// Key sources
// ---------------------------------------------------------------------------

/// Something that can produce the raw tables of an answer-key source.
pub trait KeySource {
    /// Human-readable description of where the tables come from.
    fn describe(&self) -> String;

    /// Load every table, in source order.
    fn load_tables(&self) -> anyhow::Result<Vec<RawTable>>;
}

// ---------------------------------------------------------------------------
// Recognizers
// ---------------------------------------------------------------------------

/// Trait for backends that turn an answer sheet into marked letters.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Human-readable recognizer name (e.g. "manifest").
    fn name(&self) -> &str;

    /// Recognize the marks on one sheet.
    async fn recognize(&self, request: &RecognizeRequest) -> anyhow::Result<Recognition>;
}

/// Request to recognize one sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizeRequest {
    /// Sheet identifier (usually the scanned file name).
    pub sheet_id: String,
    /// Number of questions printed on the sheet.
    pub total_questions: usize,
    /// Option letters printed per question.
    pub option_letters: String,
}

/// Decoded marks for one sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    /// Marked letters per question; empty for a blank.
    pub answers: Vec<OptionSet>,
    /// Overall confidence in `[0, 1]`, if the recognizer reports one.
    #[serde(default)]
    pub confidence: Option<f64>,
}
