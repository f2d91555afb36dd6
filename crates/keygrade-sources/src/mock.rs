//! Mock recognizer for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use keygrade_core::model::OptionSet;
use keygrade_core::traits::{RecognizeRequest, Recognition, Recognizer};

/// A mock recognizer for exercising the batch engine without a scanner.
///
/// Returns configured marks per sheet id, or a default set of marks.
pub struct MockRecognizer {
    /// Map of sheet id → recognition.
    recognitions: HashMap<String, Recognition>,
    /// Returned for sheets not in the map; `None` makes them fail.
    default_recognition: Option<Recognition>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last request received.
    last_request: Mutex<Option<RecognizeRequest>>,
}

impl MockRecognizer {
    /// Create a mock with the given sheet → recognition mappings.
    pub fn new(recognitions: HashMap<String, Recognition>) -> Self {
        Self {
            recognitions,
            default_recognition: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that reports the same marks for every sheet.
    pub fn with_fixed_answers(answers: Vec<OptionSet>) -> Self {
        Self {
            recognitions: HashMap::new(),
            default_recognition: Some(Recognition {
                answers,
                confidence: None,
            }),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Get the number of calls made to this recognizer.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this recognizer.
    pub fn last_request(&self) -> Option<RecognizeRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl Recognizer for MockRecognizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn recognize(&self, request: &RecognizeRequest) -> anyhow::Result<Recognition> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap() = Some(request.clone());

        self.recognitions
            .get(&request.sheet_id)
            .or(self.default_recognition.as_ref())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("mock has no marks for sheet '{}'", request.sheet_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(sheet_id: &str) -> RecognizeRequest {
        RecognizeRequest {
            sheet_id: sheet_id.into(),
            total_questions: 2,
            option_letters: "abcd".into(),
        }
    }

    #[tokio::test]
    async fn fixed_answers() {
        let recognizer = MockRecognizer::with_fixed_answers(vec![
            OptionSet::from_letters(['a']),
            OptionSet::new(),
        ]);
        let recognition = recognizer.recognize(&request("any.jpg")).await.unwrap();
        assert_eq!(recognition.answers.len(), 2);
        assert_eq!(recognizer.call_count(), 1);
        assert_eq!(recognizer.last_request().unwrap().sheet_id, "any.jpg");
    }

    #[tokio::test]
    async fn per_sheet_mapping() {
        let recognizer = MockRecognizer::new(HashMap::from([(
            "s1.jpg".to_string(),
            Recognition {
                answers: vec![OptionSet::from_letters(['b', 'c'])],
                confidence: Some(0.5),
            },
        )]));

        let hit = recognizer.recognize(&request("s1.jpg")).await.unwrap();
        assert_eq!(hit.confidence, Some(0.5));

        let miss = recognizer.recognize(&request("s2.jpg")).await;
        assert!(miss.is_err());
        assert_eq!(recognizer.call_count(), 2);
    }
}
