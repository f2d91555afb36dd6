//! Recognizer backed by a JSON manifest of already-recognized sheets.
//!
//! The bubble detector runs elsewhere and writes one entry per scanned
//! sheet:
//!
//! ```json
//! {"sheets": [
//!   {"sheet_id": "img_001.jpg", "set": "A", "answers": ["a", "b,c", ""], "confidence": 0.93}
//! ]}
//! ```
//!
//! An empty answer string is a blank question.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use keygrade_core::engine::SheetAssignment;
use keygrade_core::model::{OptionSet, VariantLabel};
use keygrade_core::traits::{RecognizeRequest, Recognition, Recognizer};

use crate::error::SourceError;

#[derive(Debug, Deserialize)]
struct ManifestFile {
    sheets: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    sheet_id: String,
    #[serde(default)]
    set: Option<VariantLabel>,
    answers: Vec<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

pub struct ManifestRecognizer {
    assignments: Vec<SheetAssignment>,
    recognitions: HashMap<String, Recognition>,
}

impl ManifestRecognizer {
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse manifest JSON; `context` names the document in errors.
    pub fn parse(content: &str, context: &str) -> Result<Self, SourceError> {
        let file: ManifestFile =
            serde_json::from_str(content).map_err(|source| SourceError::Json {
                context: context.to_string(),
                source,
            })?;

        let mut assignments = Vec::with_capacity(file.sheets.len());
        let mut recognitions = HashMap::with_capacity(file.sheets.len());

        for entry in file.sheets {
            if entry.sheet_id.trim().is_empty() {
                return Err(SourceError::InvalidManifest("empty sheet_id".into()));
            }
            if recognitions.contains_key(&entry.sheet_id) {
                return Err(SourceError::InvalidManifest(format!(
                    "sheet '{}' is listed twice",
                    entry.sheet_id
                )));
            }
            if let Some(c) = entry.confidence {
                if !(0.0..=1.0).contains(&c) {
                    return Err(SourceError::InvalidManifest(format!(
                        "sheet '{}': confidence {c} is outside [0, 1]",
                        entry.sheet_id
                    )));
                }
            }

            let answers = entry
                .answers
                .iter()
                .enumerate()
                .map(|(i, raw)| {
                    raw.parse::<OptionSet>().map_err(|e| {
                        SourceError::InvalidManifest(format!(
                            "sheet '{}', question {}: {e}",
                            entry.sheet_id,
                            i + 1
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            assignments.push(SheetAssignment {
                sheet_id: entry.sheet_id.clone(),
                variant: entry.set,
            });
            recognitions.insert(
                entry.sheet_id,
                Recognition {
                    answers,
                    confidence: entry.confidence,
                },
            );
        }

        tracing::debug!("loaded answer manifest with {} sheet(s)", assignments.len());
        Ok(Self {
            assignments,
            recognitions,
        })
    }

    /// Sheets in manifest order, with the set each one was tagged with.
    pub fn assignments(&self) -> &[SheetAssignment] {
        &self.assignments
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

#[async_trait]
impl Recognizer for ManifestRecognizer {
    fn name(&self) -> &str {
        "manifest"
    }

    async fn recognize(&self, request: &RecognizeRequest) -> anyhow::Result<Recognition> {
        let recognition = self
            .recognitions
            .get(&request.sheet_id)
            .ok_or_else(|| anyhow::anyhow!("sheet '{}' is not in the manifest", request.sheet_id))?;

        for (i, answer) in recognition.answers.iter().enumerate() {
            let stray = answer.letters_outside(&request.option_letters);
            if !stray.is_empty() {
                tracing::warn!(
                    "sheet '{}', question {}: marks {stray:?} are not printed options",
                    request.sheet_id,
                    i + 1
                );
            }
        }
        Ok(recognition.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
  "sheets": [
    {"sheet_id": "img_002.jpg", "set": "b", "answers": ["a", "b, c", ""], "confidence": 0.91},
    {"sheet_id": "img_001.jpg", "answers": ["d", "", "a"]}
  ]
}"#;

    fn request(sheet_id: &str) -> RecognizeRequest {
        RecognizeRequest {
            sheet_id: sheet_id.into(),
            total_questions: 3,
            option_letters: "abcd".into(),
        }
    }

    #[test]
    fn assignments_keep_manifest_order() {
        let manifest = ManifestRecognizer::parse(MANIFEST, "test").unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.assignments()[0].sheet_id, "img_002.jpg");
        assert_eq!(manifest.assignments()[0].variant, VariantLabel::new('B'));
        assert_eq!(manifest.assignments()[1].variant, None);
    }

    #[tokio::test]
    async fn recognize_returns_parsed_marks() {
        let manifest = ManifestRecognizer::parse(MANIFEST, "test").unwrap();
        let recognition = manifest.recognize(&request("img_002.jpg")).await.unwrap();
        assert_eq!(recognition.answers.len(), 3);
        assert_eq!(recognition.answers[1], OptionSet::from_letters(['b', 'c']));
        assert!(recognition.answers[2].is_empty());
        assert_eq!(recognition.confidence, Some(0.91));

        let err = manifest.recognize(&request("img_404.jpg")).await.unwrap_err();
        assert!(err.to_string().contains("not in the manifest"));
    }

    #[test]
    fn duplicate_sheets_are_rejected() {
        let json = r#"{"sheets": [
            {"sheet_id": "x.jpg", "answers": ["a"]},
            {"sheet_id": "x.jpg", "answers": ["b"]}
        ]}"#;
        let err = ManifestRecognizer::parse(json, "test").err().unwrap();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn bad_entries_are_rejected() {
        let bad_letter = r#"{"sheets": [{"sheet_id": "x.jpg", "answers": ["a", "7"]}]}"#;
        let err = ManifestRecognizer::parse(bad_letter, "test").err().unwrap();
        assert!(err.to_string().contains("question 2"));

        let bad_confidence =
            r#"{"sheets": [{"sheet_id": "x.jpg", "answers": ["a"], "confidence": 1.5}]}"#;
        assert!(ManifestRecognizer::parse(bad_confidence, "test").is_err());

        let bad_set = r#"{"sheets": [{"sheet_id": "x.jpg", "set": "AB", "answers": ["a"]}]}"#;
        assert!(matches!(
            ManifestRecognizer::parse(bad_set, "test"),
            Err(SourceError::Json { .. })
        ));
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers.json");
        std::fs::write(&path, MANIFEST).unwrap();
        let manifest = ManifestRecognizer::from_path(&path).unwrap();
        assert!(!manifest.is_empty());
    }
}
