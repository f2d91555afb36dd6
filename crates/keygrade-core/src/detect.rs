//! Set detection: which raw table holds which answer-key variant.
//!
//! Every table name is upper-cased and split into alphanumeric tokens. The
//! first of `A`, `B`, `C`, `D` (in that priority) that appears as a
//! single-letter token and has not been claimed by an earlier table becomes
//! that table's label. Tables scan in input order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::VariantLabel;

/// Letters the detector looks for, highest priority first.
pub const DETECTABLE_SETS: [char; 4] = ['A', 'B', 'C', 'D'];

/// Outcome of running the detector over a list of table names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDetection {
    /// Detected label → raw table name.
    pub mapping: BTreeMap<VariantLabel, String>,
    /// Table names that received no label.
    pub undetected: Vec<String>,
}

impl SetDetection {
    /// Label assigned to a table, if any.
    pub fn label_for(&self, table_name: &str) -> Option<VariantLabel> {
        self.mapping
            .iter()
            .find(|(_, name)| name.as_str() == table_name)
            .map(|(label, _)| *label)
    }
}

/// Assign variant labels to raw table names.
pub fn detect<S: AsRef<str>>(table_names: &[S]) -> SetDetection {
    let mut detection = SetDetection::default();

    for name in table_names {
        let name = name.as_ref();
        let upper = name.to_uppercase();
        let tokens: Vec<&str> = upper
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() == 1)
            .collect();

        let claimed = DETECTABLE_SETS
            .iter()
            .filter_map(|&c| VariantLabel::new(c))
            .find(|label| {
                !detection.mapping.contains_key(label)
                    && tokens.iter().any(|t| t.starts_with(label.as_char()))
            });

        match claimed {
            Some(label) => {
                tracing::debug!("table '{name}' detected as set {label}");
                detection.mapping.insert(label, name.to_string());
            }
            None => {
                tracing::warn!("no answer set detected for table '{name}'");
                detection.undetected.push(name.to_string());
            }
        }
    }

    detection
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(c: char) -> VariantLabel {
        VariantLabel::new(c).unwrap()
    }

    #[test]
    fn detects_conventional_sheet_names() {
        let detection = detect(&["Set - A", "Set - B"]);
        assert_eq!(detection.mapping.len(), 2);
        assert_eq!(detection.mapping[&label('A')], "Set - A");
        assert_eq!(detection.mapping[&label('B')], "Set - B");
        assert!(detection.undetected.is_empty());
    }

    #[test]
    fn lower_case_names_are_upper_cased() {
        let detection = detect(&["set_c", "key-d"]);
        assert_eq!(detection.mapping[&label('C')], "set_c");
        assert_eq!(detection.mapping[&label('D')], "key-d");
    }

    #[test]
    fn letters_inside_words_do_not_count() {
        let detection = detect(&["Answers Sheet"]);
        assert!(detection.mapping.is_empty());
        assert_eq!(detection.undetected, vec!["Answers Sheet".to_string()]);
    }

    #[test]
    fn undetectable_table_does_not_block_others() {
        let detection = detect(&["Answers Sheet", "Set - B"]);
        assert_eq!(detection.mapping.len(), 1);
        assert_eq!(detection.label_for("Set - B"), Some(label('B')));
        assert_eq!(detection.label_for("Answers Sheet"), None);
    }

    #[test]
    fn priority_order_picks_a_before_b() {
        let detection = detect(&["B or A"]);
        assert_eq!(detection.label_for("B or A"), Some(label('A')));
    }

    #[test]
    fn claimed_letter_falls_through_to_next_candidate() {
        let detection = detect(&["Set A", "Set A B", "Set A again"]);
        assert_eq!(detection.label_for("Set A"), Some(label('A')));
        assert_eq!(detection.label_for("Set A B"), Some(label('B')));
        assert_eq!(detection.undetected, vec!["Set A again".to_string()]);
    }

    #[test]
    fn letters_beyond_d_are_ignored() {
        let detection = detect(&["Set - E"]);
        assert!(detection.mapping.is_empty());
    }

    #[test]
    fn detection_is_deterministic() {
        let names = ["Set - C", "A", "Paper b", "misc"];
        assert_eq!(detect(&names), detect(&names));
    }
}
