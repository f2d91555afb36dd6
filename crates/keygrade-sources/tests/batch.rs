//! Batch scoring over the concrete sources: JSON answer keys, a manifest of
//! recognized sheets and the mock recognizer.

use std::sync::Arc;

use keygrade_core::answer_key::AnswerKeyStore;
use keygrade_core::engine::{BatchConfig, BatchEngine, NoopReporter, SheetAssignment};
use keygrade_core::model::{ExamConfiguration, ExamDraft, OptionSet, Subject, VariantLabel};
use keygrade_core::results::Grade;
use keygrade_sources::mock::MockRecognizer;
use keygrade_sources::{load_key_tables, ManifestRecognizer};

const KEYS: &str = r#"{
  "tables": [
    {"name": "Set - A", "grid": [
      ["Python", "Statistics"],
      ["1 - a", "3 - c"],
      ["2 - b", "4 - a,d"]
    ]},
    {"name": "Set - B", "grid": [
      ["1 - d", "3 - b"],
      ["2 - c", "4 - a"]
    ]},
    {"name": "Instructions", "grid": [["Fill the bubbles completely"]]}
  ]
}"#;

const MANIFEST: &str = r#"{
  "sheets": [
    {"sheet_id": "img_003.jpg", "set": "B", "answers": ["d", "c", "b", "a"], "confidence": 0.97},
    {"sheet_id": "img_001.jpg", "answers": ["a", "b", "c", "a,d"], "confidence": 0.92},
    {"sheet_id": "img_002.jpg", "answers": ["a", "", "c", "a"], "confidence": 0.41},
    {"sheet_id": "img_004.jpg", "set": "C", "answers": ["a", "b", "c", "d"]}
  ]
}"#;

fn exam() -> ExamConfiguration {
    ExamConfiguration::new(ExamDraft {
        title: "Integration".into(),
        total_questions: 4,
        subjects: vec![
            Subject {
                name: "PYTHON".into(),
                questions: 2,
            },
            Subject {
                name: "ADV_STATS".into(),
                questions: 2,
            },
        ],
        expected_sets: vec![VariantLabel::new('A').unwrap(), VariantLabel::new('B').unwrap()],
        ..Default::default()
    })
    .unwrap()
}

fn load_keys(exam: &ExamConfiguration) -> AnswerKeyStore {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.json");
    std::fs::write(&path, KEYS).unwrap();
    let tables = load_key_tables(&path).unwrap();
    AnswerKeyStore::build(exam, &tables).unwrap()
}

#[tokio::test]
async fn manifest_batch_end_to_end() {
    let exam = exam();
    let keys = load_keys(&exam);
    assert_eq!(keys.len(), 2);
    assert_eq!(keys.warnings().len(), 1);

    let manifest = ManifestRecognizer::parse(MANIFEST, "manifest").unwrap();
    let sheets = manifest.assignments().to_vec();
    let engine = BatchEngine::new(
        Arc::new(manifest),
        BatchConfig {
            default_variant: VariantLabel::new('A'),
            ..Default::default()
        },
    );

    let report = engine
        .run(Arc::new(exam), Arc::new(keys), &sheets, &NoopReporter)
        .await
        .unwrap();

    let ids: Vec<&str> = report.results.iter().map(|r| r.sheet_id.as_str()).collect();
    assert_eq!(ids, vec!["img_001.jpg", "img_002.jpg", "img_003.jpg"]);

    let perfect_a = &report.results[0];
    assert_eq!(perfect_a.grade, Grade::APlus);
    assert_eq!(perfect_a.subject("ADV_STATS").unwrap().correct, 2);

    // Blank on Q2 and only one of the two letters on Q4.
    let partial = &report.results[1];
    assert_eq!(partial.overall_correct, 2);
    assert_eq!(partial.overall_percentage, 50.0);
    assert_eq!(partial.grade, Grade::BMinus);

    assert_eq!(report.results[2].variant, VariantLabel::new('B').unwrap());
    assert_eq!(report.results[2].overall_correct, 4);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].sheet_id, "img_004.jpg");
    assert_eq!(report.low_confidence, vec!["img_002.jpg".to_string()]);

    let stats = &report.statistics;
    assert_eq!(stats.count, 3);
    assert_eq!(stats.high_performers, 2);
    assert_eq!(stats.per_variant.len(), 2);
    assert_eq!(stats.per_variant[&VariantLabel::new('A').unwrap()].count, 2);
}

#[tokio::test]
async fn mock_recognizer_sees_exam_shape() {
    let exam = exam();
    let keys = load_keys(&exam);
    let recognizer = Arc::new(MockRecognizer::with_fixed_answers(vec![
        OptionSet::from_letters(['a']),
        OptionSet::from_letters(['b']),
        OptionSet::from_letters(['c']),
        OptionSet::from_letters(['a', 'd']),
    ]));
    let engine = BatchEngine::new(recognizer.clone(), BatchConfig::default());

    let sheets: Vec<SheetAssignment> = (1..=5)
        .map(|i| SheetAssignment {
            sheet_id: format!("sheet-{i}"),
            variant: VariantLabel::new('A'),
        })
        .collect();

    let report = engine
        .run(Arc::new(exam), Arc::new(keys), &sheets, &NoopReporter)
        .await
        .unwrap();

    assert_eq!(recognizer.call_count(), 5);
    let last = recognizer.last_request().unwrap();
    assert_eq!(last.total_questions, 4);
    assert_eq!(last.option_letters, "abcd");
    assert_eq!(report.statistics.count, 5);
    assert_eq!(report.statistics.mean_percentage, 100.0);
}
