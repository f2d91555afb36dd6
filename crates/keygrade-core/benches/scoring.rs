use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chrono::Utc;
use keygrade_core::answer_key::KeyVariant;
use keygrade_core::model::{ExamConfiguration, ExamDraft, OptionSet, SheetSubmission, Subject, VariantLabel};
use keygrade_core::results::{Grade, ScoredResult, SubjectScore};
use keygrade_core::scoring::score;
use keygrade_core::statistics::aggregate;
use uuid::Uuid;

const SUBJECTS: [&str; 5] = ["PYTHON", "DATA_ANALYSIS", "MySQL", "POWER_BI", "ADV_STATS"];

fn make_exam() -> ExamConfiguration {
    ExamConfiguration::new(ExamDraft {
        title: "Bench".into(),
        total_questions: 100,
        subjects: SUBJECTS
            .iter()
            .map(|name| Subject {
                name: (*name).into(),
                questions: 20,
            })
            .collect(),
        ..Default::default()
    })
    .unwrap()
}

fn letters(i: usize) -> OptionSet {
    let letter = ['a', 'b', 'c', 'd'][i % 4];
    if i % 10 == 0 {
        OptionSet::from_letters([letter, 'd'])
    } else {
        OptionSet::from_letters([letter])
    }
}

fn make_key() -> KeyVariant {
    KeyVariant {
        label: VariantLabel::new('A').unwrap(),
        source_table: "Set - A".into(),
        answers: (0..100).map(letters).collect(),
    }
}

fn make_submission(wrong_every: usize) -> SheetSubmission {
    SheetSubmission {
        sheet_id: "bench.jpg".into(),
        assigned_variant: VariantLabel::new('A').unwrap(),
        recognized_answers: (0..100)
            .map(|i| {
                if i % wrong_every == 0 {
                    OptionSet::new()
                } else {
                    letters(i)
                }
            })
            .collect(),
        confidence: Some(0.9),
    }
}

fn make_result(i: usize) -> ScoredResult {
    let correct = (i * 37) % 101;
    let overall_percentage = correct as f64;
    ScoredResult {
        id: Uuid::nil(),
        exam_id: Uuid::nil(),
        sheet_id: format!("sheet-{i:04}.jpg"),
        variant: VariantLabel::new(if i % 2 == 0 { 'A' } else { 'B' }).unwrap(),
        subject_scores: SUBJECTS
            .iter()
            .map(|name| SubjectScore::new(*name, correct / 5, 20))
            .collect(),
        overall_correct: correct,
        total_questions: 100,
        overall_percentage,
        grade: Grade::from_percentage(overall_percentage),
        confidence: Some(0.8 + (i % 20) as f64 / 100.0),
        created_at: Utc::now(),
    }
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");
    let exam = make_exam();
    let key = make_key();

    group.bench_function("first_blank", |b| {
        let submission = make_submission(usize::MAX);
        b.iter(|| score(black_box(&exam), black_box(&key), black_box(&submission)))
    });

    group.bench_function("every_third_blank", |b| {
        let submission = make_submission(3);
        b.iter(|| score(black_box(&exam), black_box(&key), black_box(&submission)))
    });

    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for n in [10, 100, 1000] {
        let results: Vec<ScoredResult> = (0..n).map(make_result).collect();
        group.bench_function(format!("{n}_results"), |b| {
            b.iter(|| aggregate(black_box(&results)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_score, bench_aggregate);
criterion_main!(benches);
