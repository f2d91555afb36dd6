//! The `keygrade init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create keygrade.toml
    if Path::new("keygrade.toml").exists() {
        println!("keygrade.toml already exists, skipping.");
    } else {
        std::fs::write("keygrade.toml", SAMPLE_CONFIG)?;
        println!("Created keygrade.toml");
    }

    // Create example exam
    let exam_path = Path::new("exam.toml");
    if exam_path.exists() {
        println!("exam.toml already exists, skipping.");
    } else {
        std::fs::write(exam_path, EXAMPLE_EXAM)?;
        println!("Created exam.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit exam.toml to match your paper (subjects, question counts, sets)");
    println!("  2. Run: keygrade validate --exam exam.toml --keys answer-key.xlsx");
    println!("  3. Run: keygrade score --exam exam.toml --keys answer-key.xlsx --answers sheets.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# keygrade configuration

# Set used for sheets the answer manifest does not tag with one.
# default_set = "A"

parallelism = 4

# Sheets recognized below this confidence are listed for manual review.
confidence_threshold = 0.8

output_dir = "./keygrade-results"
"#;

const EXAMPLE_EXAM: &str = r#"[exam]
title = "Data Science Comprehensive Exam"
description = "Python, Data Analysis, MySQL, Power BI and Advanced Statistics"
exam_date = "2025-09-20"
duration_minutes = 120
total_questions = 100
expected_sets = ["A", "B"]
option_letters = "abcd"

# Subjects own consecutive question ranges, in this order.
[[exam.subjects]]
name = "PYTHON"
questions = 20

[[exam.subjects]]
name = "DATA_ANALYSIS"
questions = 20

[[exam.subjects]]
name = "MySQL"
questions = 20

[[exam.subjects]]
name = "POWER_BI"
questions = 20

[[exam.subjects]]
name = "ADV_STATS"
questions = 20
"#;
