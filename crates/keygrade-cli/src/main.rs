//! keygrade CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use keygrade_core::model::VariantLabel;

mod commands;

#[derive(Parser)]
#[command(name = "keygrade", version, about = "Answer-key driven OMR sheet scoring")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a batch of recognized answer sheets
    Score {
        /// Exam configuration (.toml)
        #[arg(long)]
        exam: PathBuf,

        /// Answer-key source (.xlsx, .xls, .ods or .json)
        #[arg(long)]
        keys: PathBuf,

        /// Manifest of recognized sheets (.json)
        #[arg(long)]
        answers: PathBuf,

        /// Set applied to sheets without their own set
        #[arg(long)]
        default_set: Option<VariantLabel>,

        /// Max sheets processed concurrently
        #[arg(long)]
        parallelism: Option<usize>,

        /// Flag sheets recognized below this confidence
        #[arg(long)]
        confidence_threshold: Option<f64>,

        /// Output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate an exam file, and optionally an answer-key source against it
    Validate {
        /// Exam configuration (.toml)
        #[arg(long)]
        exam: PathBuf,

        /// Answer-key source to check against the exam
        #[arg(long)]
        keys: Option<PathBuf>,
    },

    /// Print the statistics of a saved batch report
    Summary {
        /// Report JSON written by `keygrade score`
        #[arg(long)]
        report: PathBuf,
    },

    /// Create starter config and example exam
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("keygrade=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Score {
            exam,
            keys,
            answers,
            default_set,
            parallelism,
            confidence_threshold,
            output,
            config,
        } => {
            commands::score::execute(commands::score::ScoreArgs {
                exam,
                keys,
                answers,
                default_set,
                parallelism,
                confidence_threshold,
                output,
                config,
            })
            .await
        }
        Commands::Validate { exam, keys } => commands::validate::execute(exam, keys),
        Commands::Summary { report } => commands::summary::execute(report),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
