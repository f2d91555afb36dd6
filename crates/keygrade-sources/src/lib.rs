//! keygrade-sources: concrete collaborators for the grading core.
//!
//! Loads answer-key tables from spreadsheet workbooks and JSON dumps,
//! implements the `Recognizer` trait over pre-recognized answer manifests,
//! and reads the `keygrade.toml` configuration.

pub mod config;
pub mod error;
pub mod manifest;
pub mod mock;
pub mod workbook;

pub use config::{load_config, load_config_from, KeygradeConfig};
pub use error::SourceError;
pub use manifest::ManifestRecognizer;
pub use workbook::{key_source_for, load_key_tables, JsonKeySource, WorkbookKeySource};
