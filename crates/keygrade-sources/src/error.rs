//! Source error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading key sources or answer manifests.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The file extension is not one we know how to read.
    #[error("unsupported key source format '{extension}' ({path})")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The spreadsheet could not be opened or a worksheet could not be read.
    #[error("failed to read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    /// A JSON document did not have the expected shape.
    #[error("invalid JSON in {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The answer manifest parsed but its content is unusable.
    #[error("invalid answer manifest: {0}")]
    InvalidManifest(String),
}
