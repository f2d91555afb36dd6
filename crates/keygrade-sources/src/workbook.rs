//! Answer-key source loaders.
//!
//! Every worksheet of a workbook (or every entry of a JSON dump) becomes
//! one [`RawTable`]. Cells are rendered to strings; structure checks happen
//! later in `AnswerKeyStore::build`.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Reader};
use serde::{Deserialize, Serialize};

use keygrade_core::answer_key::RawTable;
use keygrade_core::traits::KeySource;

use crate::error::SourceError;

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// Spreadsheet workbook read through `calamine`.
#[derive(Debug, Clone)]
pub struct WorkbookKeySource {
    path: PathBuf,
}

impl WorkbookKeySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read every worksheet, in workbook order.
    pub fn read(&self) -> Result<Vec<RawTable>, SourceError> {
        let workbook_error = |source| SourceError::Workbook {
            path: self.path.clone(),
            source,
        };

        let mut workbook = open_workbook_auto(&self.path).map_err(workbook_error)?;
        let mut tables = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name).map_err(workbook_error)?;
            let grid: Vec<Vec<String>> = range
                .rows()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect();
            tracing::debug!("read worksheet '{name}' ({} rows)", grid.len());
            tables.push(RawTable::new(name, grid));
        }
        Ok(tables)
    }
}

impl KeySource for WorkbookKeySource {
    fn describe(&self) -> String {
        format!("workbook {}", self.path.display())
    }

    fn load_tables(&self) -> anyhow::Result<Vec<RawTable>> {
        Ok(self.read()?)
    }
}

/// On-disk shape of a JSON table dump.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonKeyFile {
    pub tables: Vec<RawTable>,
}

/// A JSON document of named grids, `{"tables": [{"name", "grid"}]}`.
#[derive(Debug, Clone)]
pub struct JsonKeySource {
    path: PathBuf,
}

impl JsonKeySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn read(&self) -> Result<Vec<RawTable>, SourceError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        let file: JsonKeyFile =
            serde_json::from_str(&content).map_err(|source| SourceError::Json {
                context: self.path.display().to_string(),
                source,
            })?;
        Ok(file.tables)
    }
}

impl KeySource for JsonKeySource {
    fn describe(&self) -> String {
        format!("JSON tables {}", self.path.display())
    }

    fn load_tables(&self) -> anyhow::Result<Vec<RawTable>> {
        Ok(self.read()?)
    }
}

/// Pick a loader from the file extension.
pub fn key_source_for(path: &Path) -> Result<Box<dyn KeySource>, SourceError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if extension == "json" {
        Ok(Box::new(JsonKeySource::new(path)))
    } else if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        Ok(Box::new(WorkbookKeySource::new(path)))
    } else {
        Err(SourceError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        })
    }
}

/// Load the raw tables of the key source at `path`.
pub fn load_key_tables(path: &Path) -> anyhow::Result<Vec<RawTable>> {
    let source = key_source_for(path)?;
    tracing::info!("loading answer keys from {}", source.describe());
    source.load_tables()
}
