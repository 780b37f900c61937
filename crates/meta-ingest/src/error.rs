//! Error types for study table ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort loading a study table.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Failed to read the input file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed delimited data.
    #[error("failed to parse {path}: {source}")]
    CsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Input has no header row.
    #[error("input is empty: {path}")]
    EmptyInput { path: PathBuf },

    /// Required column not present in the header.
    #[error("required column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
