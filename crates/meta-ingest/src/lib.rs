//! Study table ingestion.
//!
//! Reads a delimited table of per-study summary statistics, resolves the
//! required columns, and validates every row into a [`StudyRecord`].
//! Invalid rows are never fatal: they are excluded and reported as
//! [`AnalysisWarning`]s naming the offending study.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use meta_ingest::{IngestOptions, load_studies};
//!
//! let options = IngestOptions::default().with_subgroup_column(Some("Duration_Group".into()));
//! let loaded = load_studies(Path::new("trials.csv"), &options)?;
//! println!("{} valid records", loaded.records.len());
//! ```

mod columns;
mod error;
mod hash;
mod records;
mod table;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use meta_model::{AnalysisWarning, StudyRecord};

pub use columns::{ColumnMap, StudyColumn};
pub use error::{IngestError, Result};
pub use hash::sha256_hex;
pub use records::{RecordSet, build_records};
pub use table::{DelimitedTable, TableRow, read_delimited_table};

/// Options for reading the study table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    pub delimiter: u8,
    /// Column holding the subgroup label (e.g. `Duration_Group`).
    pub subgroup_column: Option<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            subgroup_column: None,
        }
    }
}

impl IngestOptions {
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn with_subgroup_column(mut self, column: Option<String>) -> Self {
        self.subgroup_column = column;
        self
    }
}

/// Where the analysed data came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputProvenance {
    pub path: PathBuf,
    pub sha256: String,
    pub data_rows: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedStudies {
    pub records: Vec<StudyRecord>,
    pub warnings: Vec<AnalysisWarning>,
    pub provenance: InputProvenance,
}

/// Load and validate a study table.
pub fn load_studies(path: &Path, options: &IngestOptions) -> Result<LoadedStudies> {
    let span = info_span!("ingest", path = %path.display());
    let _guard = span.enter();
    let table = read_delimited_table(path, options.delimiter)?;
    let map = ColumnMap::resolve(&table.headers, options.subgroup_column.as_deref(), path)?;
    let RecordSet { records, warnings } = build_records(&table, &map);
    info!(
        data_rows = table.rows.len(),
        valid = records.len(),
        excluded = warnings.len(),
        "study table loaded"
    );
    Ok(LoadedStudies {
        records,
        warnings,
        provenance: InputProvenance {
            path: path.to_path_buf(),
            sha256: table.sha256,
            data_rows: table.rows.len(),
        },
    })
}
