//! Writing rendered documents to disk.

use std::fs;
use std::path::Path;

use crate::error::{ReportError, Result};

/// Write `contents` to `path`, creating missing parent directories.
pub fn write_document(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| ReportError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}
