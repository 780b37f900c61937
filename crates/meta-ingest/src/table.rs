use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{IngestError, Result};
use crate::hash::sha256_hex;

/// One non-blank data row.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// 1-based position among the non-blank data rows.
    pub number: usize,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DelimitedTable {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
    /// SHA-256 of the raw input bytes.
    pub sha256: String,
}

impl DelimitedTable {
    /// Cell at `column` for `row`, empty when the row is short.
    pub fn cell<'a>(&self, row: &'a TableRow, column: usize) -> &'a str {
        row.cells.get(column).map(String::as_str).unwrap_or("")
    }
}

pub(crate) fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    let mut parts = trimmed.split_whitespace();
    let mut normalized = String::new();
    if let Some(first) = parts.next() {
        normalized.push_str(first);
        for part in parts {
            normalized.push(' ');
            normalized.push_str(part);
        }
    }
    normalized
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

pub fn read_delimited_table(path: &Path, delimiter: u8) -> Result<DelimitedTable> {
    let bytes = std::fs::read(path).map_err(|source| IngestError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_delimited_bytes(path, &bytes, delimiter)
}

pub(crate) fn parse_delimited_bytes(
    path: &Path,
    bytes: &[u8],
    delimiter: u8,
) -> Result<DelimitedTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);
    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| IngestError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?;
        let cells: Vec<String> = record.iter().map(normalize_cell).collect();
        if cells.iter().all(|value| value.is_empty()) {
            continue;
        }
        if headers.is_none() {
            headers = Some(cells.iter().map(|value| normalize_header(value)).collect());
            continue;
        }
        rows.push(TableRow {
            number: rows.len() + 1,
            cells,
        });
    }
    let headers = headers.ok_or_else(|| IngestError::EmptyInput {
        path: path.to_path_buf(),
    })?;
    Ok(DelimitedTable {
        headers,
        rows,
        sha256: sha256_hex(bytes),
    })
}
