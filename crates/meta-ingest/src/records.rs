//! Conversion of table rows into validated study records.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use meta_model::{AnalysisWarning, StudyRecord};

use crate::columns::{ColumnMap, StudyColumn};
use crate::table::{DelimitedTable, TableRow};

/// Outcome of validating every row of a table.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub records: Vec<StudyRecord>,
    pub warnings: Vec<AnalysisWarning>,
}

impl RecordSet {
    pub fn excluded_count(&self) -> usize {
        self.warnings.len()
    }
}

fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("na")
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed == "."
}

fn parse_real(value: &str, column: StudyColumn) -> Result<f64, String> {
    if is_missing(value) {
        return Err(format!("{} is missing", column.header()));
    }
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("{} is not a number: '{}'", column.header(), value.trim()))?;
    if !parsed.is_finite() {
        return Err(format!("{} must be finite", column.header()));
    }
    Ok(parsed)
}

fn parse_sd(value: &str, column: StudyColumn) -> Result<f64, String> {
    let parsed = parse_real(value, column)?;
    if parsed < 0.0 {
        return Err(format!("{} must be non-negative", column.header()));
    }
    Ok(parsed)
}

fn parse_count(value: &str, column: StudyColumn) -> Result<u32, String> {
    let parsed = parse_real(value, column)?;
    if parsed < 1.0 || parsed.fract() != 0.0 || parsed > f64::from(u32::MAX) {
        return Err(format!("{} must be a positive integer", column.header()));
    }
    Ok(parsed as u32)
}

fn parse_row(
    table: &DelimitedTable,
    map: &ColumnMap,
    row: &TableRow,
    label: String,
) -> Result<StudyRecord, String> {
    let cell = |column: StudyColumn| table.cell(row, map.index(column));
    let subgroup_label = map
        .subgroup
        .map(|idx| table.cell(row, idx))
        .filter(|value| !is_missing(value))
        .map(str::to_string);
    Ok(StudyRecord {
        study_label: label,
        n_treatment: parse_count(cell(StudyColumn::NTreatment), StudyColumn::NTreatment)?,
        mean_treatment: parse_real(cell(StudyColumn::MeanTreatment), StudyColumn::MeanTreatment)?,
        sd_treatment: parse_sd(cell(StudyColumn::SdTreatment), StudyColumn::SdTreatment)?,
        n_control: parse_count(cell(StudyColumn::NControl), StudyColumn::NControl)?,
        mean_control: parse_real(cell(StudyColumn::MeanControl), StudyColumn::MeanControl)?,
        sd_control: parse_sd(cell(StudyColumn::SdControl), StudyColumn::SdControl)?,
        subgroup_label,
        row: row.number,
    })
}

/// Validate every data row; invalid rows become warnings naming the study.
pub fn build_records(table: &DelimitedTable, map: &ColumnMap) -> RecordSet {
    let mut set = RecordSet::default();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for row in &table.rows {
        let raw_label = table.cell(row, map.study);
        let label = if raw_label.is_empty() {
            format!("Row {}", row.number)
        } else {
            raw_label.to_string()
        };
        if seen.contains(&label) {
            warn!(study = %label, row = row.number, "duplicate study label, record excluded");
            set.warnings.push(AnalysisWarning::DuplicateStudy {
                study: label,
                row: row.number,
            });
            continue;
        }
        match parse_row(table, map, row, label.clone()) {
            Ok(record) => {
                debug!(study = %record.study_label, row = row.number, "record accepted");
                seen.insert(label);
                set.records.push(record);
            }
            Err(reason) => {
                warn!(study = %label, row = row.number, %reason, "record excluded");
                set.warnings.push(AnalysisWarning::ExcludedRecord {
                    study: label,
                    row: row.number,
                    reason,
                });
            }
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_must_be_whole() {
        assert_eq!(parse_count("50", StudyColumn::NTreatment), Ok(50));
        assert_eq!(parse_count("50.0", StudyColumn::NTreatment), Ok(50));
        assert!(parse_count("12.5", StudyColumn::NTreatment).is_err());
        assert!(parse_count("0", StudyColumn::NControl).is_err());
    }

    #[test]
    fn missing_markers() {
        assert!(is_missing(""));
        assert!(is_missing("NA"));
        assert!(is_missing(" . "));
        assert!(!is_missing("0"));
    }

    #[test]
    fn negative_sd_reason_names_column() {
        let err = parse_sd("-1", StudyColumn::SdTreatment).unwrap_err();
        assert_eq!(err, "SD_Treatment must be non-negative");
    }

    #[test]
    fn non_numeric_reason_quotes_value() {
        let err = parse_real("abc", StudyColumn::MeanControl).unwrap_err();
        assert_eq!(err, "Mean_Control is not a number: 'abc'");
    }
}
