use std::io::Write;
use std::path::Path;

use proptest::prelude::*;
use tempfile::NamedTempFile;

use meta_ingest::{IngestError, IngestOptions, load_studies, sha256_hex};
use meta_model::AnalysisWarning;

const HEADER: &str =
    "Study,N_Treatment,Mean_Treatment,SD_Treatment,N_Control,Mean_Control,SD_Control,Duration_Group";

fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write csv");
    file.flush().expect("flush csv");
    file
}

#[test]
fn loads_valid_records_with_subgroups() {
    let file = write_csv(&format!(
        "{HEADER}\n\
         Alpha 2018,50,12.1,3.2,50,10.4,3.0,Short\n\
         Beta 2019,40,11.8,2.9,42,10.9,3.1,Long\n"
    ));
    let options = IngestOptions::default().with_subgroup_column(Some("Duration_Group".into()));
    let loaded = load_studies(file.path(), &options).unwrap();

    assert_eq!(loaded.records.len(), 2);
    assert!(loaded.warnings.is_empty());
    let first = &loaded.records[0];
    assert_eq!(first.study_label, "Alpha 2018");
    assert_eq!(first.n_treatment, 50);
    assert_eq!(first.subgroup_label.as_deref(), Some("Short"));
    assert_eq!(first.row, 1);
    assert_eq!(loaded.provenance.data_rows, 2);
    let bytes = std::fs::read(file.path()).unwrap();
    assert_eq!(loaded.provenance.sha256, sha256_hex(&bytes));
}

#[test]
fn negative_sd_is_excluded_with_warning_naming_study() {
    let file = write_csv(&format!(
        "{HEADER}\n\
         Good,50,12.1,3.2,50,10.4,3.0,Short\n\
         Broken,50,12.1,-1,50,10.4,3.0,Short\n"
    ));
    let loaded = load_studies(file.path(), &IngestOptions::default()).unwrap();

    assert_eq!(loaded.records.len(), 1);
    assert_eq!(loaded.warnings.len(), 1);
    match &loaded.warnings[0] {
        AnalysisWarning::ExcludedRecord { study, row, reason } => {
            assert_eq!(study, "Broken");
            assert_eq!(*row, 2);
            assert_eq!(reason, "SD_Treatment must be non-negative");
        }
        other => panic!("unexpected warning: {other}"),
    }
}

#[test]
fn missing_numeric_field_and_duplicates_are_reported() {
    let file = write_csv(&format!(
        "{HEADER}\n\
         A,50,12.1,3.2,50,10.4,3.0,Short\n\
         B,50,,3.2,50,10.4,3.0,Short\n\
         A,30,11.0,3.2,30,10.0,3.0,Long\n"
    ));
    let loaded = load_studies(file.path(), &IngestOptions::default()).unwrap();

    assert_eq!(loaded.records.len(), 1);
    let studies: Vec<_> = loaded
        .warnings
        .iter()
        .filter_map(AnalysisWarning::study)
        .collect();
    assert_eq!(studies, vec!["B", "A"]);
    assert!(matches!(
        loaded.warnings[1],
        AnalysisWarning::DuplicateStudy { row: 3, .. }
    ));
}

#[test]
fn missing_required_column_is_fatal() {
    let file = write_csv("Study,N_Treatment,Mean_Treatment\nA,1,2\n");
    let err = load_studies(file.path(), &IngestOptions::default()).unwrap_err();
    match err {
        IngestError::MissingColumn { column, .. } => assert_eq!(column, "SD_Treatment"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unreadable_file_is_fatal() {
    let err = load_studies(
        Path::new("/definitely/not/here.csv"),
        &IngestOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, IngestError::FileRead { .. }));
}

#[test]
fn empty_subgroup_value_is_none() {
    let file = write_csv(&format!("{HEADER}\nA,50,12.1,3.2,50,10.4,3.0,\n"));
    let options = IngestOptions::default().with_subgroup_column(Some("duration group".into()));
    let loaded = load_studies(file.path(), &options).unwrap();
    assert_eq!(loaded.records[0].subgroup_label, None);
}

#[test]
fn rows_count_data_rows_not_file_lines() {
    let file = write_csv(&format!(
        "{HEADER}\n\n\
         First,50,12.1,3.2,50,10.4,3.0,Short\n\
         ,40,11.8,2.9,42,10.9,3.1,Long\n"
    ));
    let loaded = load_studies(file.path(), &IngestOptions::default()).unwrap();

    let rows: Vec<(&str, usize)> = loaded
        .records
        .iter()
        .map(|record| (record.study_label.as_str(), record.row))
        .collect();
    assert_eq!(rows, vec![("First", 1), ("Row 2", 2)]);
}

proptest! {
    #[test]
    fn valid_rows_are_always_accepted(
        n_t in 1u32..5000,
        n_c in 1u32..5000,
        mean_t in -1.0e4f64..1.0e4,
        mean_c in -1.0e4f64..1.0e4,
        sd_t in 0.0f64..1.0e3,
        sd_c in 0.0f64..1.0e3,
    ) {
        let file = write_csv(&format!(
            "{HEADER}\nS,{n_t},{mean_t},{sd_t},{n_c},{mean_c},{sd_c},G\n"
        ));
        let loaded = load_studies(file.path(), &IngestOptions::default()).unwrap();
        prop_assert_eq!(loaded.records.len(), 1);
        prop_assert!(loaded.warnings.is_empty());
        prop_assert_eq!(loaded.records[0].n_treatment, n_t);
        prop_assert_eq!(loaded.records[0].sd_control, sd_c);
    }
}
