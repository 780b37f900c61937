//! Resolution of required and optional input columns.

use std::path::Path;

use crate::error::{IngestError, Result};

/// Required study-level column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyColumn {
    Study,
    NTreatment,
    MeanTreatment,
    SdTreatment,
    NControl,
    MeanControl,
    SdControl,
}

impl StudyColumn {
    pub const ALL: [StudyColumn; 7] = [
        StudyColumn::Study,
        StudyColumn::NTreatment,
        StudyColumn::MeanTreatment,
        StudyColumn::SdTreatment,
        StudyColumn::NControl,
        StudyColumn::MeanControl,
        StudyColumn::SdControl,
    ];

    /// Canonical header name.
    pub fn header(self) -> &'static str {
        match self {
            Self::Study => "Study",
            Self::NTreatment => "N_Treatment",
            Self::MeanTreatment => "Mean_Treatment",
            Self::SdTreatment => "SD_Treatment",
            Self::NControl => "N_Control",
            Self::MeanControl => "Mean_Control",
            Self::SdControl => "SD_Control",
        }
    }
}

/// Header lookup key: case-insensitive, ignoring spaces, underscores, dots and dashes.
pub(crate) fn header_key(name: &str) -> String {
    name.chars()
        .filter(|ch| !matches!(ch, ' ' | '_' | '-' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Column indices resolved against a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub study: usize,
    pub n_treatment: usize,
    pub mean_treatment: usize,
    pub sd_treatment: usize,
    pub n_control: usize,
    pub mean_control: usize,
    pub sd_control: usize,
    pub subgroup: Option<usize>,
}

impl ColumnMap {
    pub fn resolve(headers: &[String], subgroup: Option<&str>, path: &Path) -> Result<Self> {
        let find = |name: &str| -> Result<usize> {
            let key = header_key(name);
            headers
                .iter()
                .position(|header| header_key(header) == key)
                .ok_or_else(|| IngestError::MissingColumn {
                    column: name.to_string(),
                    path: path.to_path_buf(),
                })
        };
        Ok(Self {
            study: find(StudyColumn::Study.header())?,
            n_treatment: find(StudyColumn::NTreatment.header())?,
            mean_treatment: find(StudyColumn::MeanTreatment.header())?,
            sd_treatment: find(StudyColumn::SdTreatment.header())?,
            n_control: find(StudyColumn::NControl.header())?,
            mean_control: find(StudyColumn::MeanControl.header())?,
            sd_control: find(StudyColumn::SdControl.header())?,
            subgroup: subgroup.map(find).transpose()?,
        })
    }

    pub fn index(&self, column: StudyColumn) -> usize {
        match column {
            StudyColumn::Study => self.study,
            StudyColumn::NTreatment => self.n_treatment,
            StudyColumn::MeanTreatment => self.mean_treatment,
            StudyColumn::SdTreatment => self.sd_treatment,
            StudyColumn::NControl => self.n_control,
            StudyColumn::MeanControl => self.mean_control,
            StudyColumn::SdControl => self.sd_control,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    #[test]
    fn header_key_ignores_case_and_separators() {
        assert_eq!(header_key("SD_Treatment"), "sdtreatment");
        assert_eq!(header_key("sd treatment"), "sdtreatment");
        assert_eq!(header_key("Duration-Group"), "durationgroup");
    }

    #[test]
    fn resolves_reordered_headers() {
        let cols = headers(&[
            "sd control",
            "Mean_Control",
            "N_Control",
            "SD_Treatment",
            "mean treatment",
            "n_treatment",
            "STUDY",
            "Duration_Group",
        ]);
        let map = ColumnMap::resolve(&cols, Some("duration group"), Path::new("x.csv")).unwrap();
        assert_eq!(map.study, 6);
        assert_eq!(map.sd_control, 0);
        assert_eq!(map.subgroup, Some(7));
        assert_eq!(map.index(StudyColumn::NTreatment), 5);
    }

    #[test]
    fn missing_subgroup_column_is_reported() {
        let cols = headers(&StudyColumn::ALL.map(StudyColumn::header));
        let err = ColumnMap::resolve(&cols, Some("Duration_Group"), Path::new("x.csv"))
            .unwrap_err();
        match err {
            IngestError::MissingColumn { column, .. } => assert_eq!(column, "Duration_Group"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
