use serde::{Deserialize, Serialize};

/// One validated row of per-study summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyRecord {
    pub study_label: String,
    pub n_treatment: u32,
    pub mean_treatment: f64,
    pub sd_treatment: f64,
    pub n_control: u32,
    pub mean_control: f64,
    pub sd_control: f64,
    pub subgroup_label: Option<String>,
    /// 1-based data-row number in the input, blank rows not counted.
    pub row: usize,
}

impl StudyRecord {
    /// Mean difference, treatment minus control.
    pub fn mean_difference(&self) -> f64 {
        self.mean_treatment - self.mean_control
    }
}
