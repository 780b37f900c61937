use std::fmt;

use serde::{Deserialize, Serialize};

/// A non-fatal condition surfaced alongside analysis results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisWarning {
    /// Record dropped because a required field is missing or invalid.
    ExcludedRecord {
        study: String,
        row: usize,
        reason: String,
    },
    /// Record dropped because its study label was already used.
    DuplicateStudy { study: String, row: usize },
    /// Within-study variance was zero and has been floored.
    ZeroVariance { study: String, floor: f64 },
    /// REML did not converge; the last iterate was kept.
    NonConvergence {
        scope: String,
        iterations: usize,
        tau2: f64,
    },
    /// Subgroup has too few studies for a pooled estimate.
    InsufficientSubgroupData { subgroup: String, studies: usize },
}

impl AnalysisWarning {
    /// Study the warning refers to, if it is study-specific.
    pub fn study(&self) -> Option<&str> {
        match self {
            Self::ExcludedRecord { study, .. }
            | Self::DuplicateStudy { study, .. }
            | Self::ZeroVariance { study, .. } => Some(study),
            Self::NonConvergence { .. } | Self::InsufficientSubgroupData { .. } => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::ExcludedRecord { .. } => "ExcludedRecord",
            Self::DuplicateStudy { .. } => "DuplicateStudy",
            Self::ZeroVariance { .. } => "ZeroVariance",
            Self::NonConvergence { .. } => "NonConvergence",
            Self::InsufficientSubgroupData { .. } => "InsufficientSubgroupData",
        }
    }
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExcludedRecord { study, row, reason } => {
                write!(f, "row {row} ({study}) excluded: {reason}")
            }
            Self::DuplicateStudy { study, row } => {
                write!(f, "row {row} ({study}) excluded: duplicate study label")
            }
            Self::ZeroVariance { study, floor } => {
                write!(f, "{study}: zero within-study variance floored at {floor:e}")
            }
            Self::NonConvergence {
                scope,
                iterations,
                tau2,
            } => write!(
                f,
                "{scope}: REML did not converge after {iterations} iterations (tau^2 = {tau2:.4})"
            ),
            Self::InsufficientSubgroupData { subgroup, studies } => write!(
                f,
                "subgroup {subgroup}: {studies} stud{} is too few for a pooled estimate",
                if *studies == 1 { "y" } else { "ies" }
            ),
        }
    }
}
