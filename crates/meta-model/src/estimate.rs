use serde::{Deserialize, Serialize};

/// Confidence interval around a point estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
    /// Confidence level (e.g., 0.95).
    pub level: f64,
}

impl ConfidenceInterval {
    pub fn new(estimate: f64, lower: f64, upper: f64, level: f64) -> Self {
        Self {
            estimate,
            lower,
            upper,
            level,
        }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// Format as `estimate [lower; upper]`.
    pub fn format(&self, decimals: usize) -> String {
        format!(
            "{:.prec$} [{:.prec$}; {:.prec$}]",
            self.estimate,
            self.lower,
            self.upper,
            prec = decimals
        )
    }
}

/// Per-study effect derived from a [`StudyRecord`](crate::StudyRecord).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectEstimate {
    pub study_label: String,
    pub subgroup_label: Option<String>,
    pub estimate: f64,
    pub standard_error: f64,
    /// Within-study variance used for weighting (after any floor).
    pub variance: f64,
    pub ci: ConfidenceInterval,
    /// Common-effect weight as a percentage of the analysis total.
    pub weight_common: f64,
    /// Random-effects weight as a percentage of the analysis total.
    pub weight_random: f64,
}
