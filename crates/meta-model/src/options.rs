//! Configuration options for the pooling and subgroup engines.

use serde::{Deserialize, Serialize};

use crate::error::{MetaError, Result};

/// Effect measure computed for each study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EffectMeasure {
    /// Raw mean difference (treatment minus control).
    #[default]
    #[serde(rename = "MD", alias = "md")]
    Md,
    /// Standardized mean difference (Hedges' g).
    #[serde(rename = "SMD", alias = "smd")]
    Smd,
}

impl EffectMeasure {
    pub fn label(self) -> &'static str {
        match self {
            Self::Md => "Mean Difference",
            Self::Smd => "Standardised Mean Difference",
        }
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::Md => "MD",
            Self::Smd => "SMD",
        }
    }
}

/// Estimator for the between-study variance component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TauEstimator {
    /// Restricted maximum likelihood.
    #[default]
    #[serde(rename = "REML", alias = "reml")]
    Reml,
    /// DerSimonian-Laird moment estimator.
    #[serde(rename = "DL", alias = "dl")]
    DerSimonianLaird,
}

impl TauEstimator {
    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::Reml => "REML",
            Self::DerSimonianLaird => "DL",
        }
    }
}

/// Standard error formula for the per-study mean difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceModel {
    /// Pooled two-sample variance.
    #[default]
    Pooled,
    /// Separate arm variances (`sd_t²/n_t + sd_c²/n_c`).
    Unpooled,
}

/// Options controlling the meta-analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    pub effect_measure: EffectMeasure,
    pub tau_estimator: TauEstimator,
    /// Apply the Hartung-Knapp small-sample adjustment.
    pub hartung_knapp: bool,
    /// Floor the Hartung-Knapp scaling factor at 1 so the adjusted interval
    /// is never narrower than the unadjusted one.
    pub hk_variance_floor: bool,
    pub variance_model: VarianceModel,
    pub confidence_level: f64,
    pub prediction_interval: bool,
    /// Floor for within-study variances that evaluate to zero.
    pub min_variance: f64,
    pub reml_max_iterations: usize,
    pub reml_tolerance: f64,
    /// Explicit ordering for subgroup labels.
    pub subgroup_order: Option<Vec<String>>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            effect_measure: EffectMeasure::default(),
            tau_estimator: TauEstimator::default(),
            hartung_knapp: true,
            hk_variance_floor: true,
            variance_model: VarianceModel::default(),
            confidence_level: 0.95,
            prediction_interval: false,
            min_variance: 1e-8,
            reml_max_iterations: 100,
            reml_tolerance: 1e-10,
            subgroup_order: None,
        }
    }
}

impl AnalysisOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_effect_measure(mut self, measure: EffectMeasure) -> Self {
        self.effect_measure = measure;
        self
    }

    #[must_use]
    pub fn with_tau_estimator(mut self, estimator: TauEstimator) -> Self {
        self.tau_estimator = estimator;
        self
    }

    #[must_use]
    pub fn with_hartung_knapp(mut self, enable: bool) -> Self {
        self.hartung_knapp = enable;
        self
    }

    #[must_use]
    pub fn with_hk_variance_floor(mut self, enable: bool) -> Self {
        self.hk_variance_floor = enable;
        self
    }

    #[must_use]
    pub fn with_reml_iterations(mut self, max_iterations: usize, tolerance: f64) -> Self {
        self.reml_max_iterations = max_iterations;
        self.reml_tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_variance_model(mut self, model: VarianceModel) -> Self {
        self.variance_model = model;
        self
    }

    #[must_use]
    pub fn with_confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = level;
        self
    }

    #[must_use]
    pub fn with_prediction_interval(mut self, enable: bool) -> Self {
        self.prediction_interval = enable;
        self
    }

    #[must_use]
    pub fn with_subgroup_order(mut self, order: Option<Vec<String>>) -> Self {
        self.subgroup_order = order;
        self
    }

    /// Check numeric options are within range.
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(MetaError::InvalidOption {
                name: "confidence_level",
                reason: format!("{} is not in (0, 1)", self.confidence_level),
            });
        }
        if !(self.min_variance.is_finite() && self.min_variance > 0.0) {
            return Err(MetaError::InvalidOption {
                name: "min_variance",
                reason: format!("{} must be positive", self.min_variance),
            });
        }
        if self.reml_max_iterations == 0 {
            return Err(MetaError::InvalidOption {
                name: "reml_max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.reml_tolerance.is_finite() && self.reml_tolerance > 0.0) {
            return Err(MetaError::InvalidOption {
                name: "reml_tolerance",
                reason: format!("{} must be positive", self.reml_tolerance),
            });
        }
        Ok(())
    }
}
