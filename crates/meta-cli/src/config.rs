//! Run configuration: JSON config file merged with command-line overrides.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use meta_ingest::IngestOptions;
use meta_model::{AnalysisOptions, EffectMeasure, TauEstimator, VarianceModel};
use meta_report::PlotOptions;

/// How the study table is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub delimiter: char,
    pub subgroup_column: Option<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            subgroup_column: None,
        }
    }
}

impl InputConfig {
    pub fn ingest_options(&self) -> Result<IngestOptions> {
        let delimiter = match self.delimiter {
            '\t' => b'\t',
            c if c.is_ascii() && !c.is_ascii_alphanumeric() && c != '"' => c as u8,
            c => bail!("unsupported delimiter {c:?}"),
        };
        Ok(IngestOptions::default()
            .with_delimiter(delimiter)
            .with_subgroup_column(self.subgroup_column.clone()))
    }
}

/// Everything needed for one `analyze` run, as read from `--config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub input: InputConfig,
    pub analysis: AnalysisOptions,
    pub plot: PlotOptions,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub effect_measure: Option<EffectMeasure>,
    pub tau_estimator: Option<TauEstimator>,
    pub no_hartung_knapp: bool,
    pub unpooled_variance: bool,
    pub subgroup_column: Option<String>,
    pub subgroup_order: Option<Vec<String>>,
    pub confidence_level: Option<f64>,
    pub prediction_interval: bool,
    pub delimiter: Option<char>,
    pub no_tau2: bool,
    pub no_test_overall: bool,
    pub no_test_subgroup: bool,
    pub title: Option<String>,
}

impl RunConfig {
    /// Read a JSON config file; absent sections keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
    }

    /// Apply command-line overrides; unset overrides keep the file value.
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        let analysis = &mut self.analysis;
        if let Some(measure) = overrides.effect_measure {
            analysis.effect_measure = measure;
        }
        if let Some(estimator) = overrides.tau_estimator {
            analysis.tau_estimator = estimator;
        }
        if overrides.no_hartung_knapp {
            analysis.hartung_knapp = false;
        }
        if overrides.unpooled_variance {
            analysis.variance_model = VarianceModel::Unpooled;
        }
        if let Some(order) = &overrides.subgroup_order {
            analysis.subgroup_order = Some(order.clone());
        }
        if let Some(level) = overrides.confidence_level {
            analysis.confidence_level = level;
        }
        if overrides.prediction_interval {
            analysis.prediction_interval = true;
        }

        if let Some(column) = &overrides.subgroup_column {
            self.input.subgroup_column = Some(column.clone());
        }
        if let Some(delimiter) = overrides.delimiter {
            self.input.delimiter = delimiter;
        }

        let plot = &mut self.plot;
        if overrides.no_tau2 {
            plot.print_tau2 = false;
        }
        if overrides.no_test_overall {
            plot.test_overall = false;
        }
        if overrides.no_test_subgroup {
            plot.test_subgroup = false;
        }
        if let Some(title) = &overrides.title {
            plot.title = Some(title.clone());
        }
    }
}
