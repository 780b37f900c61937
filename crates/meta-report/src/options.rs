//! Display configuration for tables and forest plots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use meta_model::{EffectMeasure, StudyRecord};

/// Column that can be shown to the left of the plot area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayColumn {
    Study,
    NTreatment,
    MeanTreatment,
    SdTreatment,
    NControl,
    MeanControl,
    SdControl,
    /// Effect estimate with its confidence interval.
    Effect,
    WeightRandom,
    WeightCommon,
}

impl DisplayColumn {
    pub const ALL: [DisplayColumn; 10] = [
        DisplayColumn::Study,
        DisplayColumn::NTreatment,
        DisplayColumn::MeanTreatment,
        DisplayColumn::SdTreatment,
        DisplayColumn::NControl,
        DisplayColumn::MeanControl,
        DisplayColumn::SdControl,
        DisplayColumn::Effect,
        DisplayColumn::WeightRandom,
        DisplayColumn::WeightCommon,
    ];

    pub const DEFAULT: [DisplayColumn; 9] = [
        DisplayColumn::Study,
        DisplayColumn::NTreatment,
        DisplayColumn::MeanTreatment,
        DisplayColumn::SdTreatment,
        DisplayColumn::NControl,
        DisplayColumn::MeanControl,
        DisplayColumn::SdControl,
        DisplayColumn::Effect,
        DisplayColumn::WeightRandom,
    ];

    /// Configuration key, as accepted in `columns` and `labels`.
    pub fn key(self) -> &'static str {
        match self {
            Self::Study => "study",
            Self::NTreatment => "n_treatment",
            Self::MeanTreatment => "mean_treatment",
            Self::SdTreatment => "sd_treatment",
            Self::NControl => "n_control",
            Self::MeanControl => "mean_control",
            Self::SdControl => "sd_control",
            Self::Effect => "effect",
            Self::WeightRandom => "weight_random",
            Self::WeightCommon => "weight_common",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Study => "Study label",
            Self::NTreatment => "Treatment arm sample size",
            Self::MeanTreatment => "Treatment arm mean",
            Self::SdTreatment => "Treatment arm standard deviation",
            Self::NControl => "Control arm sample size",
            Self::MeanControl => "Control arm mean",
            Self::SdControl => "Control arm standard deviation",
            Self::Effect => "Effect estimate with confidence interval",
            Self::WeightRandom => "Random-effects weight (%)",
            Self::WeightCommon => "Common-effect weight (%)",
        }
    }

    /// Header used when no label is configured.
    pub fn default_label(self, measure: EffectMeasure, level: f64) -> String {
        match self {
            Self::Study => "Study".to_string(),
            Self::NTreatment => "N (T)".to_string(),
            Self::MeanTreatment => "Mean (T)".to_string(),
            Self::SdTreatment => "SD (T)".to_string(),
            Self::NControl => "N (C)".to_string(),
            Self::MeanControl => "Mean (C)".to_string(),
            Self::SdControl => "SD (C)".to_string(),
            Self::Effect => format!("{} [{}% CI]", measure.abbreviation(), level_percent(level)),
            Self::WeightRandom => "Weight".to_string(),
            Self::WeightCommon => "Weight (common)".to_string(),
        }
    }

    /// Whether the column holds numbers and should be right-aligned.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::Study)
    }

    /// Cell text for a raw study record, for the per-arm columns.
    pub fn record_cell(self, record: &StudyRecord, decimals: usize) -> Option<String> {
        let value = match self {
            Self::NTreatment => record.n_treatment.to_string(),
            Self::MeanTreatment => format!("{:.decimals$}", record.mean_treatment),
            Self::SdTreatment => format!("{:.decimals$}", record.sd_treatment),
            Self::NControl => record.n_control.to_string(),
            Self::MeanControl => format!("{:.decimals$}", record.mean_control),
            Self::SdControl => format!("{:.decimals$}", record.sd_control),
            _ => return None,
        };
        Some(value)
    }
}

/// Confidence level as a percentage, without trailing zeros (`95`, `97.5`).
pub fn level_percent(level: f64) -> String {
    let percent = level * 100.0;
    if (percent - percent.round()).abs() < 1e-9 {
        format!("{percent:.0}")
    } else {
        format!("{percent:.1}")
    }
}

/// Colours used by the SVG renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotColors {
    pub study_square: String,
    pub ci_line: String,
    pub overall_diamond: String,
    pub subgroup_diamond: String,
    pub reference_line: String,
    pub text: String,
}

impl Default for PlotColors {
    fn default() -> Self {
        Self {
            study_square: "#4A6FA5".to_string(),
            ci_line: "#333333".to_string(),
            overall_diamond: "#C0392B".to_string(),
            subgroup_diamond: "#7F8C8D".to_string(),
            reference_line: "#999999".to_string(),
            text: "#000000".to_string(),
        }
    }
}

/// Display options for the summary table and forest plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotOptions {
    pub title: Option<String>,
    /// Label under the x axis; defaults to the effect measure name.
    pub x_label: Option<String>,
    pub columns: Vec<DisplayColumn>,
    /// Header overrides keyed by column.
    pub labels: BTreeMap<DisplayColumn, String>,
    pub colors: PlotColors,
    pub print_tau2: bool,
    pub test_overall: bool,
    pub test_subgroup: bool,
    pub decimals: usize,
    /// Width of the plot area in characters for the text plot.
    pub text_width: usize,
    /// Width of the plot area in pixels for the SVG plot.
    pub svg_plot_width: f64,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            title: None,
            x_label: None,
            columns: DisplayColumn::DEFAULT.to_vec(),
            labels: BTreeMap::new(),
            colors: PlotColors::default(),
            print_tau2: true,
            test_overall: true,
            test_subgroup: true,
            decimals: 2,
            text_width: 41,
            svg_plot_width: 320.0,
        }
    }
}

impl PlotOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    #[must_use]
    pub fn with_columns(mut self, columns: Vec<DisplayColumn>) -> Self {
        self.columns = columns;
        self
    }

    #[must_use]
    pub fn with_label(mut self, column: DisplayColumn, label: impl Into<String>) -> Self {
        self.labels.insert(column, label.into());
        self
    }

    /// Header text for a column, honouring configured labels.
    pub fn header(&self, column: DisplayColumn, measure: EffectMeasure, level: f64) -> String {
        self.labels
            .get(&column)
            .cloned()
            .unwrap_or_else(|| column.default_label(measure, level))
    }

    pub fn x_axis_label(&self, measure: EffectMeasure) -> String {
        self.x_label
            .clone()
            .unwrap_or_else(|| measure.label().to_string())
    }
}
