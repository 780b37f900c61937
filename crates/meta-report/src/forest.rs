//! Forest plot layout shared by the SVG and text renderers.
//!
//! The layout is a flat list of rows in display order. Renderers only map
//! rows and the axis range onto their own coordinates; every label, cell
//! and interval is decided here.

use std::collections::HashMap;

use meta_model::{
    ConfidenceInterval, EffectEstimate, MetaAnalysis, PooledResult, StudyRecord, SubgroupResult,
    TauEstimator,
};

use crate::format::{format_weight, heterogeneity_line, overall_test_line, subgroup_test_line};
use crate::options::{DisplayColumn, PlotOptions};

/// Null effect for difference measures.
pub const REFERENCE_VALUE: f64 = 0.0;

pub const OVERALL_LABEL: &str = "Random effects model";
pub const SUBTOTAL_LABEL: &str = "Subtotal";
pub const PREDICTION_LABEL: &str = "Prediction interval";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiamondKind {
    Subgroup,
    Overall,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Marker {
    None,
    /// Study square; `size` is relative to the heaviest study, in (0, 1].
    Square { size: f64 },
    Diamond(DiamondKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Subgroup heading.
    Heading,
    Study,
    SubgroupPooled,
    /// Free text spanning the columns (heterogeneity, insufficient data).
    Note,
    Overall,
    Prediction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForestRow {
    pub kind: RowKind,
    /// One cell per display column; heading and note rows use the first.
    pub cells: Vec<String>,
    pub interval: Option<ConfidenceInterval>,
    pub marker: Marker,
}

impl ForestRow {
    fn text(kind: RowKind, text: String, width: usize) -> Self {
        let mut cells = vec![String::new(); width.max(1)];
        cells[0] = text;
        Self {
            kind,
            cells,
            interval: None,
            marker: Marker::None,
        }
    }

    /// Text shown for rows that span all columns.
    pub fn spanning_text(&self) -> Option<&str> {
        match self.kind {
            RowKind::Heading | RowKind::Note => self.cells.first().map(String::as_str),
            _ => None,
        }
    }
}

/// Horizontal range of the plot area with tick positions.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub ticks: Vec<f64>,
}

impl AxisRange {
    /// Smallest "nice" range covering every value.
    pub fn covering(values: impl IntoIterator<Item = f64>) -> Self {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for value in values.into_iter().filter(|v| v.is_finite()) {
            lo = lo.min(value);
            hi = hi.max(value);
        }
        if !lo.is_finite() || !hi.is_finite() {
            lo = REFERENCE_VALUE - 1.0;
            hi = REFERENCE_VALUE + 1.0;
        }
        let span = if hi > lo { hi - lo } else { 1.0 };
        let step = nice_step(span / 5.0);
        let min = (lo / step).floor() * step;
        let mut max = (hi / step).ceil() * step;
        if max <= min {
            max = min + step;
        }
        let count = ((max - min) / step).round() as usize;
        let ticks = (0..=count)
            .map(|i| {
                let tick = min + i as f64 * step;
                if tick.abs() < step * 1e-9 { 0.0 } else { tick }
            })
            .collect();
        Self {
            min,
            max,
            step,
            ticks,
        }
    }

    /// Relative position of `value` within the range, clamped to [0, 1].
    pub fn fraction(&self, value: f64) -> f64 {
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    pub fn tick_label(&self, value: f64) -> String {
        let decimals = (-self.step.log10().floor()).max(0.0) as usize;
        format!("{value:.decimals$}")
    }
}

fn nice_step(raw: f64) -> f64 {
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let factor = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    factor * magnitude
}

/// Complete, renderer-independent forest plot description.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestLayout {
    pub title: Option<String>,
    pub x_label: String,
    pub columns: Vec<DisplayColumn>,
    pub headers: Vec<String>,
    pub rows: Vec<ForestRow>,
    pub axis: AxisRange,
    pub reference: f64,
    pub footer: Vec<String>,
}

struct RowBuilder<'a> {
    options: &'a PlotOptions,
    columns: Vec<DisplayColumn>,
    records: HashMap<&'a str, &'a StudyRecord>,
    max_weight: f64,
}

impl RowBuilder<'_> {
    fn study_row(&self, effect: &EffectEstimate) -> ForestRow {
        let decimals = self.options.decimals;
        let record = self.records.get(effect.study_label.as_str()).copied();
        let cells = self
            .columns
            .iter()
            .map(|column| match column {
                DisplayColumn::Study => effect.study_label.clone(),
                DisplayColumn::Effect => effect.ci.format(decimals),
                DisplayColumn::WeightRandom => format_weight(effect.weight_random),
                DisplayColumn::WeightCommon => format_weight(effect.weight_common),
                other => record
                    .and_then(|record| other.record_cell(record, decimals))
                    .unwrap_or_default(),
            })
            .collect();
        let size = if self.max_weight > 0.0 {
            (effect.weight_random / self.max_weight).sqrt()
        } else {
            1.0
        };
        ForestRow {
            kind: RowKind::Study,
            cells,
            interval: Some(effect.ci),
            marker: Marker::Square { size },
        }
    }

    fn pooled_row(
        &self,
        kind: RowKind,
        label: &str,
        pooled: &PooledResult,
        studies: &[EffectEstimate],
    ) -> ForestRow {
        let (n_treatment, n_control) = studies.iter().fold((0u64, 0u64), |(t, c), effect| {
            match self.records.get(effect.study_label.as_str()) {
                Some(record) => (
                    t + u64::from(record.n_treatment),
                    c + u64::from(record.n_control),
                ),
                None => (t, c),
            }
        });
        let cells = self
            .columns
            .iter()
            .map(|column| match column {
                DisplayColumn::Study => label.to_string(),
                DisplayColumn::NTreatment => n_treatment.to_string(),
                DisplayColumn::NControl => n_control.to_string(),
                DisplayColumn::Effect => pooled.random.ci.format(self.options.decimals),
                DisplayColumn::WeightRandom => {
                    format_weight(studies.iter().map(|e| e.weight_random).sum())
                }
                DisplayColumn::WeightCommon => {
                    format_weight(studies.iter().map(|e| e.weight_common).sum())
                }
                _ => String::new(),
            })
            .collect();
        let diamond = if kind == RowKind::Overall {
            DiamondKind::Overall
        } else {
            DiamondKind::Subgroup
        };
        ForestRow {
            kind,
            cells,
            interval: Some(pooled.random.ci),
            marker: Marker::Diamond(diamond),
        }
    }

    fn subgroup_rows(&self, subgroup: &SubgroupResult, rows: &mut Vec<ForestRow>) {
        let width = self.columns.len();
        rows.push(ForestRow::text(RowKind::Heading, subgroup.display_label().to_string(), width));
        rows.extend(subgroup.studies.iter().map(|effect| self.study_row(effect)));
        match subgroup.pooled() {
            Some(pooled) => {
                rows.push(self.pooled_row(
                    RowKind::SubgroupPooled,
                    SUBTOTAL_LABEL,
                    pooled,
                    &subgroup.studies,
                ));
                rows.push(ForestRow::text(
                    RowKind::Note,
                    heterogeneity_line(
                        &pooled.heterogeneity,
                        self.options.print_tau2,
                        self.options.decimals,
                    ),
                    width,
                ));
            }
            None => rows.push(ForestRow::text(
                RowKind::Note,
                format!(
                    "Insufficient data for a pooled estimate (k = {})",
                    subgroup.study_count()
                ),
                width,
            )),
        }
    }
}

fn method_line(analysis: &MetaAnalysis) -> String {
    let options = &analysis.options;
    let estimator = match options.tau_estimator {
        TauEstimator::Reml => "restricted maximum-likelihood",
        TauEstimator::DerSimonianLaird => "DerSimonian-Laird",
    };
    let interval = if analysis.overall.hartung_knapp {
        "Hartung-Knapp adjusted"
    } else {
        "normal"
    };
    format!("Random effects model: {estimator} tau², {interval} confidence intervals")
}

impl ForestLayout {
    /// Lay out the rows for an analysis.
    ///
    /// `records` supplies the per-arm columns; studies are matched by label.
    pub fn build(analysis: &MetaAnalysis, records: &[StudyRecord], options: &PlotOptions) -> Self {
        let measure = analysis.options.effect_measure;
        let level = analysis.options.confidence_level;
        let columns = if options.columns.is_empty() {
            vec![DisplayColumn::Study]
        } else {
            options.columns.clone()
        };
        let builder = RowBuilder {
            options,
            columns: columns.clone(),
            records: records
                .iter()
                .map(|record| (record.study_label.as_str(), record))
                .collect(),
            max_weight: analysis
                .studies
                .iter()
                .map(|e| e.weight_random)
                .fold(0.0, f64::max),
        };

        let mut rows = Vec::new();
        if analysis.has_subgroups() {
            for subgroup in &analysis.subgroups {
                builder.subgroup_rows(subgroup, &mut rows);
            }
        } else {
            rows.extend(analysis.studies.iter().map(|effect| builder.study_row(effect)));
        }
        rows.push(builder.pooled_row(
            RowKind::Overall,
            OVERALL_LABEL,
            &analysis.overall,
            &analysis.studies,
        ));
        if let Some(prediction) = analysis.overall.prediction {
            let mut row = ForestRow::text(
                RowKind::Prediction,
                PREDICTION_LABEL.to_string(),
                columns.len(),
            );
            if let Some(index) = columns.iter().position(|c| *c == DisplayColumn::Effect) {
                row.cells[index] = format!(
                    "[{:.prec$}; {:.prec$}]",
                    prediction.lower,
                    prediction.upper,
                    prec = options.decimals
                );
            }
            row.interval = Some(prediction);
            rows.push(row);
        }

        let mut footer = vec![heterogeneity_line(
            &analysis.overall.heterogeneity,
            options.print_tau2,
            options.decimals,
        )];
        if options.test_overall {
            footer.push(overall_test_line(&analysis.overall.random, options.decimals));
        }
        if options.test_subgroup
            && let Some(test) = &analysis.subgroup_test
        {
            footer.push(subgroup_test_line(test, options.decimals));
        }
        footer.push(method_line(analysis));

        let bounds = rows
            .iter()
            .filter_map(|row| row.interval)
            .flat_map(|ci| [ci.lower, ci.upper]);
        let axis = AxisRange::covering(bounds.chain([REFERENCE_VALUE]));

        Self {
            title: options.title.clone(),
            x_label: options.x_axis_label(measure),
            headers: columns
                .iter()
                .map(|column| options.header(*column, measure, level))
                .collect(),
            columns,
            rows,
            axis,
            reference: REFERENCE_VALUE,
            footer,
        }
    }

    pub fn study_rows(&self) -> impl Iterator<Item = &ForestRow> {
        self.rows.iter().filter(|row| row.kind == RowKind::Study)
    }

    pub fn diamonds(&self) -> impl Iterator<Item = &ForestRow> {
        self.rows
            .iter()
            .filter(|row| matches!(row.marker, Marker::Diamond(_)))
    }
}
