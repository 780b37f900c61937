use anyhow::Result;
use comfy_table::{Cell, Table};
use tracing::info_span;

use meta_cli::config::{ConfigOverrides, RunConfig};
use meta_cli::pipeline::{AnalyzeOutcome, AnalyzeRequest, analyze};
use meta_model::{EffectMeasure, TauEstimator};
use meta_report::{DisplayColumn, PlotOptions};

use crate::cli::{AnalyzeArgs, EstimatorArg, MeasureArg};
use crate::summary::{apply_table_style, dim_cell, header_cell};

pub fn run_columns() {
    let defaults = PlotOptions::default();
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Key"),
        header_cell("Default header"),
        header_cell("Description"),
        header_cell("Shown by default"),
    ]);
    apply_table_style(&mut table);
    for column in DisplayColumn::ALL {
        let shown = if defaults.columns.contains(&column) {
            Cell::new("yes")
        } else {
            dim_cell("no")
        };
        table.add_row(vec![
            Cell::new(column.key()),
            Cell::new(column.default_label(EffectMeasure::Md, 0.95)),
            Cell::new(column.description()),
            shown,
        ]);
    }
    println!("{table}");
}

fn overrides_from_args(args: &AnalyzeArgs) -> ConfigOverrides {
    ConfigOverrides {
        effect_measure: args.measure.map(|measure| match measure {
            MeasureArg::Md => EffectMeasure::Md,
            MeasureArg::Smd => EffectMeasure::Smd,
        }),
        tau_estimator: args.estimator.map(|estimator| match estimator {
            EstimatorArg::Reml => TauEstimator::Reml,
            EstimatorArg::Dl => TauEstimator::DerSimonianLaird,
        }),
        no_hartung_knapp: args.no_hartung_knapp,
        unpooled_variance: args.unpooled_variance,
        subgroup_column: args.subgroup.clone(),
        subgroup_order: args.subgroup_order.clone(),
        confidence_level: args.level,
        prediction_interval: args.prediction,
        delimiter: args.delimiter,
        no_tau2: args.no_tau2,
        no_test_overall: args.no_test_overall,
        no_test_subgroup: args.no_test_subgroup,
        title: args.title.clone(),
    }
}

pub fn run_analyze(args: &AnalyzeArgs) -> Result<AnalyzeOutcome> {
    let span = info_span!("analyze", input = %args.input.display());
    let _guard = span.enter();
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    config.apply(&overrides_from_args(args));
    analyze(&AnalyzeRequest {
        input: args.input.clone(),
        config,
        svg: args.svg.clone(),
        json: args.json.clone(),
        text_plot: args.text_plot,
    })
}
