//! CLI argument definitions for forest-meta.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "forest-meta",
    version,
    about = "Random-effects meta-analysis of continuous outcomes with forest plots",
    long_about = "Pool per-study mean differences from a table of trial summary statistics.\n\n\
                  Estimates between-study variance by REML (or DerSimonian-Laird), applies the\n\
                  Hartung-Knapp adjustment, tests subgroup differences and renders forest plots."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a meta-analysis over a study table.
    Analyze(AnalyzeArgs),

    /// List the display columns available for tables and plots.
    Columns,
}

#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Delimited file with one row per study.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// JSON file with `input`, `analysis` and `plot` sections.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Effect measure.
    #[arg(long = "measure", value_enum)]
    pub measure: Option<MeasureArg>,

    /// Between-study variance estimator.
    #[arg(long = "estimator", value_enum)]
    pub estimator: Option<EstimatorArg>,

    /// Use normal-based intervals instead of the Hartung-Knapp adjustment.
    #[arg(long = "no-hartung-knapp")]
    pub no_hartung_knapp: bool,

    /// Use separate arm variances for the mean-difference standard error.
    #[arg(long = "unpooled-variance")]
    pub unpooled_variance: bool,

    /// Column holding the subgroup label (e.g. Duration_Group).
    #[arg(long = "subgroup", value_name = "COLUMN")]
    pub subgroup: Option<String>,

    /// Display order for subgroup labels.
    #[arg(long = "subgroup-order", value_name = "A,B,...", value_delimiter = ',')]
    pub subgroup_order: Option<Vec<String>>,

    /// Confidence level for study and pooled intervals.
    #[arg(long = "level", value_name = "LEVEL")]
    pub level: Option<f64>,

    /// Report a prediction interval for the pooled effect.
    #[arg(long = "prediction")]
    pub prediction: bool,

    /// Field delimiter of the input file.
    #[arg(long = "delimiter", value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Omit tau² from heterogeneity statistics.
    #[arg(long = "no-tau2")]
    pub no_tau2: bool,

    /// Omit the test for the overall effect.
    #[arg(long = "no-test-overall")]
    pub no_test_overall: bool,

    /// Omit the test for subgroup differences.
    #[arg(long = "no-test-subgroup")]
    pub no_test_subgroup: bool,

    /// Write the forest plot as SVG.
    #[arg(long = "svg", value_name = "PATH")]
    pub svg: Option<PathBuf>,

    /// Write the full analysis as JSON.
    #[arg(long = "json", value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Print a text forest plot after the summary.
    #[arg(long = "text-plot")]
    pub text_plot: bool,

    /// Plot title.
    #[arg(long = "title")]
    pub title: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MeasureArg {
    /// Mean difference.
    Md,
    /// Standardised mean difference (Hedges' g).
    Smd,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum EstimatorArg {
    /// Restricted maximum likelihood.
    Reml,
    /// DerSimonian-Laird.
    Dl,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
