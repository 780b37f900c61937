//! Presentation of meta-analysis results.
//!
//! - **Forest layout**: renderer-independent rows, axis range and footer
//! - **SVG**: standalone forest plot document
//! - **Text**: fixed-width forest plot for the terminal
//! - **JSON**: full analysis with input provenance

mod error;
mod format;
mod forest;
mod json;
mod options;
mod svg;
mod text;
mod write;

pub use error::{ReportError, Result};
pub use format::{format_p, format_weight, heterogeneity_line, overall_test_line, subgroup_test_line};
pub use forest::{
    AxisRange, DiamondKind, ForestLayout, ForestRow, Marker, OVERALL_LABEL, PREDICTION_LABEL,
    REFERENCE_VALUE, RowKind, SUBTOTAL_LABEL,
};
pub use json::{AnalysisReport, GENERATOR_NAME, GeneratorInfo, write_json_report};
pub use options::{DisplayColumn, PlotColors, PlotOptions, level_percent};
pub use svg::{render_svg, write_svg};
pub use text::render_text_plot;
pub use write::write_document;
