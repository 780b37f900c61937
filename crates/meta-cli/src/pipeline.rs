//! Analysis pipeline: ingest, analyze, render.
//!
//! Output documents are rendered in full before any file is written, and
//! a failed write removes the files this run already produced, so a failed
//! run leaves no outputs behind.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, info_span, warn};

use meta_ingest::{LoadedStudies, load_studies};
use meta_model::MetaAnalysis;
use meta_report::{
    AnalysisReport, ForestLayout, render_svg, render_text_plot, write_document,
};
use meta_stats::{Stratification, run_analysis};

use crate::config::RunConfig;

/// One `analyze` invocation.
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub input: PathBuf,
    pub config: RunConfig,
    pub svg: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub text_plot: bool,
}

#[derive(Debug)]
pub struct AnalyzeOutcome {
    pub loaded: LoadedStudies,
    /// Analysis with ingest warnings prepended to its own.
    pub analysis: MetaAnalysis,
    pub layout: ForestLayout,
    pub text_plot: Option<String>,
    pub svg: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

pub fn analyze(request: &AnalyzeRequest) -> Result<AnalyzeOutcome> {
    let config = &request.config;
    let ingest_options = config.input.ingest_options()?;
    let loaded = load_studies(&request.input, &ingest_options)
        .with_context(|| format!("load study table {}", request.input.display()))?;

    let stratification = if ingest_options.subgroup_column.is_some() {
        Stratification::BySubgroup
    } else {
        Stratification::None
    };
    let mut analysis = run_analysis(&loaded.records, &config.analysis, stratification)
        .context("run meta-analysis")?;
    let mut warnings = loaded.warnings.clone();
    warnings.append(&mut analysis.warnings);
    analysis.warnings = warnings;

    let span = info_span!("render");
    let _guard = span.enter();
    let layout = ForestLayout::build(&analysis, &loaded.records, &config.plot);
    let text_plot = request
        .text_plot
        .then(|| render_text_plot(&layout, config.plot.text_width));

    let svg = request
        .svg
        .as_ref()
        .map(|_| render_svg(&layout, &config.plot))
        .transpose()
        .context("render SVG forest plot")?;
    let json = request
        .json
        .as_ref()
        .map(|_| AnalysisReport::new(&analysis, &loaded.provenance).to_json())
        .transpose()
        .context("render JSON report")?;
    write_outputs([
        (request.svg.as_deref(), svg, "SVG forest plot"),
        (request.json.as_deref(), json, "JSON report"),
    ])?;

    Ok(AnalyzeOutcome {
        loaded,
        analysis,
        layout,
        text_plot,
        svg: request.svg.clone(),
        json: request.json.clone(),
    })
}

/// Write rendered documents in order. If one write fails, files already
/// written by this call are removed before the error is returned.
fn write_outputs<const N: usize>(
    outputs: [(Option<&Path>, Option<String>, &str); N],
) -> Result<()> {
    let mut written: Vec<&Path> = Vec::new();
    for (path, document, kind) in outputs {
        let (Some(path), Some(document)) = (path, document) else {
            continue;
        };
        if let Err(error) = write_document(path, &document) {
            for done in &written {
                if let Err(remove_error) = fs::remove_file(done) {
                    warn!(
                        path = %done.display(),
                        %remove_error,
                        "could not remove partial output"
                    );
                }
            }
            return Err(error).with_context(|| format!("write {kind} {}", path.display()));
        }
        info!(path = %path.display(), "{kind} written");
        written.push(path);
    }
    Ok(())
}
