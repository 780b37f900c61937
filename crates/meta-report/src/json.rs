//! Machine-readable analysis report.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::debug;

use meta_ingest::InputProvenance;
use meta_model::MetaAnalysis;

use crate::error::Result;
use crate::write::write_document;

pub const GENERATOR_NAME: &str = "forest-meta";

#[derive(Debug, Clone, Serialize)]
pub struct GeneratorInfo {
    pub name: &'static str,
    pub version: &'static str,
}

impl Default for GeneratorInfo {
    fn default() -> Self {
        Self {
            name: GENERATOR_NAME,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Full analysis plus the provenance of its input.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport<'a> {
    pub generator: GeneratorInfo,
    /// RFC 3339 UTC timestamp.
    pub generated_at: String,
    pub input: &'a InputProvenance,
    pub analysis: &'a MetaAnalysis,
}

impl<'a> AnalysisReport<'a> {
    pub fn new(analysis: &'a MetaAnalysis, input: &'a InputProvenance) -> Self {
        Self {
            generator: GeneratorInfo::default(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            input,
            analysis,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Write the report as pretty-printed JSON, creating parent directories.
pub fn write_json_report(path: &Path, report: &AnalysisReport<'_>) -> Result<()> {
    let json = report.to_json()?;
    write_document(path, &json)?;
    debug!(path = %path.display(), "wrote JSON report");
    Ok(())
}
