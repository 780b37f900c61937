//! Pooled and subgroup results produced by an analysis run.

use serde::{Deserialize, Serialize};

use crate::estimate::{ConfidenceInterval, EffectEstimate};
use crate::options::AnalysisOptions;
use crate::warning::AnalysisWarning;

/// Display label for the partition of records that carry no subgroup value.
pub const UNSPECIFIED_SUBGROUP: &str = "Unspecified";

/// One pooled estimate (common-effect or random-effects).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PooledEstimate {
    pub estimate: f64,
    pub standard_error: f64,
    pub ci: ConfidenceInterval,
    /// z or t statistic for the test of overall effect.
    pub statistic: f64,
    /// Two-sided p-value for the test of overall effect.
    pub p_value: f64,
    /// Degrees of freedom when the statistic is t-distributed.
    pub df: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Heterogeneity {
    pub tau2: f64,
    pub tau: f64,
    /// Cochran's Q.
    pub q: f64,
    pub df: usize,
    pub p_value: f64,
    /// Percentage of variation attributable to heterogeneity, in [0, 100].
    pub i2: f64,
    pub h: f64,
}

/// Iteration record of the between-study variance estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Convergence {
    pub iterations: usize,
    pub converged: bool,
}

/// Aggregate over a set of effect estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PooledResult {
    pub study_count: usize,
    pub common: PooledEstimate,
    pub random: PooledEstimate,
    /// Random-effects standard error `sqrt(1 / Σw*)`, before any
    /// Hartung-Knapp rescaling. Weights the test for subgroup differences.
    pub random_se_unadjusted: f64,
    pub heterogeneity: Heterogeneity,
    pub prediction: Option<ConfidenceInterval>,
    /// Present when tau² was estimated iteratively.
    pub convergence: Option<Convergence>,
    pub hartung_knapp: bool,
}

impl PooledResult {
    pub fn tau2(&self) -> f64 {
        self.heterogeneity.tau2
    }

    pub fn i2(&self) -> f64 {
        self.heterogeneity.i2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubgroupOutcome {
    Pooled(PooledResult),
    /// Fewer than two studies; shown descriptively only.
    InsufficientSubgroupData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgroupResult {
    /// `None` for the studies that carry no subgroup value.
    pub label: Option<String>,
    pub studies: Vec<EffectEstimate>,
    pub outcome: SubgroupOutcome,
}

impl SubgroupResult {
    /// Label shown in tables, plots and warnings.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(UNSPECIFIED_SUBGROUP)
    }

    pub fn pooled(&self) -> Option<&PooledResult> {
        match &self.outcome {
            SubgroupOutcome::Pooled(result) => Some(result),
            SubgroupOutcome::InsufficientSubgroupData => None,
        }
    }

    pub fn study_count(&self) -> usize {
        self.studies.len()
    }
}

/// Test for differences between subgroup estimates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubgroupTest {
    pub q: f64,
    pub df: usize,
    pub p_value: f64,
}

/// Complete outcome of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaAnalysis {
    pub options: AnalysisOptions,
    /// Per-study estimates in input order.
    pub studies: Vec<EffectEstimate>,
    pub overall: PooledResult,
    /// Subgroup partitions in display order; empty without a subgroup column.
    pub subgroups: Vec<SubgroupResult>,
    pub subgroup_test: Option<SubgroupTest>,
    pub warnings: Vec<AnalysisWarning>,
}

impl MetaAnalysis {
    pub fn has_subgroups(&self) -> bool {
        !self.subgroups.is_empty()
    }

    pub fn study_count(&self) -> usize {
        self.studies.len()
    }

    pub fn subgroup_study_count(&self) -> usize {
        self.subgroups.iter().map(SubgroupResult::study_count).sum()
    }
}
