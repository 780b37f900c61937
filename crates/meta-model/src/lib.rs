//! Data model definitions for continuous-outcome meta-analysis.

pub mod error;
pub mod estimate;
pub mod options;
pub mod record;
pub mod result;
pub mod warning;

pub use error::{MetaError, Result};
pub use estimate::{ConfidenceInterval, EffectEstimate};
pub use options::{AnalysisOptions, EffectMeasure, TauEstimator, VarianceModel};
pub use record::StudyRecord;
pub use result::{
    Convergence, Heterogeneity, MetaAnalysis, PooledEstimate, PooledResult, SubgroupOutcome,
    SubgroupResult, SubgroupTest, UNSPECIFIED_SUBGROUP,
};
pub use warning::AnalysisWarning;
