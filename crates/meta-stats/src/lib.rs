//! Random-effects meta-analysis of continuous outcomes.
//!
//! Per-study effects are pure functions of the input records; pooling and
//! subgroup analysis are reductions over those immutable estimates.
//!
//! # Example
//!
//! ```ignore
//! use meta_model::AnalysisOptions;
//! use meta_stats::{Stratification, run_analysis};
//!
//! let analysis = run_analysis(&records, &AnalysisOptions::default(), Stratification::None)?;
//! println!("MD = {:.2}", analysis.overall.random.estimate);
//! ```

pub mod distribution;
pub mod effect;
pub mod pooling;
pub mod subgroup;
pub mod tau;

use tracing::{info, info_span};

use meta_model::{AnalysisOptions, MetaAnalysis, MetaError, Result, StudyRecord};

pub use effect::{EffectSet, compute_effect, compute_effects};
pub use pooling::{Pooling, assign_weights, pool};
pub use subgroup::{SubgroupAnalysis, analyze_subgroups, partition, subgroup_difference_test};

/// Whether studies are additionally analysed per subgroup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stratification {
    #[default]
    None,
    BySubgroup,
}

/// Run the full analysis: effects, overall pooling, and optional subgroups.
///
/// Fails with [`MetaError::InsufficientData`] when fewer than two studies
/// yield a valid effect estimate.
pub fn run_analysis(
    records: &[StudyRecord],
    options: &AnalysisOptions,
    stratification: Stratification,
) -> Result<MetaAnalysis> {
    options.validate()?;
    let span = info_span!(
        "analysis",
        measure = options.effect_measure.abbreviation(),
        estimator = options.tau_estimator.abbreviation(),
        hartung_knapp = options.hartung_knapp
    );
    let _guard = span.enter();

    let EffectSet {
        mut effects,
        mut warnings,
    } = compute_effects(records, options);
    if effects.len() < 2 {
        return Err(MetaError::InsufficientData {
            available: effects.len(),
        });
    }

    let overall = pool(&effects, options, "overall")?;
    warnings.extend(overall.warnings);
    let overall = overall.result;
    assign_weights(&mut effects, overall.heterogeneity.tau2);

    let (subgroups, subgroup_test) = match stratification {
        Stratification::None => (Vec::new(), None),
        Stratification::BySubgroup => {
            let analysis = analyze_subgroups(&effects, options);
            warnings.extend(analysis.warnings);
            (analysis.subgroups, analysis.test)
        }
    };

    info!(
        studies = effects.len(),
        estimate = overall.random.estimate,
        lower = overall.random.ci.lower,
        upper = overall.random.ci.upper,
        tau2 = overall.heterogeneity.tau2,
        i2 = overall.heterogeneity.i2,
        subgroups = subgroups.len(),
        "analysis complete"
    );

    Ok(MetaAnalysis {
        options: options.clone(),
        studies: effects,
        overall,
        subgroups,
        subgroup_test,
        warnings,
    })
}
