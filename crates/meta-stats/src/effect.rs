//! Per-study effect sizes.

use tracing::warn;

use meta_model::{
    AnalysisOptions, AnalysisWarning, ConfidenceInterval, EffectEstimate, EffectMeasure,
    StudyRecord, VarianceModel,
};

use crate::distribution::normal_quantile;

/// Pooled two-sample variance, or `None` when it is undefined (n_t + n_c <= 2).
pub fn pooled_variance(record: &StudyRecord) -> Option<f64> {
    let n_t = f64::from(record.n_treatment);
    let n_c = f64::from(record.n_control);
    let df = n_t + n_c - 2.0;
    if df <= 0.0 {
        return None;
    }
    Some(((n_t - 1.0) * record.sd_treatment.powi(2) + (n_c - 1.0) * record.sd_control.powi(2)) / df)
}

fn mean_difference_variance(record: &StudyRecord, model: VarianceModel) -> f64 {
    let n_t = f64::from(record.n_treatment);
    let n_c = f64::from(record.n_control);
    let unpooled = record.sd_treatment.powi(2) / n_t + record.sd_control.powi(2) / n_c;
    match model {
        VarianceModel::Unpooled => unpooled,
        VarianceModel::Pooled => {
            pooled_variance(record).map_or(unpooled, |sp2| sp2 * (1.0 / n_t + 1.0 / n_c))
        }
    }
}

/// Hedges' g and its variance.
fn hedges_g(record: &StudyRecord) -> Result<(f64, f64), String> {
    let n_t = f64::from(record.n_treatment);
    let n_c = f64::from(record.n_control);
    let n = n_t + n_c;
    let sp2 = pooled_variance(record)
        .ok_or_else(|| "SMD requires more than two participants in total".to_string())?;
    if sp2 <= 0.0 {
        return Err("SMD requires a positive pooled standard deviation".to_string());
    }
    let d = record.mean_difference() / sp2.sqrt();
    let j = 1.0 - 3.0 / (4.0 * n - 9.0);
    let g = j * d;
    let variance = n / (n_t * n_c) + g * g / (2.0 * n);
    Ok((g, variance))
}

/// Outcome of converting records into effect estimates.
#[derive(Debug, Clone, Default)]
pub struct EffectSet {
    pub effects: Vec<EffectEstimate>,
    pub warnings: Vec<AnalysisWarning>,
}

/// Compute the effect estimate for one study. Weights are left at zero
/// until the study takes part in pooling.
pub fn compute_effect(
    record: &StudyRecord,
    options: &AnalysisOptions,
) -> Result<(EffectEstimate, bool), String> {
    let (estimate, raw_variance) = match options.effect_measure {
        EffectMeasure::Md => (
            record.mean_difference(),
            mean_difference_variance(record, options.variance_model),
        ),
        EffectMeasure::Smd => hedges_g(record)?,
    };
    let floored = raw_variance <= 0.0;
    let variance = if floored {
        options.min_variance
    } else {
        raw_variance
    };
    let standard_error = variance.sqrt();
    let z = normal_quantile(0.5 + options.confidence_level / 2.0);
    Ok((
        EffectEstimate {
            study_label: record.study_label.clone(),
            subgroup_label: record.subgroup_label.clone(),
            estimate,
            standard_error,
            variance,
            ci: ConfidenceInterval::new(
                estimate,
                estimate - z * standard_error,
                estimate + z * standard_error,
                options.confidence_level,
            ),
            weight_common: 0.0,
            weight_random: 0.0,
        },
        floored,
    ))
}

/// Compute effects for every record, in input order.
pub fn compute_effects(records: &[StudyRecord], options: &AnalysisOptions) -> EffectSet {
    let mut set = EffectSet::default();
    for record in records {
        match compute_effect(record, options) {
            Ok((effect, floored)) => {
                if floored {
                    warn!(study = %record.study_label, floor = options.min_variance, "zero within-study variance");
                    set.warnings.push(AnalysisWarning::ZeroVariance {
                        study: record.study_label.clone(),
                        floor: options.min_variance,
                    });
                }
                set.effects.push(effect);
            }
            Err(reason) => {
                warn!(study = %record.study_label, %reason, "record excluded");
                set.warnings.push(AnalysisWarning::ExcludedRecord {
                    study: record.study_label.clone(),
                    row: record.row,
                    reason,
                });
            }
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n_t: u32, m_t: f64, sd_t: f64, n_c: u32, m_c: f64, sd_c: f64) -> StudyRecord {
        StudyRecord {
            study_label: "S".to_string(),
            n_treatment: n_t,
            mean_treatment: m_t,
            sd_treatment: sd_t,
            n_control: n_c,
            mean_control: m_c,
            sd_control: sd_c,
            subgroup_label: None,
            row: 2,
        }
    }

    #[test]
    fn pooled_and_unpooled_agree_for_balanced_arms() {
        let r = record(50, 12.0, 3.0, 50, 10.0, 4.0);
        let pooled = mean_difference_variance(&r, VarianceModel::Pooled);
        let unpooled = mean_difference_variance(&r, VarianceModel::Unpooled);
        assert!((pooled - unpooled).abs() < 1e-12);
        assert!((unpooled - 0.5).abs() < 1e-12);
    }

    #[test]
    fn pooled_variance_weights_by_degrees_of_freedom() {
        let r = record(11, 0.0, 2.0, 21, 0.0, 1.0);
        let sp2 = pooled_variance(&r).unwrap();
        assert!((sp2 - (10.0 * 4.0 + 20.0) / 30.0).abs() < 1e-12);
    }

    #[test]
    fn mean_difference_with_normal_interval() {
        let r = record(50, 12.0, 3.0, 50, 10.0, 4.0);
        let (effect, floored) = compute_effect(&r, &AnalysisOptions::default()).unwrap();
        assert!(!floored);
        assert!((effect.estimate - 2.0).abs() < 1e-12);
        assert!((effect.standard_error - 0.5f64.sqrt()).abs() < 1e-12);
        let half_width = 1.959_963_984_540_054 * 0.5f64.sqrt();
        assert!((effect.ci.lower - (2.0 - half_width)).abs() < 1e-8);
        assert!((effect.ci.upper - (2.0 + half_width)).abs() < 1e-8);
    }

    #[test]
    fn hedges_g_applies_small_sample_correction() {
        let r = record(20, 12.0, 2.0, 20, 10.0, 2.0);
        let (g, variance) = hedges_g(&r).unwrap();
        let j = 1.0 - 3.0 / (4.0 * 40.0 - 9.0);
        assert!((g - j).abs() < 1e-12);
        assert!((variance - (40.0 / 400.0 + g * g / 80.0)).abs() < 1e-12);
    }

    #[test]
    fn zero_sd_is_floored() {
        let r = record(10, 1.0, 0.0, 10, 0.0, 0.0);
        let (effect, floored) = compute_effect(&r, &AnalysisOptions::default()).unwrap();
        assert!(floored);
        assert_eq!(effect.variance, AnalysisOptions::default().min_variance);
    }

    #[test]
    fn largest_arm_sizes_do_not_overflow() {
        let r = record(u32::MAX, 12.0, 3.0, u32::MAX, 10.0, 3.0);
        let (effect, _) = compute_effect(&r, &AnalysisOptions::default()).unwrap();
        assert!((effect.estimate - 2.0).abs() < 1e-12);
        assert!(effect.variance.is_finite() && effect.variance > 0.0);
    }

    #[test]
    fn smd_with_zero_sd_is_excluded() {
        let options = AnalysisOptions::new().with_effect_measure(EffectMeasure::Smd);
        let set = compute_effects(&[record(10, 1.0, 0.0, 10, 0.0, 0.0)], &options);
        assert!(set.effects.is_empty());
        assert!(matches!(
            set.warnings[0],
            AnalysisWarning::ExcludedRecord { ref study, row: 2, .. } if study == "S"
        ));
    }
}
