//! Inverse-variance pooling under common-effect and random-effects models.

use tracing::{debug, debug_span, warn};

use meta_model::{
    AnalysisOptions, AnalysisWarning, ConfidenceInterval, EffectEstimate, Heterogeneity,
    MetaError, PooledEstimate, PooledResult, Result, TauEstimator,
};

use crate::distribution::{
    chi_square_sf, normal_quantile, normal_two_sided_p, student_t_quantile,
    student_t_two_sided_p,
};
use crate::tau::{TauEstimate, cochran_q, dersimonian_laird, reml, weighted_mean};

/// Pooled result plus any warnings raised while estimating it.
#[derive(Debug, Clone)]
pub struct Pooling {
    pub result: PooledResult,
    pub warnings: Vec<AnalysisWarning>,
}

fn statistic(estimate: f64, standard_error: f64) -> f64 {
    if standard_error > 0.0 {
        estimate / standard_error
    } else if estimate == 0.0 {
        0.0
    } else {
        estimate.signum() * f64::INFINITY
    }
}

fn normal_estimate(estimate: f64, standard_error: f64, level: f64) -> PooledEstimate {
    let z = normal_quantile(0.5 + level / 2.0);
    let stat = statistic(estimate, standard_error);
    PooledEstimate {
        estimate,
        standard_error,
        ci: ConfidenceInterval::new(
            estimate,
            estimate - z * standard_error,
            estimate + z * standard_error,
            level,
        ),
        statistic: stat,
        p_value: normal_two_sided_p(stat),
        df: None,
    }
}

fn t_estimate(estimate: f64, standard_error: f64, df: usize, level: f64) -> PooledEstimate {
    let t = student_t_quantile(0.5 + level / 2.0, df as f64);
    let stat = statistic(estimate, standard_error);
    PooledEstimate {
        estimate,
        standard_error,
        ci: ConfidenceInterval::new(
            estimate,
            estimate - t * standard_error,
            estimate + t * standard_error,
            level,
        ),
        statistic: stat,
        p_value: student_t_two_sided_p(stat, df as f64),
        df: Some(df),
    }
}

fn heterogeneity(effects: &[f64], variances: &[f64], tau2: f64) -> Heterogeneity {
    let df = effects.len() - 1;
    let q = cochran_q(effects, variances);
    let i2 = if q > 0.0 {
        ((q - df as f64) / q).max(0.0) * 100.0
    } else {
        0.0
    };
    Heterogeneity {
        tau2,
        tau: tau2.sqrt(),
        q,
        df,
        p_value: chi_square_sf(q, df as f64),
        i2: i2.clamp(0.0, 100.0),
        h: (q / df as f64).sqrt(),
    }
}

fn estimate_tau2(effects: &[f64], variances: &[f64], options: &AnalysisOptions) -> TauEstimate {
    match options.tau_estimator {
        TauEstimator::Reml => reml(
            effects,
            variances,
            options.reml_max_iterations,
            options.reml_tolerance,
        ),
        TauEstimator::DerSimonianLaird => TauEstimate {
            tau2: dersimonian_laird(effects, variances),
            convergence: None,
        },
    }
}

/// Pool a set of study effects.
///
/// `scope` names the set in warnings ("overall" or a subgroup label).
pub fn pool(effects: &[EffectEstimate], options: &AnalysisOptions, scope: &str) -> Result<Pooling> {
    let k = effects.len();
    if k < 2 {
        return Err(MetaError::InsufficientData { available: k });
    }
    let span = debug_span!("pool", scope, studies = k);
    let _guard = span.enter();
    let y: Vec<f64> = effects.iter().map(|effect| effect.estimate).collect();
    let v: Vec<f64> = effects.iter().map(|effect| effect.variance).collect();
    let level = options.confidence_level;
    let mut warnings = Vec::new();

    let (common_mean, common_w) = weighted_mean(&y, &v, 0.0);
    let common = normal_estimate(common_mean, (1.0 / common_w).sqrt(), level);

    let tau = estimate_tau2(&y, &v, options);
    if let Some(convergence) = tau.convergence.filter(|c| !c.converged) {
        warn!(
            scope,
            iterations = convergence.iterations,
            tau2 = tau.tau2,
            "REML did not converge, using last iterate"
        );
        warnings.push(AnalysisWarning::NonConvergence {
            scope: scope.to_string(),
            iterations: convergence.iterations,
            tau2: tau.tau2,
        });
    }
    let tau2 = tau.tau2;

    let (random_mean, random_w) = weighted_mean(&y, &v, tau2);
    let classic_se = (1.0 / random_w).sqrt();
    let random = if options.hartung_knapp {
        let mut scale = y
            .iter()
            .zip(&v)
            .map(|(yi, vi)| (yi - random_mean).powi(2) / (vi + tau2))
            .sum::<f64>()
            / (k - 1) as f64;
        if options.hk_variance_floor {
            scale = scale.max(1.0);
        }
        t_estimate(random_mean, (scale / random_w).sqrt(), k - 1, level)
    } else {
        normal_estimate(random_mean, classic_se, level)
    };

    let prediction = (options.prediction_interval && k >= 3).then(|| {
        let t = student_t_quantile(0.5 + level / 2.0, (k - 2) as f64);
        let half = t * (tau2 + classic_se * classic_se).sqrt();
        ConfidenceInterval::new(random_mean, random_mean - half, random_mean + half, level)
    });

    let result = PooledResult {
        study_count: k,
        common,
        random,
        random_se_unadjusted: classic_se,
        heterogeneity: heterogeneity(&y, &v, tau2),
        prediction,
        convergence: tau.convergence,
        hartung_knapp: options.hartung_knapp,
    };
    debug!(
        scope,
        studies = k,
        estimate = result.random.estimate,
        tau2,
        i2 = result.heterogeneity.i2,
        "pooled"
    );
    Ok(Pooling { result, warnings })
}

/// Assign common and random weights (as percentages) for the given tau².
pub fn assign_weights(effects: &mut [EffectEstimate], tau2: f64) {
    let common_total: f64 = effects.iter().map(|effect| 1.0 / effect.variance).sum();
    let random_total: f64 = effects
        .iter()
        .map(|effect| 1.0 / (effect.variance + tau2))
        .sum();
    for effect in effects.iter_mut() {
        effect.weight_common = 100.0 / effect.variance / common_total;
        effect.weight_random = 100.0 / (effect.variance + tau2) / random_total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effect(label: &str, estimate: f64, variance: f64) -> EffectEstimate {
        EffectEstimate {
            study_label: label.to_string(),
            subgroup_label: None,
            estimate,
            standard_error: variance.sqrt(),
            variance,
            ci: ConfidenceInterval::new(estimate, estimate, estimate, 0.95),
            weight_common: 0.0,
            weight_random: 0.0,
        }
    }

    #[test]
    fn single_study_is_insufficient() {
        let err = pool(&[effect("A", 1.0, 0.1)], &AnalysisOptions::default(), "overall")
            .unwrap_err();
        assert!(matches!(err, MetaError::InsufficientData { available: 1 }));
    }

    #[test]
    fn common_effect_is_inverse_variance_mean() {
        let effects = [effect("A", 1.0, 1.0), effect("B", 3.0, 1.0)];
        let pooled = pool(&effects, &AnalysisOptions::default(), "overall").unwrap();
        assert!((pooled.result.common.estimate - 2.0).abs() < 1e-12);
        assert!((pooled.result.common.standard_error - 0.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(pooled.result.heterogeneity.df, 1);
        assert!((pooled.result.heterogeneity.q - 2.0).abs() < 1e-12);
        assert!((pooled.result.heterogeneity.i2 - 50.0).abs() < 1e-9);
    }

    #[test]
    fn weights_sum_to_one_hundred() {
        let mut effects = vec![
            effect("A", 1.0, 0.5),
            effect("B", 2.0, 1.0),
            effect("C", 4.0, 2.0),
        ];
        assign_weights(&mut effects, 0.7);
        let common: f64 = effects.iter().map(|e| e.weight_common).sum();
        let random: f64 = effects.iter().map(|e| e.weight_random).sum();
        assert!((common - 100.0).abs() < 1e-9);
        assert!((random - 100.0).abs() < 1e-9);
        assert!(effects[0].weight_common > effects[0].weight_random);
    }

    #[test]
    fn prediction_interval_requires_three_studies() {
        let options = AnalysisOptions::new().with_prediction_interval(true);
        let two = [effect("A", 1.0, 1.0), effect("B", 3.0, 1.0)];
        assert!(pool(&two, &options, "overall").unwrap().result.prediction.is_none());
        let three = [
            effect("A", 1.0, 1.0),
            effect("B", 3.0, 1.0),
            effect("C", 2.0, 1.0),
        ];
        let pooled = pool(&three, &options, "overall").unwrap().result;
        let prediction = pooled.prediction.unwrap();
        assert!(prediction.width() > 0.0);
        assert!(prediction.contains(pooled.random.estimate));
    }

    #[test]
    fn hartung_knapp_uses_t_degrees_of_freedom() {
        let effects = [
            effect("A", 1.0, 1.0),
            effect("B", 3.0, 1.0),
            effect("C", 2.0, 1.0),
        ];
        let pooled = pool(&effects, &AnalysisOptions::default(), "overall").unwrap();
        assert_eq!(pooled.result.random.df, Some(2));
        let without = pool(
            &effects,
            &AnalysisOptions::new().with_hartung_knapp(false),
            "overall",
        )
        .unwrap();
        assert_eq!(without.result.random.df, None);
        assert!(pooled.result.random.ci.width() > without.result.random.ci.width());
    }
}
