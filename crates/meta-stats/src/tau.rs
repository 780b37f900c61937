//! Between-study variance (tau²) estimators.

use tracing::{debug, trace};

use meta_model::Convergence;

const MAX_STEP_HALVINGS: usize = 30;

/// Weighted mean and sum of weights for `w_i = 1 / (v_i + tau2)`.
pub(crate) fn weighted_mean(effects: &[f64], variances: &[f64], tau2: f64) -> (f64, f64) {
    let mut sum_w = 0.0;
    let mut sum_wy = 0.0;
    for (y, v) in effects.iter().zip(variances) {
        let w = 1.0 / (v + tau2);
        sum_w += w;
        sum_wy += w * y;
    }
    (sum_wy / sum_w, sum_w)
}

/// Cochran's Q with inverse-variance weights.
pub fn cochran_q(effects: &[f64], variances: &[f64]) -> f64 {
    let (mean, _) = weighted_mean(effects, variances, 0.0);
    effects
        .iter()
        .zip(variances)
        .map(|(y, v)| (y - mean).powi(2) / v)
        .sum()
}

/// DerSimonian-Laird moment estimator, clamped at zero.
pub fn dersimonian_laird(effects: &[f64], variances: &[f64]) -> f64 {
    let k = effects.len();
    if k < 2 {
        return 0.0;
    }
    let q = cochran_q(effects, variances);
    let sum_w: f64 = variances.iter().map(|v| 1.0 / v).sum();
    let sum_w2: f64 = variances.iter().map(|v| 1.0 / (v * v)).sum();
    let c = sum_w - sum_w2 / sum_w;
    if c <= 0.0 {
        return 0.0;
    }
    ((q - (k - 1) as f64) / c).max(0.0)
}

/// Result of an iterative tau² estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TauEstimate {
    pub tau2: f64,
    pub convergence: Option<Convergence>,
}

/// Apply `P = W - w wᵀ / Σw` to `x`.
fn project(weights: &[f64], sum_w: f64, x: &[f64]) -> Vec<f64> {
    let wx: f64 = weights.iter().zip(x).map(|(w, xi)| w * xi).sum();
    weights
        .iter()
        .zip(x)
        .map(|(w, xi)| w * xi - w * wx / sum_w)
        .collect()
}

/// Restricted log-likelihood, up to a constant.
fn restricted_log_likelihood(effects: &[f64], variances: &[f64], tau2: f64) -> f64 {
    let (mean, sum_w) = weighted_mean(effects, variances, tau2);
    let mut total = sum_w.ln();
    for (y, v) in effects.iter().zip(variances) {
        total += (v + tau2).ln() + (y - mean).powi(2) / (v + tau2);
    }
    -0.5 * total
}

/// First derivative of the restricted log-likelihood and the curvature
/// used for the Newton step: observed information when positive, expected
/// information `tr(P²) / 2` otherwise.
fn restricted_score(effects: &[f64], variances: &[f64], tau2: f64) -> (f64, f64) {
    let weights: Vec<f64> = variances.iter().map(|v| 1.0 / (v + tau2)).collect();
    let sum_w: f64 = weights.iter().sum();
    let sum_w2: f64 = weights.iter().map(|w| w * w).sum();
    let sum_w3: f64 = weights.iter().map(|w| w * w * w).sum();
    let trace_p = sum_w - sum_w2 / sum_w;
    let trace_p2 = sum_w2 - 2.0 * sum_w3 / sum_w + (sum_w2 / sum_w).powi(2);

    let py = project(&weights, sum_w, effects);
    let p2y = project(&weights, sum_w, &py);
    let ypy2: f64 = py.iter().map(|x| x * x).sum();
    let ypy3: f64 = py.iter().zip(&p2y).map(|(a, b)| a * b).sum();

    let score = 0.5 * (ypy2 - trace_p);
    let observed = ypy3 - 0.5 * trace_p2;
    let information = if observed > 0.0 {
        observed
    } else {
        0.5 * trace_p2
    };
    (score, information)
}

/// Whether the likelihood is maximised on the boundary rather than at `tau2`.
fn boundary_is_better(effects: &[f64], variances: &[f64], tau2: f64) -> bool {
    let (boundary_score, _) = restricted_score(effects, variances, 0.0);
    boundary_score <= 0.0
        && restricted_log_likelihood(effects, variances, 0.0)
            >= restricted_log_likelihood(effects, variances, tau2)
}

/// Restricted maximum likelihood estimate by Newton-Raphson with step halving.
///
/// Starts at the DerSimonian-Laird value. Steps are halved until the
/// restricted likelihood does not decrease and tau² stays non-negative.
/// When the score at zero is non-positive and a step would cross it, or the
/// converged value is no better than zero, the estimate is zero. When
/// `max_iterations` is reached the last iterate is returned with
/// `converged = false`.
pub fn reml(
    effects: &[f64],
    variances: &[f64],
    max_iterations: usize,
    tolerance: f64,
) -> TauEstimate {
    let converged = |tau2: f64, iterations: usize| {
        debug!(iterations, tau2, "reml converged");
        TauEstimate {
            tau2,
            convergence: Some(Convergence {
                iterations,
                converged: true,
            }),
        }
    };
    let mut tau2 = dersimonian_laird(effects, variances);
    for iteration in 1..=max_iterations {
        let (score, information) = restricted_score(effects, variances, tau2);
        let mut step = score / information;
        if tau2 + step < 0.0 {
            let (boundary_score, _) = restricted_score(effects, variances, 0.0);
            if boundary_score <= 0.0 {
                return converged(0.0, iteration);
            }
            while tau2 + step < 0.0 {
                step /= 2.0;
            }
        }
        let current = restricted_log_likelihood(effects, variances, tau2);
        let mut halvings = 0;
        while halvings < MAX_STEP_HALVINGS
            && restricted_log_likelihood(effects, variances, tau2 + step) < current
        {
            step /= 2.0;
            halvings += 1;
        }
        let next = tau2 + step;
        trace!(iteration, tau2 = next, score, halvings, "reml iterate");
        tau2 = next;
        if step.abs() < tolerance {
            if tau2 > 0.0 && boundary_is_better(effects, variances, tau2) {
                return converged(0.0, iteration);
            }
            return converged(tau2, iteration);
        }
    }
    TauEstimate {
        tau2,
        convergence: Some(Convergence {
            iterations: max_iterations,
            converged: false,
        }),
    }
}
