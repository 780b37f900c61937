//! Shared text for statistics footers.

use meta_model::{Heterogeneity, PooledEstimate, SubgroupTest};

/// Format a p-value, collapsing very small values to `p < 0.001`.
pub fn format_p(p: f64) -> String {
    if p < 0.001 {
        "p < 0.001".to_string()
    } else {
        format!("p = {p:.3}")
    }
}

/// Heterogeneity footer; tau² is included when `print_tau2` is set.
pub fn heterogeneity_line(het: &Heterogeneity, print_tau2: bool, decimals: usize) -> String {
    let mut parts = Vec::new();
    if print_tau2 {
        parts.push(format!("Tau² = {:.prec$}", het.tau2, prec = decimals + 2));
    }
    parts.push(format!(
        "Chi² = {:.prec$}, df = {} ({})",
        het.q,
        het.df,
        format_p(het.p_value),
        prec = decimals
    ));
    parts.push(format!("I² = {:.0}%", het.i2));
    format!("Heterogeneity: {}", parts.join("; "))
}

/// Test of the pooled effect against zero.
pub fn overall_test_line(pooled: &PooledEstimate, decimals: usize) -> String {
    let statistic = match pooled.df {
        Some(df) => format!("t = {:.prec$}, df = {df}", pooled.statistic, prec = decimals),
        None => format!("Z = {:.prec$}", pooled.statistic, prec = decimals),
    };
    format!(
        "Test for overall effect: {statistic} ({})",
        format_p(pooled.p_value)
    )
}

pub fn subgroup_test_line(test: &SubgroupTest, decimals: usize) -> String {
    format!(
        "Test for subgroup differences: Chi² = {:.prec$}, df = {} ({})",
        test.q,
        test.df,
        format_p(test.p_value),
        prec = decimals
    )
}

/// Weight percentage cell.
pub fn format_weight(weight: f64) -> String {
    format!("{weight:.1}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use meta_model::ConfidenceInterval;

    #[test]
    fn p_values() {
        assert_eq!(format_p(0.0004), "p < 0.001");
        assert_eq!(format_p(0.0412), "p = 0.041");
    }

    #[test]
    fn heterogeneity_footer() {
        let het = Heterogeneity {
            tau2: 2.5,
            tau: 2.5f64.sqrt(),
            q: 12.346,
            df: 5,
            p_value: 0.0304,
            i2: 59.7,
            h: 1.57,
        };
        insta::assert_snapshot!(
            heterogeneity_line(&het, true, 2),
            @"Heterogeneity: Tau² = 2.5000; Chi² = 12.35, df = 5 (p = 0.030); I² = 60%"
        );
        insta::assert_snapshot!(
            heterogeneity_line(&het, false, 2),
            @"Heterogeneity: Chi² = 12.35, df = 5 (p = 0.030); I² = 60%"
        );
    }

    #[test]
    fn overall_test_uses_t_when_df_present() {
        let pooled = PooledEstimate {
            estimate: 1.5,
            standard_error: 0.5,
            ci: ConfidenceInterval::new(1.5, 0.2, 2.8, 0.95),
            statistic: 3.0,
            p_value: 0.0300,
            df: Some(4),
        };
        insta::assert_snapshot!(
            overall_test_line(&pooled, 2),
            @"Test for overall effect: t = 3.00, df = 4 (p = 0.030)"
        );
        let normal = PooledEstimate { df: None, ..pooled };
        assert!(overall_test_line(&normal, 2).contains("Z = 3.00"));
    }
}
