//! Subgroup partitioning and the test for subgroup differences.

use tracing::{info, warn};

use meta_model::{
    AnalysisOptions, AnalysisWarning, EffectEstimate, SubgroupOutcome, SubgroupResult,
    SubgroupTest, UNSPECIFIED_SUBGROUP,
};

use crate::distribution::chi_square_sf;
use crate::pooling::pool;

/// Subgroup results, the between-subgroup test, and warnings.
#[derive(Debug, Clone, Default)]
pub struct SubgroupAnalysis {
    pub subgroups: Vec<SubgroupResult>,
    pub test: Option<SubgroupTest>,
    pub warnings: Vec<AnalysisWarning>,
}

/// Partition effects by subgroup label.
///
/// Labels listed in `order` come first, in that order; remaining labels
/// follow in order of first appearance. Every effect lands in exactly one
/// partition. Effects without a label form their own partition, distinct
/// from any labelled one.
pub fn partition(
    effects: &[EffectEstimate],
    order: Option<&[String]>,
) -> Vec<(Option<String>, Vec<EffectEstimate>)> {
    let mut groups: Vec<(Option<String>, Vec<EffectEstimate>)> = Vec::new();
    if let Some(order) = order {
        for label in order {
            if !groups
                .iter()
                .any(|(existing, _)| existing.as_deref() == Some(label.as_str()))
            {
                groups.push((Some(label.clone()), Vec::new()));
            }
        }
    }
    for effect in effects {
        let key = &effect.subgroup_label;
        match groups.iter_mut().find(|(label, _)| label == key) {
            Some((_, members)) => members.push(effect.clone()),
            None => groups.push((key.clone(), vec![effect.clone()])),
        }
    }
    groups.retain(|(_, members)| !members.is_empty());
    groups
}

/// Cochran-style Q across pooled subgroup estimates.
///
/// Every pooled subgroup takes part, weighted by its unadjusted
/// random-effects standard error, which stays positive because
/// within-study variances are floored.
pub fn subgroup_difference_test(subgroups: &[SubgroupResult]) -> Option<SubgroupTest> {
    let estimates: Vec<(f64, f64)> = subgroups
        .iter()
        .filter_map(SubgroupResult::pooled)
        .map(|pooled| (pooled.random.estimate, pooled.random_se_unadjusted))
        .collect();
    if estimates.len() < 2 {
        return None;
    }
    let weights: Vec<f64> = estimates.iter().map(|(_, se)| 1.0 / (se * se)).collect();
    let total: f64 = weights.iter().sum();
    let mean = estimates
        .iter()
        .zip(&weights)
        .map(|((estimate, _), w)| w * estimate)
        .sum::<f64>()
        / total;
    let q: f64 = estimates
        .iter()
        .zip(&weights)
        .map(|((estimate, _), w)| w * (estimate - mean).powi(2))
        .sum();
    let df = estimates.len() - 1;
    Some(SubgroupTest {
        q,
        df,
        p_value: chi_square_sf(q, df as f64),
    })
}

/// Pool each subgroup independently and test for differences between them.
pub fn analyze_subgroups(effects: &[EffectEstimate], options: &AnalysisOptions) -> SubgroupAnalysis {
    let mut analysis = SubgroupAnalysis::default();
    for (label, studies) in partition(effects, options.subgroup_order.as_deref()) {
        let scope = label.as_deref().unwrap_or(UNSPECIFIED_SUBGROUP);
        let outcome = match pool(&studies, options, scope) {
            Ok(pooling) => {
                analysis.warnings.extend(pooling.warnings);
                SubgroupOutcome::Pooled(pooling.result)
            }
            Err(_) => {
                warn!(subgroup = scope, studies = studies.len(), "too few studies for a pooled subgroup estimate");
                analysis
                    .warnings
                    .push(AnalysisWarning::InsufficientSubgroupData {
                        subgroup: scope.to_string(),
                        studies: studies.len(),
                    });
                SubgroupOutcome::InsufficientSubgroupData
            }
        };
        analysis.subgroups.push(SubgroupResult {
            label,
            studies,
            outcome,
        });
    }
    analysis.test = subgroup_difference_test(&analysis.subgroups);
    if let Some(test) = &analysis.test {
        info!(q = test.q, df = test.df, p_value = test.p_value, "subgroup difference test");
    }
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use meta_model::ConfidenceInterval;

    fn effect(label: &str, group: Option<&str>) -> EffectEstimate {
        EffectEstimate {
            study_label: label.to_string(),
            subgroup_label: group.map(str::to_string),
            estimate: 1.0,
            standard_error: 1.0,
            variance: 1.0,
            ci: ConfidenceInterval::new(1.0, -1.0, 3.0, 0.95),
            weight_common: 0.0,
            weight_random: 0.0,
        }
    }

    fn labels(groups: &[(Option<String>, Vec<EffectEstimate>)]) -> Vec<Option<&str>> {
        groups.iter().map(|(label, _)| label.as_deref()).collect()
    }

    #[test]
    fn partition_keeps_first_appearance_order() {
        let effects = [
            effect("A", Some("Long")),
            effect("B", Some("Short")),
            effect("C", Some("Long")),
            effect("D", None),
        ];
        let groups = partition(&effects, None);
        assert_eq!(labels(&groups), vec![Some("Long"), Some("Short"), None]);
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn explicit_order_wins_and_unknown_labels_follow() {
        let effects = [
            effect("A", Some("Long")),
            effect("B", Some("Medium")),
            effect("C", Some("Short")),
        ];
        let order = vec!["Short".to_string(), "Long".to_string(), "Absent".to_string()];
        let groups = partition(&effects, Some(&order));
        assert_eq!(
            labels(&groups),
            vec![Some("Short"), Some("Long"), Some("Medium")]
        );
    }
}
