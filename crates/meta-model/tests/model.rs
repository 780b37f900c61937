use meta_model::{
    AnalysisOptions, AnalysisWarning, ConfidenceInterval, EffectEstimate, MetaError,
    SubgroupOutcome, SubgroupResult, TauEstimator,
};

fn estimate(label: &str) -> EffectEstimate {
    EffectEstimate {
        study_label: label.to_string(),
        subgroup_label: Some("Short".to_string()),
        estimate: 1.0,
        standard_error: 0.2,
        variance: 0.04,
        ci: ConfidenceInterval::new(1.0, 0.6, 1.4, 0.95),
        weight_common: 50.0,
        weight_random: 50.0,
    }
}

#[test]
fn default_options_validate() {
    let options = AnalysisOptions::default();
    assert!(options.validate().is_ok());
    assert!(options.hartung_knapp);
    assert_eq!(options.tau_estimator, TauEstimator::Reml);
}

#[test]
fn confidence_level_out_of_range_is_rejected() {
    let options = AnalysisOptions::new().with_confidence_level(1.5);
    let err = options.validate().unwrap_err();
    assert!(matches!(
        err,
        MetaError::InvalidOption {
            name: "confidence_level",
            ..
        }
    ));
}

#[test]
fn insufficient_subgroup_has_no_pooled_result() {
    let subgroup = SubgroupResult {
        label: Some("Long".to_string()),
        studies: vec![estimate("A")],
        outcome: SubgroupOutcome::InsufficientSubgroupData,
    };
    assert!(subgroup.pooled().is_none());
    assert_eq!(subgroup.study_count(), 1);
    assert_eq!(subgroup.display_label(), "Long");

    let unlabelled = SubgroupResult {
        label: None,
        ..subgroup
    };
    assert_eq!(unlabelled.display_label(), "Unspecified");
}

#[test]
fn warnings_serialize_with_kind_tag() {
    let warning = AnalysisWarning::InsufficientSubgroupData {
        subgroup: "Long".to_string(),
        studies: 1,
    };
    let json = serde_json::to_value(&warning).expect("serialize warning");
    assert_eq!(json["kind"], "insufficient_subgroup_data");
    assert_eq!(json["subgroup"], "Long");
    assert_eq!(
        warning.to_string(),
        "subgroup Long: 1 study is too few for a pooled estimate"
    );
}

#[test]
fn insufficient_data_message() {
    let err = MetaError::InsufficientData { available: 1 };
    assert_eq!(
        err.to_string(),
        "insufficient data: 1 valid studies, at least 2 required"
    );
}
