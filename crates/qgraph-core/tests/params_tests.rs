//! Integration tests for training parameters
//! Complements the inline unit tests in src/params.rs

use qgraph_core::{QGraphError, TrainingParams, UpdateRule};

#[test]
fn test_params_from_partial_toml() {
    let params: TrainingParams = toml::from_str(
        r#"
alpha = 0.25
episodes = 500
"#,
    )
    .unwrap();

    assert_eq!(params.alpha, 0.25);
    assert_eq!(params.episodes, 500);
    // Unspecified keys fall back to defaults
    assert_eq!(params.gamma, 0.9);
    assert_eq!(params.max_steps_per_episode, 1000);
    assert_eq!(params.update_rule, UpdateRule::EstimatedValue);
}

#[test]
fn test_params_update_rule_from_toml() {
    let params: TrainingParams = toml::from_str(r#"update_rule = "raw_q_value""#).unwrap();
    assert_eq!(params.update_rule, UpdateRule::RawQValue);
}

#[test]
fn test_params_unknown_update_rule_rejected() {
    let result: Result<TrainingParams, _> = toml::from_str(r#"update_rule = "sarsa""#);
    assert!(result.is_err());
}

#[test]
fn test_params_json_roundtrip_through_apply() {
    let original = TrainingParams::default()
        .with_alpha(0.3)
        .with_gamma(0.5)
        .with_episodes(42)
        .with_max_steps(7)
        .with_warnings(false)
        .with_update_rule(UpdateRule::RawQValue);

    let mut restored = TrainingParams::default();
    restored.apply_json(&original.to_json()).unwrap();

    assert_eq!(restored, original);
}

#[test]
fn test_params_validate_rejects_negative_epsilon() {
    let params = TrainingParams {
        probability_epsilon: -0.1,
        ..TrainingParams::default()
    };

    assert!(matches!(
        params.validate(),
        Err(QGraphError::InvalidParams(_))
    ));
}

#[test]
fn test_params_builder_chain() {
    let params = TrainingParams::default().with_alpha(1.0).with_gamma(0.0);
    assert!(params.validate().is_ok());

    let params = params.with_alpha(1.01);
    assert!(params.validate().is_err());
}
