use crate::workflows::loan_requests::verification::{
    default_rules, evaluate, BureauVariable, CreditVerifier, RuleConfig, RuleOperator, RuleValue,
    VariableKind, VerificationStatus, APPROVED_REASON, DELINQUENCY_VARIABLE, RETIREE_VARIABLE,
    SCORE_VARIABLE, SOCIAL_TAX_REGIME_VARIABLE, SOCIOECONOMIC_TIER_VARIABLE,
};

fn healthy_snapshot() -> Vec<BureauVariable> {
    vec![
        BureauVariable::new(SCORE_VARIABLE, VariableKind::Integer, "712"),
        BureauVariable::new(DELINQUENCY_VARIABLE, VariableKind::Boolean, "N"),
        BureauVariable::new(SOCIOECONOMIC_TIER_VARIABLE, VariableKind::Text, "C2"),
        BureauVariable::new(RETIREE_VARIABLE, VariableKind::Boolean, "N"),
        BureauVariable::new(SOCIAL_TAX_REGIME_VARIABLE, VariableKind::Boolean, "N"),
    ]
}

#[test]
fn satisfied_rules_approve_with_fixed_reason() {
    let result = CreditVerifier::default().verify(&healthy_snapshot());

    assert_eq!(result.status, VerificationStatus::Approved);
    assert!(result.is_approved());
    assert_eq!(result.score, 712);
    assert_eq!(result.reason, APPROVED_REASON);
    assert!(result.failed_rules.is_empty());
}

#[test]
fn low_score_alone_rejects_with_defaults() {
    let variables = vec![BureauVariable::new(
        SCORE_VARIABLE,
        VariableKind::Integer,
        "450",
    )];

    let result = evaluate(&variables, &default_rules());

    assert_eq!(result.status, VerificationStatus::Rejected);
    assert!(!result.is_approved());
    assert_eq!(result.score, 450);
    let expected: Vec<String> = default_rules()
        .into_iter()
        .map(|rule| rule.failure_message)
        .collect();
    assert_eq!(result.failed_rules, expected);
    assert_eq!(result.reason, expected.join("; "));
}

#[test]
fn missing_variable_fails_its_rule_only() {
    let mut variables = healthy_snapshot();
    variables.retain(|variable| variable.name != RETIREE_VARIABLE);

    let result = CreditVerifier::default().verify(&variables);

    assert_eq!(result.status, VerificationStatus::Rejected);
    assert_eq!(
        result.failed_rules,
        vec!["Retired applicants are not eligible for this product".to_string()]
    );
}

#[test]
fn absent_or_garbled_score_defaults_to_zero() {
    let result = evaluate(&[], &[]);
    assert_eq!(result.score, 0);
    assert_eq!(result.status, VerificationStatus::Approved);

    let garbled = vec![BureauVariable::new(SCORE_VARIABLE, VariableKind::Integer, "7x")];
    let result = CreditVerifier::default().verify(&garbled);
    assert_eq!(result.score, 0);
    assert!(result
        .failed_rules
        .iter()
        .any(|message| message.starts_with("Credit score below")));
}

#[test]
fn failures_are_reported_in_rule_order() {
    let rules = vec![
        RuleConfig::new(
            "INC_Vig",
            RuleOperator::GreaterThan,
            RuleValue::Decimal(1500.0),
            "income too low",
        ),
        RuleConfig::new(
            "PRV_Vig",
            RuleOperator::NotIn,
            RuleValue::TextSet(vec!["TDF".to_string()]),
            "province excluded",
        ),
        RuleConfig::new(
            "AGE_Vig",
            RuleOperator::LessOrEqual,
            RuleValue::Int(75),
            "applicant too old",
        ),
    ];
    let variables = vec![
        BureauVariable::new("AGE_Vig", VariableKind::Integer, "80"),
        BureauVariable::new("PRV_Vig", VariableKind::Text, "TDF"),
        BureauVariable::new("INC_Vig", VariableKind::Decimal, "1200.50"),
    ];

    let result = evaluate(&variables, &rules);

    assert_eq!(
        result.failed_rules,
        vec![
            "income too low".to_string(),
            "province excluded".to_string(),
            "applicant too old".to_string(),
        ]
    );
    assert_eq!(
        result.reason,
        "income too low; province excluded; applicant too old"
    );
}

#[test]
fn evaluation_is_deterministic() {
    let variables = vec![
        BureauVariable::new(SCORE_VARIABLE, VariableKind::Integer, "650"),
        BureauVariable::new(DELINQUENCY_VARIABLE, VariableKind::Boolean, "S"),
    ];
    let verifier = CreditVerifier::default();

    assert_eq!(verifier.verify(&variables), verifier.verify(&variables));
}

#[test]
fn rule_configs_deserialize_from_json() {
    let raw = r#"[
        {"variable": "SCO_Vig", "operator": ">=", "value": {"type": "int", "value": 700},
         "failure_message": "score"},
        {"variable": "NSE_Vig", "operator": "not-in", "value": {"type": "text_set", "value": ["E"]},
         "failure_message": "tier"}
    ]"#;

    let rules: Vec<RuleConfig> = serde_json::from_str(raw).expect("rules parse");

    assert_eq!(rules[0].operator, RuleOperator::GreaterOrEqual);
    assert_eq!(rules[0].value, RuleValue::Int(700));
    assert_eq!(rules[1].operator, RuleOperator::NotIn);
    assert_eq!(rules[1].value, RuleValue::TextSet(vec!["E".to_string()]));
}
