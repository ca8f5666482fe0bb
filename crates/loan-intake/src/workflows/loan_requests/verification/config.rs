use serde::{Deserialize, Serialize};

pub const SCORE_VARIABLE: &str = "SCO_Vig";
pub const DELINQUENCY_VARIABLE: &str = "MOR_Vig";
pub const SOCIOECONOMIC_TIER_VARIABLE: &str = "NSE_Vig";
pub const RETIREE_VARIABLE: &str = "JUB_Vig";
pub const SOCIAL_TAX_REGIME_VARIABLE: &str = "MTS_Vig";

pub const MINIMUM_SCORE: i64 = 600;

/// Comparison applied between a bureau variable and the configured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleOperator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not_in", alias = "not-in")]
    NotIn,
}

impl RuleOperator {
    pub const fn symbol(self) -> &'static str {
        match self {
            RuleOperator::GreaterThan => ">",
            RuleOperator::LessThan => "<",
            RuleOperator::GreaterOrEqual => ">=",
            RuleOperator::LessOrEqual => "<=",
            RuleOperator::Equal => "==",
            RuleOperator::NotEqual => "!=",
            RuleOperator::In => "in",
            RuleOperator::NotIn => "not_in",
        }
    }
}

/// Typed comparison value. The variant should match the declared kind of the variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RuleValue {
    Int(i64),
    Decimal(f64),
    Text(String),
    TextSet(Vec<String>),
}

/// One verification rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub variable: String,
    pub operator: RuleOperator,
    pub value: RuleValue,
    pub failure_message: String,
}

impl RuleConfig {
    pub fn new(
        variable: impl Into<String>,
        operator: RuleOperator,
        value: RuleValue,
        failure_message: impl Into<String>,
    ) -> Self {
        Self {
            variable: variable.into(),
            operator,
            value,
            failure_message: failure_message.into(),
        }
    }
}

/// Built-in rule set applied when the caller supplies none.
pub fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig::new(
            SCORE_VARIABLE,
            RuleOperator::GreaterOrEqual,
            RuleValue::Int(MINIMUM_SCORE),
            format!("Credit score below the minimum of {MINIMUM_SCORE}"),
        ),
        RuleConfig::new(
            DELINQUENCY_VARIABLE,
            RuleOperator::Equal,
            RuleValue::Text("N".to_string()),
            "Applicant reports current delinquencies",
        ),
        RuleConfig::new(
            SOCIOECONOMIC_TIER_VARIABLE,
            RuleOperator::In,
            RuleValue::TextSet(vec![
                "ABC1".to_string(),
                "C2".to_string(),
                "C3".to_string(),
            ]),
            "Socioeconomic tier outside the accepted range",
        ),
        RuleConfig::new(
            RETIREE_VARIABLE,
            RuleOperator::Equal,
            RuleValue::Text("N".to_string()),
            "Retired applicants are not eligible for this product",
        ),
        RuleConfig::new(
            SOCIAL_TAX_REGIME_VARIABLE,
            RuleOperator::NotEqual,
            RuleValue::Text("S".to_string()),
            "Applicants under the social tax regime are not eligible",
        ),
    ]
}
