//! Rule-based credit verification over a bureau snapshot.

mod config;
mod rules;

pub use config::{
    default_rules, RuleConfig, RuleOperator, RuleValue, DELINQUENCY_VARIABLE, MINIMUM_SCORE,
    RETIREE_VARIABLE, SCORE_VARIABLE, SOCIAL_TAX_REGIME_VARIABLE, SOCIOECONOMIC_TIER_VARIABLE,
};
pub use rules::{BureauVariable, VariableKind};

use rules::rule_passes;

use serde::{Deserialize, Serialize};

pub const APPROVED_REASON: &str = "All credit rules satisfied";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Approved,
    Rejected,
}

/// Verdict returned to the caller. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    pub score: i64,
    pub reason: String,
    pub failed_rules: Vec<String>,
}

impl VerificationResult {
    pub fn is_approved(&self) -> bool {
        self.status == VerificationStatus::Approved
    }
}

/// Stateless evaluator holding the rule set it applies.
#[derive(Debug, Clone)]
pub struct CreditVerifier {
    rules: Vec<RuleConfig>,
}

impl Default for CreditVerifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl CreditVerifier {
    pub fn new(rules: Vec<RuleConfig>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[RuleConfig] {
        &self.rules
    }

    pub fn verify(&self, variables: &[BureauVariable]) -> VerificationResult {
        evaluate(variables, &self.rules)
    }
}

/// Evaluate every rule independently; a missing variable counts as a failed rule.
pub fn evaluate(variables: &[BureauVariable], rules: &[RuleConfig]) -> VerificationResult {
    let find = |name: &str| variables.iter().find(|variable| variable.name == name);

    let score = find(SCORE_VARIABLE)
        .and_then(|variable| variable.value.trim().parse::<i64>().ok())
        .unwrap_or(0);

    let failed_rules: Vec<String> = rules
        .iter()
        .filter(|rule| {
            !find(&rule.variable)
                .map(|variable| rule_passes(rule, variable))
                .unwrap_or(false)
        })
        .map(|rule| rule.failure_message.clone())
        .collect();

    if failed_rules.is_empty() {
        VerificationResult {
            status: VerificationStatus::Approved,
            score,
            reason: APPROVED_REASON.to_string(),
            failed_rules,
        }
    } else {
        VerificationResult {
            status: VerificationStatus::Rejected,
            score,
            reason: failed_rules.join("; "),
            failed_rules,
        }
    }
}
