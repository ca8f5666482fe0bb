use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::config::{RuleConfig, RuleOperator, RuleValue};

/// Declared type of a bureau variable. Values always arrive as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Integer,
    Decimal,
    Text,
    Boolean,
}

/// Named data point returned by the credit bureau.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BureauVariable {
    pub name: String,
    pub kind: VariableKind,
    pub value: String,
}

impl BureauVariable {
    pub fn new(name: impl Into<String>, kind: VariableKind, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: value.into(),
        }
    }
}

enum Operand<'a> {
    Int(i64),
    Decimal(f64),
    Text(&'a str),
}

fn coerce(variable: &BureauVariable) -> Option<Operand<'_>> {
    let raw = variable.value.trim();
    match variable.kind {
        VariableKind::Integer => raw.parse::<i64>().ok().map(Operand::Int),
        VariableKind::Decimal => raw
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Operand::Decimal),
        VariableKind::Text | VariableKind::Boolean => Some(Operand::Text(raw)),
    }
}

fn numeric_order(actual: &Operand<'_>, expected: &RuleValue) -> Option<Ordering> {
    match (actual, expected) {
        (Operand::Int(left), RuleValue::Int(right)) => Some(left.cmp(right)),
        (Operand::Int(left), RuleValue::Decimal(right)) => (*left as f64).partial_cmp(right),
        (Operand::Decimal(left), RuleValue::Int(right)) => left.partial_cmp(&(*right as f64)),
        (Operand::Decimal(left), RuleValue::Decimal(right)) => left.partial_cmp(right),
        _ => None,
    }
}

fn same_value(actual: &Operand<'_>, expected: &RuleValue) -> Option<bool> {
    match (actual, expected) {
        (Operand::Text(left), RuleValue::Text(right)) => Some(*left == right.trim()),
        (Operand::Int(_) | Operand::Decimal(_), RuleValue::Int(_) | RuleValue::Decimal(_)) => {
            numeric_order(actual, expected).map(|ordering| ordering == Ordering::Equal)
        }
        _ => None,
    }
}

fn set_membership(variable: &BureauVariable, expected: &RuleValue) -> Option<bool> {
    match expected {
        RuleValue::TextSet(allowed) => {
            let raw = variable.value.trim();
            Some(allowed.iter().any(|candidate| candidate.trim() == raw))
        }
        _ => None,
    }
}

/// Whether `variable` satisfies `rule`. Unparseable values and type mismatches never pass.
pub(crate) fn rule_passes(rule: &RuleConfig, variable: &BureauVariable) -> bool {
    let Some(actual) = coerce(variable) else {
        return false;
    };

    let outcome = match rule.operator {
        RuleOperator::GreaterThan => {
            numeric_order(&actual, &rule.value).map(|ordering| ordering == Ordering::Greater)
        }
        RuleOperator::LessThan => {
            numeric_order(&actual, &rule.value).map(|ordering| ordering == Ordering::Less)
        }
        RuleOperator::GreaterOrEqual => {
            numeric_order(&actual, &rule.value).map(|ordering| ordering != Ordering::Less)
        }
        RuleOperator::LessOrEqual => {
            numeric_order(&actual, &rule.value).map(|ordering| ordering != Ordering::Greater)
        }
        RuleOperator::Equal => same_value(&actual, &rule.value),
        RuleOperator::NotEqual => same_value(&actual, &rule.value).map(|equal| !equal),
        RuleOperator::In => set_membership(variable, &rule.value),
        RuleOperator::NotIn => set_membership(variable, &rule.value).map(|member| !member),
    };

    outcome.unwrap_or(false)
}
