use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{LoanRequestId, UserId};

pub const LOAN_REQUEST_ENTITY: &str = "loan_request";
pub const EXPIRATION_SWEEP_ENTITY: &str = "expiration_sweep";

/// Kinds of facts written to the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Approved,
    Rejected,
    SweepStarted,
    NoExpirations,
    ExpireOneStarted,
    ExpiredOne,
    SweepFinished,
    Error,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Approved => "approved",
            AuditAction::Rejected => "rejected",
            AuditAction::SweepStarted => "sweep_started",
            AuditAction::NoExpirations => "no_expirations",
            AuditAction::ExpireOneStarted => "expire_one_started",
            AuditAction::ExpiredOne => "expired_one",
            AuditAction::SweepFinished => "sweep_finished",
            AuditAction::Error => "error",
        }
    }
}

/// One recorded fact. The sink assigns the timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub actor: UserId,
    pub action: AuditAction,
    pub entity: String,
    pub entity_id: String,
    pub details: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_request_id: Option<LoanRequestId>,
}

impl AuditEvent {
    /// Event about a single loan request.
    pub fn for_request(
        actor: UserId,
        action: AuditAction,
        request_id: LoanRequestId,
        details: Value,
    ) -> Self {
        Self {
            actor,
            action,
            entity: LOAN_REQUEST_ENTITY.to_string(),
            entity_id: request_id.to_string(),
            details,
            loan_request_id: Some(request_id),
        }
    }

    /// Event about a sweep run as a whole, attributed to the system actor.
    pub fn for_sweep(action: AuditAction, details: Value) -> Self {
        Self {
            actor: UserId::SYSTEM,
            action,
            entity: EXPIRATION_SWEEP_ENTITY.to_string(),
            entity_id: "0".to_string(),
            details,
            loan_request_id: None,
        }
    }
}

/// Append-only audit port. Events are never read back by the engine.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}
