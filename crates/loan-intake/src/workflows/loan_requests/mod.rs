//! Initial loan request lifecycle: review decisions, expiration sweeps, notification fan-out,
//! audit trail and automated credit verification.

pub mod audit;
pub mod domain;
pub mod errors;
pub mod expiration;
pub mod notifications;
pub mod repository;
pub mod router;
pub mod service;
pub mod verification;

#[cfg(test)]
mod tests;

pub use audit::{AuditAction, AuditError, AuditEvent, AuditSink};
pub use domain::{
    Approver, ApproverRole, AttachedDocument, Client, ClientId, LoanRequest, LoanRequestDraft,
    LoanRequestId, LoanRequestStatus, Merchant, MerchantId, TransitionError, UserId,
};
pub use errors::{ErrorKind, LifecycleError, SweepError};
pub use expiration::{ExpirationSweep, SweepReport};
pub use notifications::{
    Notification, NotificationChannel, NotificationError, NotificationFanout, NotificationKind,
};
pub use repository::{
    AnalystDirectory, ClientDirectory, DirectoryError, ExpirationSettings, LoanRequestStore,
    MerchantDirectory, SettingsError, StaticExpirationSettings, StoreError,
};
pub use router::{loan_request_router, LoanRequestState, LoanRequestView};
pub use service::{LifecyclePorts, LoanLifecycleService, MIN_REJECTION_COMMENT_CHARS};
pub use verification::{
    default_rules, evaluate, BureauVariable, CreditVerifier, RuleConfig, RuleOperator, RuleValue,
    VariableKind, VerificationResult, VerificationStatus,
};
