use serde::Serialize;

use super::audit::AuditError;
use super::domain::{ClientId, LoanRequestId, TransitionError};
use super::notifications::NotificationError;
use super::repository::{DirectoryError, SettingsError, StoreError};

/// Caller-facing classification of lifecycle failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvalidInput,
    DependencyFailure,
    SweepFailure,
}

/// Error raised by create/approve/reject.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("loan request {0} not found")]
    RequestNotFound(LoanRequestId),
    #[error(transparent)]
    InvalidState(#[from] TransitionError),
    #[error("rejection comment must contain at least {min_chars} characters")]
    InvalidComment { min_chars: usize },
    #[error("client DNI is required")]
    MissingClientDni,
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::RequestNotFound(_) => ErrorKind::NotFound,
            LifecycleError::InvalidState(_) => ErrorKind::InvalidState,
            LifecycleError::InvalidComment { .. } | LifecycleError::MissingClientDni => {
                ErrorKind::InvalidInput
            }
            LifecycleError::Store(_) | LifecycleError::Audit(_) => ErrorKind::DependencyFailure,
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => LifecycleError::RequestNotFound(id),
            other => LifecycleError::Store(other),
        }
    }
}

/// Error that aborted an expiration sweep run.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Audit(#[from] AuditError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("client {client_id} for loan request {request_id} not found")]
    ClientNotFound {
        client_id: ClientId,
        request_id: LoanRequestId,
    },
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}

impl SweepError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::SweepFailure
    }
}
