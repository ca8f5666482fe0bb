use async_trait::async_trait;

use super::domain::{
    Client, ClientId, LoanRequest, LoanRequestDraft, LoanRequestId, LoanRequestStatus, Merchant,
    MerchantId, UserId,
};

/// Storage abstraction owning loan request records.
///
/// `update` is a compare-and-swap: it must only succeed while the stored status still equals
/// `expected`, so two reviewers racing on the same pending request cannot both win.
#[async_trait]
pub trait LoanRequestStore: Send + Sync {
    /// Assign an id and creation timestamp, then persist the new pending request.
    async fn insert(&self, draft: LoanRequestDraft) -> Result<LoanRequest, StoreError>;

    async fn get_by_id(&self, id: LoanRequestId) -> Result<Option<LoanRequest>, StoreError>;

    async fn update(
        &self,
        request: LoanRequest,
        expected: LoanRequestStatus,
    ) -> Result<LoanRequest, StoreError>;

    /// Pending requests created at least `threshold_days` days ago, in creation order.
    async fn find_eligible_for_expiration(
        &self,
        threshold_days: u32,
    ) -> Result<Vec<LoanRequest>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("loan request {0} not found")]
    NotFound(LoanRequestId),
    #[error("loan request {id} changed concurrently (expected {expected}, found {actual})")]
    StatusConflict {
        id: LoanRequestId,
        expected: LoanRequestStatus,
        actual: LoanRequestStatus,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Source of the expiration threshold.
#[async_trait]
pub trait ExpirationSettings: Send + Sync {
    async fn expiration_days(&self) -> Result<u32, SettingsError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("expiration threshold unavailable: {0}")]
    Unavailable(String),
    #[error("expiration threshold must be positive")]
    NonPositive,
}

/// Fixed threshold, typically built from [`crate::config::LifecycleConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticExpirationSettings {
    days: u32,
}

impl StaticExpirationSettings {
    pub fn new(days: u32) -> Self {
        Self { days }
    }
}

#[async_trait]
impl ExpirationSettings for StaticExpirationSettings {
    async fn expiration_days(&self) -> Result<u32, SettingsError> {
        if self.days == 0 {
            return Err(SettingsError::NonPositive);
        }
        Ok(self.days)
    }
}

#[async_trait]
pub trait ClientDirectory: Send + Sync {
    async fn find_by_id(&self, id: ClientId) -> Result<Option<Client>, DirectoryError>;
}

#[async_trait]
pub trait MerchantDirectory: Send + Sync {
    async fn get_by_id(&self, id: MerchantId) -> Result<Option<Merchant>, DirectoryError>;
}

#[async_trait]
pub trait AnalystDirectory: Send + Sync {
    async fn active_analyst_ids(&self) -> Result<Vec<UserId>, DirectoryError>;
}

/// Lookup failure raised by the identity directories.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}
