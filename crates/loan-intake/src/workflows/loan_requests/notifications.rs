use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::{Client, LoanRequest, UserId};
use super::repository::{AnalystDirectory, MerchantDirectory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RequestCreated,
    RequestApproved,
    RequestRejected,
    RequestExpired,
    ExpirationSummary,
    Error,
}

/// Message addressed to a single platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(user_id: UserId, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            user_id,
            kind,
            message: message.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    fn for_request(
        user_id: UserId,
        kind: NotificationKind,
        request: &LoanRequest,
        message: String,
    ) -> Self {
        Self::new(user_id, kind, message)
            .with_metadata("loan_request_id", request.id().to_string())
            .with_metadata("status", request.status().label())
    }
}

/// Outbound delivery channel (e-mail, push, in-app inbox). At-most-once; no retry here.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Dispatches expiration notices to the client, the merchant and the analyst roster.
pub struct NotificationFanout {
    channel: Arc<dyn NotificationChannel>,
    merchants: Arc<dyn MerchantDirectory>,
    analysts: Arc<dyn AnalystDirectory>,
}

impl NotificationFanout {
    pub fn new(
        channel: Arc<dyn NotificationChannel>,
        merchants: Arc<dyn MerchantDirectory>,
        analysts: Arc<dyn AnalystDirectory>,
    ) -> Self {
        Self {
            channel,
            merchants,
            analysts,
        }
    }

    /// Notify everyone with a stake in an expired request.
    ///
    /// Only the client notice can fail the call. Merchant and analyst delivery is best-effort:
    /// failures are logged and dropped.
    pub async fn notify_interested_parties(
        &self,
        client: &Client,
        request: &LoanRequest,
    ) -> Result<(), NotificationError> {
        let id = request.id();

        self.channel
            .send(Notification::for_request(
                client.user_id,
                NotificationKind::RequestExpired,
                request,
                format!("Your loan request #{id} expired without a decision."),
            ))
            .await?;

        if let Some(merchant_id) = request.merchant_id() {
            match self.merchants.get_by_id(merchant_id).await {
                Ok(Some(merchant)) => {
                    let notice = Notification::for_request(
                        merchant.user_id,
                        NotificationKind::RequestExpired,
                        request,
                        format!(
                            "Loan request #{id} for client {} expired without a decision.",
                            client.dni
                        ),
                    );
                    if let Err(err) = self.channel.send(notice).await {
                        warn!(
                            request_id = %id,
                            %merchant_id,
                            error = %err,
                            "merchant notification failed"
                        );
                    }
                }
                Ok(None) => {
                    warn!(
                        request_id = %id,
                        %merchant_id,
                        "merchant not found; skipping notification"
                    );
                }
                Err(err) => {
                    warn!(request_id = %id, %merchant_id, error = %err, "merchant lookup failed");
                }
            }
        }

        let message = format!(
            "Loan request #{id} for client {} expired after sitting pending.",
            client.dni
        );
        self.notify_analysts(NotificationKind::RequestExpired, request, &message)
            .await;

        Ok(())
    }

    /// Send the same notice to every active analyst concurrently and wait for all of them.
    pub async fn notify_analysts(
        &self,
        kind: NotificationKind,
        request: &LoanRequest,
        message: &str,
    ) {
        let analyst_ids = match self.analysts.active_analyst_ids().await {
            Ok(ids) => ids,
            Err(err) => {
                warn!(request_id = %request.id(), error = %err, "analyst lookup failed");
                return;
            }
        };

        let sends = analyst_ids.into_iter().map(|analyst_id| {
            let notice = Notification::for_request(analyst_id, kind, request, message.to_string());
            async move { (analyst_id, self.channel.send(notice).await) }
        });

        let mut delivered = 0usize;
        for (analyst_id, result) in join_all(sends).await {
            match result {
                Ok(()) => delivered += 1,
                Err(err) => {
                    warn!(
                        request_id = %request.id(),
                        %analyst_id,
                        error = %err,
                        "analyst notification failed"
                    );
                }
            }
        }
        debug!(request_id = %request.id(), delivered, "analyst fan-out complete");
    }
}
