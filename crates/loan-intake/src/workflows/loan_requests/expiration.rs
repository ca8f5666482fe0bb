use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use super::audit::{AuditAction, AuditEvent};
use super::domain::{LoanRequest, LoanRequestId, LoanRequestStatus, UserId};
use super::errors::SweepError;
use super::notifications::{Notification, NotificationFanout, NotificationKind};
use super::repository::ExpirationSettings;
use super::service::LifecyclePorts;

/// Totals for one completed sweep run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub threshold_days: u32,
    pub eligible: usize,
    pub expired: Vec<LoanRequestId>,
    pub failures: usize,
}

impl SweepReport {
    pub fn successes(&self) -> usize {
        self.expired.len()
    }
}

/// Batch job expiring pending requests older than the configured threshold.
///
/// Requests are expired one at a time in store order. The first unexpected error aborts the
/// run; requests already expired in that run keep their new status.
pub struct ExpirationSweep {
    ports: LifecyclePorts,
    settings: Arc<dyn ExpirationSettings>,
    fanout: NotificationFanout,
}

impl ExpirationSweep {
    pub fn new(ports: LifecyclePorts, settings: Arc<dyn ExpirationSettings>) -> Self {
        let fanout = ports.fanout();
        Self {
            ports,
            settings,
            fanout,
        }
    }

    /// Execute one sweep. Failures are reported to the system recipient, then returned.
    pub async fn run(&self) -> Result<SweepReport, SweepError> {
        match self.execute().await {
            Ok(report) => Ok(report),
            Err(err) => {
                error!(error = %err, "expiration sweep aborted");
                let notice = Notification::new(
                    UserId::SYSTEM,
                    NotificationKind::Error,
                    format!("Expiration sweep failed: {err}"),
                );
                if let Err(send_err) = self.ports.notifications.send(notice).await {
                    warn!(error = %send_err, "could not report sweep failure");
                }
                Err(err)
            }
        }
    }

    async fn execute(&self) -> Result<SweepReport, SweepError> {
        self.ports
            .audit
            .record(AuditEvent::for_sweep(
                AuditAction::SweepStarted,
                json!({ "message": "expiration sweep started" }),
            ))
            .await?;

        let threshold_days = self.settings.expiration_days().await?;
        let eligible = self
            .ports
            .store
            .find_eligible_for_expiration(threshold_days)
            .await?;

        if eligible.is_empty() {
            self.ports
                .audit
                .record(AuditEvent::for_sweep(
                    AuditAction::NoExpirations,
                    json!({ "threshold_days": threshold_days }),
                ))
                .await?;
            info!(threshold_days, "no loan requests eligible for expiration");
            return Ok(SweepReport {
                threshold_days,
                eligible: 0,
                expired: Vec::new(),
                failures: 0,
            });
        }

        let eligible_count = eligible.len();
        info!(threshold_days, eligible = eligible_count, "expiring stale loan requests");

        let mut expired = Vec::with_capacity(eligible_count);
        for request in eligible {
            let id = self.expire_one(request, threshold_days).await?;
            expired.push(id);
        }

        let report = SweepReport {
            threshold_days,
            eligible: eligible_count,
            failures: eligible_count - expired.len(),
            expired,
        };

        self.ports
            .audit
            .record(AuditEvent::for_sweep(
                AuditAction::SweepFinished,
                json!({
                    "threshold_days": threshold_days,
                    "eligible": report.eligible,
                    "successes": report.successes(),
                    "failures": report.failures,
                }),
            ))
            .await?;

        let ids: Vec<String> = report.expired.iter().map(ToString::to_string).collect();
        let summary = Notification::new(
            UserId::SYSTEM,
            NotificationKind::ExpirationSummary,
            format!(
                "Expired {} loan request(s): {}",
                report.successes(),
                ids.join(", ")
            ),
        )
        .with_metadata("expired_ids", ids.join(","))
        .with_metadata("threshold_days", threshold_days.to_string());
        self.ports.notifications.send(summary).await?;

        info!(
            expired = report.successes(),
            failures = report.failures,
            "expiration sweep finished"
        );
        Ok(report)
    }

    async fn expire_one(
        &self,
        mut request: LoanRequest,
        threshold_days: u32,
    ) -> Result<LoanRequestId, SweepError> {
        let id = request.id();
        let previous = request.status();

        self.ports
            .audit
            .record(AuditEvent::for_request(
                UserId::SYSTEM,
                AuditAction::ExpireOneStarted,
                id,
                json!({
                    "status": previous.label(),
                    "created_at": request.created_at().to_rfc3339(),
                    "threshold_days": threshold_days,
                }),
            ))
            .await?;

        request.expire(threshold_days)?;
        let stored = self
            .ports
            .store
            .update(request, LoanRequestStatus::Pending)
            .await?;

        let client = self
            .ports
            .clients
            .find_by_id(stored.client_id())
            .await?
            .ok_or(SweepError::ClientNotFound {
                client_id: stored.client_id(),
                request_id: id,
            })?;

        self.fanout.notify_interested_parties(&client, &stored).await?;

        self.ports
            .audit
            .record(AuditEvent::for_request(
                UserId::SYSTEM,
                AuditAction::ExpiredOne,
                id,
                json!({
                    "previous_status": previous.label(),
                    "status": stored.status().label(),
                    "client_id": client.id.0,
                    "client_dni": client.dni,
                }),
            ))
            .await?;

        info!(request_id = %id, client_id = %client.id, "loan request expired");
        Ok(id)
    }
}
