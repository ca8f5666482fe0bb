use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use super::audit::{AuditAction, AuditEvent, AuditSink, LOAN_REQUEST_ENTITY};
use super::domain::{
    Approver, ApproverRole, LoanRequest, LoanRequestDraft, LoanRequestId, LoanRequestStatus,
    TransitionError, UserId,
};
use super::errors::LifecycleError;
use super::notifications::{
    Notification, NotificationChannel, NotificationFanout, NotificationKind,
};
use super::repository::{
    AnalystDirectory, ClientDirectory, LoanRequestStore, MerchantDirectory, StoreError,
};

/// Minimum trimmed length of a rejection comment, in characters.
pub const MIN_REJECTION_COMMENT_CHARS: usize = 10;

/// Collaborators shared by the lifecycle service and the expiration sweep.
#[derive(Clone)]
pub struct LifecyclePorts {
    pub store: Arc<dyn LoanRequestStore>,
    pub audit: Arc<dyn AuditSink>,
    pub notifications: Arc<dyn NotificationChannel>,
    pub clients: Arc<dyn ClientDirectory>,
    pub merchants: Arc<dyn MerchantDirectory>,
    pub analysts: Arc<dyn AnalystDirectory>,
}

impl LifecyclePorts {
    pub(crate) fn fanout(&self) -> NotificationFanout {
        NotificationFanout::new(
            self.notifications.clone(),
            self.merchants.clone(),
            self.analysts.clone(),
        )
    }
}

/// Service applying reviewer decisions to loan requests.
///
/// Every call loads fresh state from the store and writes back through a conditional update,
/// so no request state is held between calls.
pub struct LoanLifecycleService {
    ports: LifecyclePorts,
    fanout: NotificationFanout,
}

impl LoanLifecycleService {
    pub fn new(ports: LifecyclePorts) -> Self {
        let fanout = ports.fanout();
        Self { ports, fanout }
    }

    /// Open a new pending request and alert the analyst roster.
    pub async fn create(&self, draft: LoanRequestDraft) -> Result<LoanRequest, LifecycleError> {
        if draft.client_dni.trim().is_empty() {
            let details = json!({
                "operation": "create",
                "client_id": draft.client_id.0,
                "reason": LifecycleError::MissingClientDni.to_string(),
            });
            self.record_failure(AuditEvent {
                actor: UserId::SYSTEM,
                action: AuditAction::Error,
                entity: LOAN_REQUEST_ENTITY.to_string(),
                entity_id: "new".to_string(),
                details,
                loan_request_id: None,
            })
            .await;
            return Err(LifecycleError::MissingClientDni);
        }

        let request = self.ports.store.insert(draft).await?;

        let actor = match self.ports.clients.find_by_id(request.client_id()).await {
            Ok(Some(client)) => client.user_id,
            Ok(None) => UserId::SYSTEM,
            Err(err) => {
                warn!(request_id = %request.id(), error = %err, "client lookup failed on create");
                UserId::SYSTEM
            }
        };

        self.ports
            .audit
            .record(AuditEvent::for_request(
                actor,
                AuditAction::Created,
                request.id(),
                json!({
                    "client_id": request.client_id().0,
                    "client_dni": request.client_dni(),
                    "merchant_id": request.merchant_id().map(|id| id.0),
                    "requested_amount": request.requested_amount(),
                    "has_document": request.attached_document().is_some(),
                }),
            ))
            .await?;

        info!(
            request_id = %request.id(),
            client_id = %request.client_id(),
            "loan request created"
        );

        let message = format!(
            "New loan request #{} from client {} awaits review.",
            request.id(),
            request.client_dni()
        );
        self.fanout
            .notify_analysts(NotificationKind::RequestCreated, &request, &message)
            .await;

        Ok(request)
    }

    /// Fetch the current stored state of a request.
    pub async fn get(&self, id: LoanRequestId) -> Result<LoanRequest, LifecycleError> {
        self.ports
            .store
            .get_by_id(id)
            .await?
            .ok_or(LifecycleError::RequestNotFound(id))
    }

    pub async fn approve(
        &self,
        id: LoanRequestId,
        approver_id: UserId,
        is_administrator: bool,
        comment: Option<&str>,
    ) -> Result<LoanRequest, LifecycleError> {
        let approver = Approver {
            user_id: approver_id,
            role: ApproverRole::from_flag(is_administrator),
        };
        let context = json!({
            "operation": "approve",
            "approver_id": approver_id.0,
            "approver_role": approver.role.label(),
            "comment": comment,
        });

        let mut request = self
            .load_pending(id, approver_id, LoanRequestStatus::Approved, &context)
            .await?;

        if let Err(err) = request.approve(approver, comment) {
            return Err(self.fail(id, approver_id, &context, err.into()).await);
        }

        let stored = self
            .persist(request, approver_id, LoanRequestStatus::Approved, &context)
            .await?;

        self.ports
            .audit
            .record(AuditEvent::for_request(
                approver_id,
                AuditAction::Approved,
                id,
                json!({
                    "previous_status": LoanRequestStatus::Pending.label(),
                    "status": stored.status().label(),
                    "approver_role": approver.role.label(),
                    "comment": comment,
                }),
            ))
            .await?;

        info!(
            request_id = %id,
            %approver_id,
            role = approver.role.label(),
            "loan request approved"
        );

        self.notify_applicant(
            &stored,
            NotificationKind::RequestApproved,
            format!("Your loan request #{id} was approved."),
        )
        .await;

        Ok(stored)
    }

    pub async fn reject(
        &self,
        id: LoanRequestId,
        comment: Option<&str>,
        approver_id: UserId,
        is_administrator: bool,
    ) -> Result<LoanRequest, LifecycleError> {
        let approver = Approver {
            user_id: approver_id,
            role: ApproverRole::from_flag(is_administrator),
        };
        let context = json!({
            "operation": "reject",
            "approver_id": approver_id.0,
            "approver_role": approver.role.label(),
            "comment": comment,
        });

        let comment = match comment.map(str::trim) {
            Some(text) if text.chars().count() >= MIN_REJECTION_COMMENT_CHARS => text,
            _ => {
                let err = LifecycleError::InvalidComment {
                    min_chars: MIN_REJECTION_COMMENT_CHARS,
                };
                return Err(self.fail(id, approver_id, &context, err).await);
            }
        };

        let mut request = self
            .load_pending(id, approver_id, LoanRequestStatus::Rejected, &context)
            .await?;

        if let Err(err) = request.reject(approver, comment) {
            return Err(self.fail(id, approver_id, &context, err.into()).await);
        }

        let stored = self
            .persist(request, approver_id, LoanRequestStatus::Rejected, &context)
            .await?;

        self.ports
            .audit
            .record(AuditEvent::for_request(
                approver_id,
                AuditAction::Rejected,
                id,
                json!({
                    "previous_status": LoanRequestStatus::Pending.label(),
                    "status": stored.status().label(),
                    "approver_role": approver.role.label(),
                    "comment": format!("Rejection by {}: {}", approver.role.label(), comment),
                }),
            ))
            .await?;

        info!(
            request_id = %id,
            %approver_id,
            role = approver.role.label(),
            "loan request rejected"
        );

        self.notify_applicant(
            &stored,
            NotificationKind::RequestRejected,
            format!("Your loan request #{id} was rejected: {comment}"),
        )
        .await;

        Ok(stored)
    }

    async fn load_pending(
        &self,
        id: LoanRequestId,
        actor: UserId,
        target: LoanRequestStatus,
        context: &Value,
    ) -> Result<LoanRequest, LifecycleError> {
        let request = match self.ports.store.get_by_id(id).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                return Err(self
                    .fail(id, actor, context, LifecycleError::RequestNotFound(id))
                    .await)
            }
            Err(err) => return Err(self.fail(id, actor, context, err.into()).await),
        };

        if request.status() != LoanRequestStatus::Pending {
            let err = TransitionError {
                id,
                current: request.status(),
                target,
            };
            return Err(self.fail(id, actor, context, err.into()).await);
        }

        Ok(request)
    }

    async fn persist(
        &self,
        request: LoanRequest,
        actor: UserId,
        target: LoanRequestStatus,
        context: &Value,
    ) -> Result<LoanRequest, LifecycleError> {
        let id = request.id();
        match self
            .ports
            .store
            .update(request, LoanRequestStatus::Pending)
            .await
        {
            Ok(stored) => Ok(stored),
            Err(StoreError::StatusConflict { actual, .. }) => {
                let err = TransitionError {
                    id,
                    current: actual,
                    target,
                };
                Err(self.fail(id, actor, context, err.into()).await)
            }
            Err(err) => Err(self.fail(id, actor, context, err.into()).await),
        }
    }

    /// Audit a refused operation and hand the error back for the caller to return.
    async fn fail(
        &self,
        id: LoanRequestId,
        actor: UserId,
        context: &Value,
        err: LifecycleError,
    ) -> LifecycleError {
        let mut details = context.clone();
        if let Value::Object(map) = &mut details {
            map.insert("reason".to_string(), Value::String(err.to_string()));
            map.insert("kind".to_string(), json!(err.kind()));
        }
        warn!(request_id = %id, %actor, error = %err, "loan request operation refused");
        self.record_failure(AuditEvent::for_request(actor, AuditAction::Error, id, details))
            .await;
        err
    }

    async fn record_failure(&self, event: AuditEvent) {
        if let Err(err) = self.ports.audit.record(event).await {
            warn!(error = %err, "failed to record error audit event");
        }
    }

    async fn notify_applicant(
        &self,
        request: &LoanRequest,
        kind: NotificationKind,
        message: String,
    ) {
        let client = match self.ports.clients.find_by_id(request.client_id()).await {
            Ok(Some(client)) => client,
            Ok(None) => {
                warn!(
                    request_id = %request.id(),
                    client_id = %request.client_id(),
                    "applicant not found; notification skipped"
                );
                return;
            }
            Err(err) => {
                warn!(request_id = %request.id(), error = %err, "applicant lookup failed");
                return;
            }
        };

        let notice = Notification::new(client.user_id, kind, message)
            .with_metadata("loan_request_id", request.id().to_string())
            .with_metadata("status", request.status().label());
        if let Err(err) = self.ports.notifications.send(notice).await {
            warn!(request_id = %request.id(), error = %err, "applicant notification failed");
        }
    }
}
