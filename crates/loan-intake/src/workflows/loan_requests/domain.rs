use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for stored loan requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoanRequestId(pub u64);

impl fmt::Display for LoanRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform user identifier. `0` is reserved for actions initiated by the platform itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl UserId {
    pub const SYSTEM: UserId = UserId(0);
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MerchantId(pub u64);

impl fmt::Display for MerchantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status tracked throughout the loan request lifecycle. Only `Pending` is non-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanRequestStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl LoanRequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LoanRequestStatus::Pending => "pending",
            LoanRequestStatus::Approved => "approved",
            LoanRequestStatus::Rejected => "rejected",
            LoanRequestStatus::Expired => "expired",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, LoanRequestStatus::Pending)
    }
}

impl fmt::Display for LoanRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Role under which a reviewer resolved a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    Analyst,
    Administrator,
}

impl ApproverRole {
    pub const fn from_flag(is_administrator: bool) -> Self {
        if is_administrator {
            ApproverRole::Administrator
        } else {
            ApproverRole::Analyst
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ApproverRole::Analyst => "analyst",
            ApproverRole::Administrator => "administrator",
        }
    }
}

/// Reviewer that resolved the request. A request carries at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    pub user_id: UserId,
    pub role: ApproverRole,
}

/// Supporting document uploaded with the request (e.g. a payslip).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedDocument {
    pub file_name: String,
    pub content_type: String,
    #[serde(default)]
    pub bytes: Vec<u8>,
}

/// Applicant supplied data used to open a new request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRequestDraft {
    pub client_id: ClientId,
    pub client_dni: String,
    #[serde(default)]
    pub client_tax_id: Option<String>,
    #[serde(default)]
    pub merchant_id: Option<MerchantId>,
    #[serde(default)]
    pub requested_amount: Option<u64>,
    #[serde(default)]
    pub attached_document: Option<AttachedDocument>,
}

/// Reason a transition on [`LoanRequest`] was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("loan request {id} is {current}; only pending requests can become {target}")]
pub struct TransitionError {
    pub id: LoanRequestId,
    pub current: LoanRequestStatus,
    pub target: LoanRequestStatus,
}

/// Initial loan request. Identity fields are fixed at creation; only the transition methods
/// change status, approver and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanRequest {
    id: LoanRequestId,
    created_at: DateTime<Utc>,
    status: LoanRequestStatus,
    client_id: ClientId,
    client_dni: String,
    client_tax_id: Option<String>,
    merchant_id: Option<MerchantId>,
    requested_amount: Option<u64>,
    approver: Option<Approver>,
    comments: Vec<String>,
    attached_document: Option<AttachedDocument>,
}

impl LoanRequest {
    /// Materialise a freshly created request. Stores call this when assigning an id.
    pub fn open(id: LoanRequestId, draft: LoanRequestDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at,
            status: LoanRequestStatus::Pending,
            client_id: draft.client_id,
            client_dni: draft.client_dni.trim().to_string(),
            client_tax_id: draft.client_tax_id,
            merchant_id: draft.merchant_id,
            requested_amount: draft.requested_amount,
            approver: None,
            comments: vec!["Created".to_string()],
            attached_document: draft.attached_document,
        }
    }

    pub fn id(&self) -> LoanRequestId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> LoanRequestStatus {
        self.status
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn client_dni(&self) -> &str {
        &self.client_dni
    }

    pub fn client_tax_id(&self) -> Option<&str> {
        self.client_tax_id.as_deref()
    }

    pub fn merchant_id(&self) -> Option<MerchantId> {
        self.merchant_id
    }

    pub fn requested_amount(&self) -> Option<u64> {
        self.requested_amount
    }

    pub fn approver(&self) -> Option<Approver> {
        self.approver
    }

    pub fn approver_id(&self) -> Option<UserId> {
        self.approver.map(|approver| approver.user_id)
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn attached_document(&self) -> Option<&AttachedDocument> {
        self.attached_document.as_ref()
    }

    pub fn approve(
        &mut self,
        approver: Approver,
        comment: Option<&str>,
    ) -> Result<(), TransitionError> {
        self.ensure_pending(LoanRequestStatus::Approved)?;
        self.approver = Some(approver);
        if let Some(comment) = comment {
            self.comments.push(format!("Approval: {comment}"));
        }
        self.status = LoanRequestStatus::Approved;
        Ok(())
    }

    pub fn reject(&mut self, approver: Approver, comment: &str) -> Result<(), TransitionError> {
        self.ensure_pending(LoanRequestStatus::Rejected)?;
        self.approver = Some(approver);
        self.comments.push(format!(
            "Rejection by {}: {}",
            approver.role.label(),
            comment.trim()
        ));
        self.status = LoanRequestStatus::Rejected;
        Ok(())
    }

    pub fn expire(&mut self, threshold_days: u32) -> Result<(), TransitionError> {
        self.ensure_pending(LoanRequestStatus::Expired)?;
        self.comments.push(format!(
            "Expired after {threshold_days} days without resolution"
        ));
        self.status = LoanRequestStatus::Expired;
        Ok(())
    }

    fn ensure_pending(&self, target: LoanRequestStatus) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError {
                id: self.id,
                current: self.status,
                target,
            });
        }
        Ok(())
    }
}

/// Applicant record resolved from the client directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub user_id: UserId,
    pub dni: String,
    pub full_name: String,
}

/// Originating merchant record resolved from the merchant directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    pub id: MerchantId,
    pub user_id: UserId,
    pub name: String,
}
