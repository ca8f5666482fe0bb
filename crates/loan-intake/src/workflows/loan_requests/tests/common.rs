use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::workflows::loan_requests::audit::{AuditAction, AuditError, AuditEvent, AuditSink};
use crate::workflows::loan_requests::domain::{
    Client, ClientId, LoanRequest, LoanRequestDraft, LoanRequestId, LoanRequestStatus, Merchant,
    MerchantId, UserId,
};
use crate::workflows::loan_requests::notifications::{
    Notification, NotificationChannel, NotificationError,
};
use crate::workflows::loan_requests::repository::{
    AnalystDirectory, ClientDirectory, DirectoryError, LoanRequestStore, MerchantDirectory,
    StaticExpirationSettings, StoreError,
};
use crate::workflows::loan_requests::{
    CreditVerifier, ExpirationSweep, LifecyclePorts, LoanLifecycleService, LoanRequestState,
};

pub(super) const CLIENT_ID: ClientId = ClientId(11);
pub(super) const CLIENT_USER: UserId = UserId(110);
pub(super) const MERCHANT_ID: MerchantId = MerchantId(21);
pub(super) const MERCHANT_USER: UserId = UserId(210);
pub(super) const ANALYSTS: [UserId; 3] = [UserId(3), UserId(4), UserId(5)];

pub(super) fn draft() -> LoanRequestDraft {
    LoanRequestDraft {
        client_id: CLIENT_ID,
        client_dni: "30111222".to_string(),
        client_tax_id: Some("20-30111222-7".to_string()),
        merchant_id: None,
        requested_amount: Some(250_000),
        attached_document: None,
    }
}

pub(super) fn merchant_draft() -> LoanRequestDraft {
    LoanRequestDraft {
        merchant_id: Some(MERCHANT_ID),
        ..draft()
    }
}

pub(super) fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

#[derive(Default)]
struct StoreState {
    records: BTreeMap<LoanRequestId, LoanRequest>,
    next_id: u64,
    updates: usize,
}

#[derive(Default)]
pub(super) struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Insert a pending request with an explicit creation time.
    pub(super) fn seed(&self, draft: LoanRequestDraft, created_at: DateTime<Utc>) -> LoanRequest {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.next_id += 1;
        let request = LoanRequest::open(LoanRequestId(state.next_id), draft, created_at);
        state.records.insert(request.id(), request.clone());
        request
    }

    /// Overwrite a record without any status check, simulating a concurrent writer.
    pub(super) fn replace(&self, request: LoanRequest) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.records.insert(request.id(), request);
    }

    pub(super) fn stored(&self, id: LoanRequestId) -> Option<LoanRequest> {
        let state = self.state.lock().expect("store mutex poisoned");
        state.records.get(&id).cloned()
    }

    pub(super) fn update_count(&self) -> usize {
        self.state.lock().expect("store mutex poisoned").updates
    }
}

#[async_trait]
impl LoanRequestStore for MemoryStore {
    async fn insert(&self, draft: LoanRequestDraft) -> Result<LoanRequest, StoreError> {
        Ok(self.seed(draft, Utc::now()))
    }

    async fn get_by_id(&self, id: LoanRequestId) -> Result<Option<LoanRequest>, StoreError> {
        Ok(self.stored(id))
    }

    async fn update(
        &self,
        request: LoanRequest,
        expected: LoanRequestStatus,
    ) -> Result<LoanRequest, StoreError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let current = state
            .records
            .get(&request.id())
            .ok_or(StoreError::NotFound(request.id()))?;
        if current.status() != expected {
            return Err(StoreError::StatusConflict {
                id: request.id(),
                expected,
                actual: current.status(),
            });
        }
        state.updates += 1;
        state.records.insert(request.id(), request.clone());
        Ok(request)
    }

    async fn find_eligible_for_expiration(
        &self,
        threshold_days: u32,
    ) -> Result<Vec<LoanRequest>, StoreError> {
        let cutoff = Utc::now().checked_sub_signed(Duration::days(i64::from(threshold_days)));
        let Some(cutoff) = cutoff else {
            return Ok(Vec::new());
        };
        let state = self.state.lock().expect("store mutex poisoned");
        let mut eligible: Vec<LoanRequest> = state
            .records
            .values()
            .filter(|request| request.status() == LoanRequestStatus::Pending)
            .filter(|request| request.created_at() <= cutoff)
            .cloned()
            .collect();
        eligible.sort_by_key(|request| (request.created_at(), request.id()));
        Ok(eligible)
    }
}

/// Store whose conditional update always loses the race, as if another reviewer got there first.
pub(super) struct RacingStore {
    pub(super) inner: MemoryStore,
    pub(super) winner: LoanRequestStatus,
}

#[async_trait]
impl LoanRequestStore for RacingStore {
    async fn insert(&self, draft: LoanRequestDraft) -> Result<LoanRequest, StoreError> {
        self.inner.insert(draft).await
    }

    async fn get_by_id(&self, id: LoanRequestId) -> Result<Option<LoanRequest>, StoreError> {
        self.inner.get_by_id(id).await
    }

    async fn update(
        &self,
        request: LoanRequest,
        expected: LoanRequestStatus,
    ) -> Result<LoanRequest, StoreError> {
        Err(StoreError::StatusConflict {
            id: request.id(),
            expected,
            actual: self.winner,
        })
    }

    async fn find_eligible_for_expiration(
        &self,
        threshold_days: u32,
    ) -> Result<Vec<LoanRequest>, StoreError> {
        self.inner.find_eligible_for_expiration(threshold_days).await
    }
}

#[derive(Default)]
pub(super) struct MemoryAudit {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAudit {
    pub(super) fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }

    pub(super) fn actions(&self) -> Vec<AuditAction> {
        self.events().into_iter().map(|event| event.action).collect()
    }

    pub(super) fn count(&self, action: AuditAction) -> usize {
        self.actions()
            .into_iter()
            .filter(|recorded| *recorded == action)
            .count()
    }

    pub(super) fn last(&self, action: AuditAction) -> Option<AuditEvent> {
        self.events()
            .into_iter()
            .rev()
            .find(|event| event.action == action)
    }
}

#[async_trait]
impl AuditSink for MemoryAudit {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.events
            .lock()
            .expect("audit mutex poisoned")
            .push(event);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifications {
    sent: Mutex<Vec<Notification>>,
    failing: Mutex<HashSet<UserId>>,
}

impl MemoryNotifications {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notification mutex poisoned").clone()
    }

    pub(super) fn sent_to(&self, user_id: UserId) -> Vec<Notification> {
        self.sent()
            .into_iter()
            .filter(|notice| notice.user_id == user_id)
            .collect()
    }

    pub(super) fn fail_for(&self, user_id: UserId) {
        self.failing
            .lock()
            .expect("notification mutex poisoned")
            .insert(user_id);
    }
}

#[async_trait]
impl NotificationChannel for MemoryNotifications {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        let failing = self
            .failing
            .lock()
            .expect("notification mutex poisoned")
            .contains(&notification.user_id);
        if failing {
            return Err(NotificationError::Transport("smtp relay down".to_string()));
        }
        self.sent
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct MemoryClients {
    clients: HashMap<ClientId, Client>,
}

impl Default for MemoryClients {
    fn default() -> Self {
        let mut clients = HashMap::new();
        clients.insert(
            CLIENT_ID,
            Client {
                id: CLIENT_ID,
                user_id: CLIENT_USER,
                dni: "30111222".to_string(),
                full_name: "Lucia Fernandez".to_string(),
            },
        );
        Self { clients }
    }
}

impl MemoryClients {
    pub(super) fn empty() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }
}

#[async_trait]
impl ClientDirectory for MemoryClients {
    async fn find_by_id(&self, id: ClientId) -> Result<Option<Client>, DirectoryError> {
        Ok(self.clients.get(&id).cloned())
    }
}

#[derive(Default)]
pub(super) struct MemoryMerchants {
    pub(super) unavailable: bool,
}

#[async_trait]
impl MerchantDirectory for MemoryMerchants {
    async fn get_by_id(&self, id: MerchantId) -> Result<Option<Merchant>, DirectoryError> {
        if self.unavailable {
            return Err(DirectoryError::Unavailable("merchant service timeout".to_string()));
        }
        if id != MERCHANT_ID {
            return Ok(None);
        }
        Ok(Some(Merchant {
            id,
            user_id: MERCHANT_USER,
            name: "Electro Norte".to_string(),
        }))
    }
}

#[derive(Default)]
pub(super) struct MemoryAnalysts {
    pub(super) unavailable: bool,
}

#[async_trait]
impl AnalystDirectory for MemoryAnalysts {
    async fn active_analyst_ids(&self) -> Result<Vec<UserId>, DirectoryError> {
        if self.unavailable {
            return Err(DirectoryError::Unavailable("roster offline".to_string()));
        }
        Ok(ANALYSTS.to_vec())
    }
}

/// Collaborators wired into a service, kept so tests can inspect them afterwards.
pub(super) struct Harness {
    pub(super) store: Arc<MemoryStore>,
    pub(super) audit: Arc<MemoryAudit>,
    pub(super) notifications: Arc<MemoryNotifications>,
    pub(super) clients: Arc<MemoryClients>,
    pub(super) merchants: Arc<MemoryMerchants>,
    pub(super) analysts: Arc<MemoryAnalysts>,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            store: Arc::new(MemoryStore::default()),
            audit: Arc::new(MemoryAudit::default()),
            notifications: Arc::new(MemoryNotifications::default()),
            clients: Arc::new(MemoryClients::default()),
            merchants: Arc::new(MemoryMerchants::default()),
            analysts: Arc::new(MemoryAnalysts::default()),
        }
    }
}

impl Harness {
    pub(super) fn ports(&self) -> LifecyclePorts {
        LifecyclePorts {
            store: self.store.clone(),
            audit: self.audit.clone(),
            notifications: self.notifications.clone(),
            clients: self.clients.clone(),
            merchants: self.merchants.clone(),
            analysts: self.analysts.clone(),
        }
    }

    pub(super) fn service(&self) -> LoanLifecycleService {
        LoanLifecycleService::new(self.ports())
    }

    pub(super) fn sweep(&self, days: u32) -> ExpirationSweep {
        ExpirationSweep::new(self.ports(), Arc::new(StaticExpirationSettings::new(days)))
    }

    pub(super) fn state(&self, days: u32) -> LoanRequestState {
        LoanRequestState {
            lifecycle: Arc::new(self.service()),
            sweep: Arc::new(self.sweep(days)),
            verifier: Arc::new(CreditVerifier::default()),
        }
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
