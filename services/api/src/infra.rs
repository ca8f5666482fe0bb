use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use loan_intake::workflows::loan_requests::{
    AnalystDirectory, AuditError, AuditEvent, AuditSink, BureauVariable, Client, ClientDirectory,
    ClientId, DirectoryError, LifecyclePorts, LoanRequest, LoanRequestDraft, LoanRequestId,
    LoanRequestStatus, LoanRequestStore, Merchant, MerchantDirectory, MerchantId, Notification,
    NotificationChannel, NotificationError, StoreError, UserId, VariableKind,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct StoreInner {
    records: BTreeMap<LoanRequestId, LoanRequest>,
    next_id: u64,
}

/// Process-local request store. Updates only land when the stored status still matches.
#[derive(Default, Clone)]
pub(crate) struct InMemoryLoanRequestStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryLoanRequestStore {
    pub(crate) fn insert_at(
        &self,
        draft: LoanRequestDraft,
        created_at: DateTime<Utc>,
    ) -> Result<LoanRequest, StoreError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        guard.next_id += 1;
        let request = LoanRequest::open(LoanRequestId(guard.next_id), draft, created_at);
        guard.records.insert(request.id(), request.clone());
        Ok(request)
    }

    pub(crate) fn all(&self) -> Vec<LoanRequest> {
        self.inner
            .lock()
            .map(|guard| guard.records.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LoanRequestStore for InMemoryLoanRequestStore {
    async fn insert(&self, draft: LoanRequestDraft) -> Result<LoanRequest, StoreError> {
        self.insert_at(draft, Utc::now())
    }

    async fn get_by_id(&self, id: LoanRequestId) -> Result<Option<LoanRequest>, StoreError> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        Ok(guard.records.get(&id).cloned())
    }

    async fn update(
        &self,
        request: LoanRequest,
        expected: LoanRequestStatus,
    ) -> Result<LoanRequest, StoreError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        let actual = guard
            .records
            .get(&request.id())
            .map(LoanRequest::status)
            .ok_or(StoreError::NotFound(request.id()))?;
        if actual != expected {
            return Err(StoreError::StatusConflict {
                id: request.id(),
                expected,
                actual,
            });
        }
        guard.records.insert(request.id(), request.clone());
        Ok(request)
    }

    async fn find_eligible_for_expiration(
        &self,
        threshold_days: u32,
    ) -> Result<Vec<LoanRequest>, StoreError> {
        // No record predates the earliest representable instant.
        let cutoff = Utc::now().checked_sub_signed(Duration::days(i64::from(threshold_days)));
        let Some(cutoff) = cutoff else {
            return Ok(Vec::new());
        };
        let guard = self
            .inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        let mut eligible: Vec<LoanRequest> = guard
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

/// Audit sink that emits each event as a structured log line and keeps it for inspection.
#[derive(Default, Clone)]
pub(crate) struct TracingAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl TracingAuditSink {
    pub(crate) fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        info!(
            actor = %event.actor,
            action = event.action.label(),
            entity = %event.entity,
            entity_id = %event.entity_id,
            details = %event.details,
            "audit"
        );
        let mut guard = self
            .events
            .lock()
            .map_err(|_| AuditError::Unavailable("audit lock poisoned".to_string()))?;
        guard.push(event);
        Ok(())
    }
}

/// Outbox standing in for the e-mail and in-app delivery channels.
#[derive(Default, Clone)]
pub(crate) struct OutboxChannel {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl OutboxChannel {
    pub(crate) fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationChannel for OutboxChannel {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            user_id = %notification.user_id,
            kind = ?notification.kind,
            "notification queued"
        );
        let mut guard = self
            .sent
            .lock()
            .map_err(|_| NotificationError::Transport("outbox lock poisoned".to_string()))?;
        guard.push(notification);
        Ok(())
    }
}

/// Fixed client, merchant and analyst records for local runs.
#[derive(Clone)]
pub(crate) struct SeededDirectory {
    clients: BTreeMap<ClientId, Client>,
    merchants: BTreeMap<MerchantId, Merchant>,
    analysts: Vec<UserId>,
}

impl SeededDirectory {
    pub(crate) fn sample() -> Self {
        let clients = [
            (1, 101, "30111222", "Lucia Fernandez"),
            (2, 102, "27444555", "Martin Sosa"),
            (3, 103, "33999888", "Carla Ibarra"),
        ]
        .into_iter()
        .map(|(id, user_id, dni, name)| {
            (
                ClientId(id),
                Client {
                    id: ClientId(id),
                    user_id: UserId(user_id),
                    dni: dni.to_string(),
                    full_name: name.to_string(),
                },
            )
        })
        .collect();

        let merchants = [(1, 201, "Electro Norte"), (2, 202, "Motos del Sur")]
            .into_iter()
            .map(|(id, user_id, name)| {
                (
                    MerchantId(id),
                    Merchant {
                        id: MerchantId(id),
                        user_id: UserId(user_id),
                        name: name.to_string(),
                    },
                )
            })
            .collect();

        Self {
            clients,
            merchants,
            analysts: vec![UserId(11), UserId(12)],
        }
    }

    pub(crate) fn clients(&self) -> Vec<Client> {
        self.clients.values().cloned().collect()
    }

    pub(crate) fn merchant_ids(&self) -> Vec<MerchantId> {
        self.merchants.keys().copied().collect()
    }
}

#[async_trait]
impl ClientDirectory for SeededDirectory {
    async fn find_by_id(&self, id: ClientId) -> Result<Option<Client>, DirectoryError> {
        Ok(self.clients.get(&id).cloned())
    }
}

#[async_trait]
impl MerchantDirectory for SeededDirectory {
    async fn get_by_id(&self, id: MerchantId) -> Result<Option<Merchant>, DirectoryError> {
        Ok(self.merchants.get(&id).cloned())
    }
}

#[async_trait]
impl AnalystDirectory for SeededDirectory {
    async fn active_analyst_ids(&self) -> Result<Vec<UserId>, DirectoryError> {
        Ok(self.analysts.clone())
    }
}

/// Handles to the in-memory adapters behind a set of lifecycle ports.
pub(crate) struct InMemoryBackends {
    pub(crate) store: InMemoryLoanRequestStore,
    pub(crate) audit: TracingAuditSink,
    pub(crate) outbox: OutboxChannel,
    pub(crate) directory: SeededDirectory,
}

impl InMemoryBackends {
    pub(crate) fn new() -> Self {
        Self {
            store: InMemoryLoanRequestStore::default(),
            audit: TracingAuditSink::default(),
            outbox: OutboxChannel::default(),
            directory: SeededDirectory::sample(),
        }
    }

    pub(crate) fn ports(&self) -> LifecyclePorts {
        let directory = Arc::new(self.directory.clone());
        LifecyclePorts {
            store: Arc::new(self.store.clone()),
            audit: Arc::new(self.audit.clone()),
            notifications: Arc::new(self.outbox.clone()),
            clients: directory.clone(),
            merchants: directory.clone(),
            analysts: directory,
        }
    }
}

/// Parse `NAME:KIND=VALUE`, e.g. `SCO_Vig:integer=640`.
pub(crate) fn parse_variable(raw: &str) -> Result<BureauVariable, String> {
    let (head, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME:KIND=VALUE, got '{raw}'"))?;
    let (name, kind) = head
        .split_once(':')
        .ok_or_else(|| format!("missing variable kind in '{raw}'"))?;
    let kind = match kind.trim().to_ascii_lowercase().as_str() {
        "integer" | "int" => VariableKind::Integer,
        "decimal" => VariableKind::Decimal,
        "text" => VariableKind::Text,
        "boolean" | "bool" => VariableKind::Boolean,
        other => return Err(format!("unknown variable kind '{other}'")),
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{raw}'"));
    }
    Ok(BureauVariable::new(name, kind, value.trim()))
}
