use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use common_telemetry::Tracker;

use crate::api::{ApiClient, TenantSummary};
use crate::session::AuthState;
use crate::storage::StateStore;
use crate::subscription::SubscriptionGate;

/// Tenant-selection lifecycle. `Error` keeps the previously loaded list and
/// selection so a transient refresh failure does not eject the user from
/// their current tenant.
#[derive(Debug, Clone, PartialEq)]
pub enum TenantState {
    Initial,
    Loading,
    Loaded {
        tenants: Vec<TenantSummary>,
        current: Option<TenantSummary>,
    },
    Error {
        message: String,
        tenants: Vec<TenantSummary>,
        current: Option<TenantSummary>,
    },
}

impl TenantState {
    pub fn tenants(&self) -> &[TenantSummary] {
        match self {
            TenantState::Loaded { tenants, .. } | TenantState::Error { tenants, .. } => tenants,
            _ => &[],
        }
    }

    pub fn current(&self) -> Option<&TenantSummary> {
        match self {
            TenantState::Loaded { current, .. } | TenantState::Error { current, .. } => {
                current.as_ref()
            }
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, TenantState::Loaded { .. } | TenantState::Error { .. })
    }
}

/// Resolves which tenant context is active once the session is authenticated.
pub struct TenantManager {
    api: Arc<ApiClient>,
    store: Arc<dyn StateStore>,
    gate: Arc<SubscriptionGate>,
    tracker: Arc<dyn Tracker>,
    state_tx: watch::Sender<TenantState>,
}

impl TenantManager {
    pub fn new(
        api: Arc<ApiClient>,
        store: Arc<dyn StateStore>,
        gate: Arc<SubscriptionGate>,
        tracker: Arc<dyn Tracker>,
    ) -> Self {
        let (state_tx, _) = watch::channel(TenantState::Initial);
        Self {
            api,
            store,
            gate,
            tracker,
            state_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TenantState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> TenantState {
        self.state_tx.borrow().clone()
    }

    fn emit(&self, state: TenantState) {
        self.state_tx.send_replace(state);
    }

    /// Fetch the accessible tenant list and resolve the active tenant:
    /// restore a persisted selection when it still matches, auto-select a
    /// sole tenant, otherwise leave selection to the picker.
    pub async fn load(&self) {
        let previous = self.state();
        self.emit(TenantState::Loading);

        match self.api.tenants().await {
            Ok(tenants) => {
                self.store.write_tenant_list(&tenants).await;

                let persisted = self.store.read_current_tenant().await;
                let restored = persisted
                    .as_ref()
                    .and_then(|saved| tenants.iter().find(|tenant| tenant.id == saved.id))
                    .cloned();

                let current = match restored {
                    Some(tenant) => Some(tenant),
                    None if tenants.len() == 1 => {
                        let only = tenants[0].clone();
                        if !self.store.write_current_tenant(&only).await {
                            warn!(tenant_id = %only.id, "tenant persistence read-back mismatch");
                        }
                        Some(only)
                    }
                    None => {
                        if persisted.is_some() {
                            // Persisted tenant no longer accessible; drop it.
                            self.store.clear_current_tenant().await;
                        }
                        None
                    }
                };

                self.tracker.track_event(
                    "tenants_loaded",
                    json!({"count": tenants.len(), "selected": current.is_some()}),
                );
                self.emit(TenantState::Loaded { tenants, current });
            }
            Err(err) => {
                warn!(%err, "tenant list fetch failed");
                self.tracker.track_error("tenant", &err.to_string());
                let mut tenants = previous.tenants().to_vec();
                if tenants.is_empty() {
                    // Picker pre-population from the last persisted list.
                    tenants = self.store.read_tenant_list().await;
                }
                self.emit(TenantState::Error {
                    message: err.to_string(),
                    current: previous.current().cloned(),
                    tenants,
                });
            }
        }
    }

    /// Switch to a tenant: re-fetch its full record, persist it as current
    /// (verified by read-back), and drop the old tenant's subscription cache.
    pub async fn select(&self, tenant_id: Uuid) {
        let previous = self.state();

        match self.api.tenant(tenant_id).await {
            Ok(tenant) => {
                let summary = tenant.summary();
                if !self.store.write_current_tenant(&summary).await {
                    warn!(tenant_id = %summary.id, "tenant persistence read-back mismatch");
                }
                self.gate.clear_cache().await;
                self.tracker
                    .track_event("tenant_selected", json!({"tenantId": summary.id}));

                let mut tenants = previous.tenants().to_vec();
                if !tenants.iter().any(|existing| existing.id == summary.id) {
                    tenants.push(summary.clone());
                }
                self.emit(TenantState::Loaded {
                    tenants,
                    current: Some(summary),
                });
            }
            Err(err) => {
                warn!(%err, %tenant_id, "tenant fetch failed");
                self.tracker.track_error("tenant", &err.to_string());
                self.emit(TenantState::Error {
                    message: err.to_string(),
                    tenants: previous.tenants().to_vec(),
                    current: previous.current().cloned(),
                });
            }
        }
    }

    /// Drop the active selection but keep the list; the picker shows next.
    pub async fn clear(&self) {
        self.store.clear_current_tenant().await;
        let previous = self.state();
        self.emit(TenantState::Loaded {
            tenants: previous.tenants().to_vec(),
            current: None,
        });
    }

    /// Back to square one; used when the session ends.
    pub fn reset(&self) {
        self.emit(TenantState::Initial);
    }
}

/// Sequences the tenant load strictly after authentication: exactly one load
/// per authenticated session, guard reset when auth drops. An in-flight load
/// is not cancelled by a fast logout/login; a stale response may land in the
/// new session (known gap, matches the source behaviour).
pub fn spawn_autoload(
    manager: Arc<TenantManager>,
    mut auth_rx: watch::Receiver<AuthState>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut triggered = false;
        loop {
            let state = auth_rx.borrow_and_update().clone();
            match state {
                AuthState::Authenticated { .. } if !triggered => {
                    triggered = true;
                    debug!("auth reached Authenticated, loading tenants");
                    manager.load().await;
                }
                AuthState::Unauthenticated { .. } | AuthState::Error { .. } if triggered => {
                    triggered = false;
                    manager.reset();
                }
                _ => {}
            }
            if auth_rx.changed().await.is_err() {
                break;
            }
        }
    })
}
