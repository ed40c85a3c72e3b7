//! Client-side access-control and session-bootstrap subsystem for the OpsHub
//! platform: permission-gated routing, tenant selection, and the
//! subscription/module gate. Every check here is a UX convenience; the server
//! independently re-validates authorization on each API call.

pub mod api;
pub mod claims;
pub mod config;
pub mod error;
pub mod guard;
pub mod session;
pub mod storage;
pub mod subscription;
pub mod tenant;

use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;

pub use api::{
    ApiClient, DashboardSummary, LoginRequest, LoginResponse, ModuleAccessResponse, SessionUser,
    Tenant, TenantSummary, TokenCell,
};
pub use claims::Claims;
pub use config::{load_client_config, ClientConfig};
pub use error::{ApiError, ApiResult};
pub use guard::{evaluate, Location, RouteDecision, RouteRule};
pub use session::{AuthState, SessionManager};
pub use storage::{AuthTokens, FileStore, MemoryStore, StateStore};
pub use subscription::{SubscriptionGate, SubscriptionStatus, Tier};
pub use tenant::{spawn_autoload, TenantManager, TenantState};

pub use common_sealed::SealKey;

use common_telemetry::Tracker;

/// Root dependency container, created once at process start and threaded
/// through explicitly. Building it wires the state machines together and
/// starts the auth-gated tenant autoload listener, so it must be constructed
/// inside a tokio runtime.
pub struct AppDeps {
    pub config: ClientConfig,
    pub store: Arc<dyn StateStore>,
    pub tracker: Arc<dyn Tracker>,
    pub api: Arc<ApiClient>,
    pub session: Arc<SessionManager>,
    pub tenants: Arc<TenantManager>,
    pub gate: Arc<SubscriptionGate>,
    autoload: JoinHandle<()>,
}

impl AppDeps {
    pub fn build(
        config: ClientConfig,
        store: Arc<dyn StateStore>,
        tracker: Arc<dyn Tracker>,
    ) -> ApiResult<Self> {
        let api = Arc::new(ApiClient::new(&config, TokenCell::new())?.persist_to(store.clone()));
        let gate = Arc::new(SubscriptionGate::new(
            api.clone(),
            config.subscription_ttl,
            tracker.clone(),
        ));
        let session = Arc::new(SessionManager::new(
            api.clone(),
            store.clone(),
            tracker.clone(),
            config.token_leeway_secs,
        ));
        let tenants = Arc::new(TenantManager::new(
            api.clone(),
            store.clone(),
            gate.clone(),
            tracker.clone(),
        ));
        let autoload = spawn_autoload(tenants.clone(), session.subscribe());

        Ok(Self {
            config,
            store,
            tracker,
            api,
            session,
            tenants,
            gate,
            autoload,
        })
    }

    /// Build from environment configuration with the default store and
    /// tracing-backed tracker. A configured state path always comes with a
    /// seal key; session state never reaches disk in plaintext.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = load_client_config()?;
        let store: Arc<dyn StateStore> = match (&config.state_path, &config.state_key) {
            (Some(path), Some(raw_key)) => {
                let key = SealKey::from_base64(raw_key)
                    .context("Failed to parse OPSHUB_STATE_KEY")?;
                Arc::new(FileStore::new(path, key))
            }
            (Some(_), None) => {
                return Err(anyhow::anyhow!(
                    "OPSHUB_STATE_KEY must be set when OPSHUB_STATE_PATH is used"
                ))
            }
            (None, _) => Arc::new(MemoryStore::new()),
        };
        let tracker = Arc::new(common_telemetry::TracingTracker);
        Ok(Self::build(config, store, tracker)?)
    }

    /// Run the one-time startup check. Terminal auth state is published on
    /// the session channel; the autoload listener takes it from there.
    pub async fn bootstrap(&self) {
        self.session.check().await;
    }

    /// Logout tears down the session and drops the subscription cache so
    /// the next login starts from a cold gate.
    pub async fn logout(&self) {
        self.session.logout().await;
        self.gate.clear_cache().await;
    }

    /// Convenience wrapper composing the current machine states and module
    /// snapshot into a guard verdict for one location.
    pub async fn route(&self, location: &Location, rule: &RouteRule) -> RouteDecision {
        let modules = self.gate.module_snapshot().await;
        evaluate(
            location,
            &self.session.state(),
            &self.tenants.state(),
            rule,
            &modules,
        )
    }

    /// Fetch the dashboard summary and seed the subscription cache from its
    /// module list, saving the separate status round trip on first paint.
    pub async fn warm_dashboard(&self) -> ApiResult<DashboardSummary> {
        let summary = self.api.dashboard().await?;
        self.gate
            .warm(SubscriptionStatus {
                tier: summary.tier,
                is_active: true,
                is_trial: false,
                days_remaining: None,
                expires_at: None,
                enabled_modules: summary.enabled_modules.clone(),
            })
            .await;
        Ok(summary)
    }
}

impl Drop for AppDeps {
    fn drop(&mut self) {
        self.autoload.abort();
    }
}
