use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use common_sealed::SealKey;

use crate::api::TenantSummary;

/// Token pair persisted between launches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    #[serde(default)]
    tokens: Option<AuthTokens>,
    #[serde(default)]
    current_tenant: Option<TenantSummary>,
    #[serde(default)]
    tenants: Vec<TenantSummary>,
}

/// Client-side persistence for the session slice: token pair, selected
/// tenant, and the accessible-tenant list used to pre-populate the picker.
///
/// Reads never fail: a corrupted blob is treated the same as an absent one.
/// Tenant writes are verified by read-back since routing depends on them;
/// everything else is fire-and-forget.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn read_tokens(&self) -> Option<AuthTokens>;
    async fn write_tokens(&self, tokens: &AuthTokens);
    async fn clear_tokens(&self);

    async fn read_current_tenant(&self) -> Option<TenantSummary>;
    /// Returns true only when the read-back matches what was written.
    async fn write_current_tenant(&self, tenant: &TenantSummary) -> bool;
    async fn clear_current_tenant(&self);

    async fn read_tenant_list(&self) -> Vec<TenantSummary>;
    async fn write_tenant_list(&self, tenants: &[TenantSummary]);
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<PersistedState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn read_tokens(&self) -> Option<AuthTokens> {
        self.state.read().expect("rwlock poisoned").tokens.clone()
    }

    async fn write_tokens(&self, tokens: &AuthTokens) {
        self.state.write().expect("rwlock poisoned").tokens = Some(tokens.clone());
    }

    async fn clear_tokens(&self) {
        self.state.write().expect("rwlock poisoned").tokens = None;
    }

    async fn read_current_tenant(&self) -> Option<TenantSummary> {
        self.state
            .read()
            .expect("rwlock poisoned")
            .current_tenant
            .clone()
    }

    async fn write_current_tenant(&self, tenant: &TenantSummary) -> bool {
        self.state.write().expect("rwlock poisoned").current_tenant = Some(tenant.clone());
        self.read_current_tenant().await.as_ref() == Some(tenant)
    }

    async fn clear_current_tenant(&self) {
        self.state.write().expect("rwlock poisoned").current_tenant = None;
    }

    async fn read_tenant_list(&self) -> Vec<TenantSummary> {
        self.state.read().expect("rwlock poisoned").tenants.clone()
    }

    async fn write_tenant_list(&self, tenants: &[TenantSummary]) {
        self.state.write().expect("rwlock poisoned").tenants = tenants.to_vec();
    }
}

/// Sealed-file store. The whole state is small, so each write seals and
/// rewrites the file; tokens and tenant selection never touch disk in
/// plaintext. A blob that fails to open (tampered, truncated, or written
/// under a different key) reads as empty.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    key: SealKey,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, key: SealKey) -> Self {
        Self {
            path: path.into(),
            key,
        }
    }

    async fn load(&self) -> PersistedState {
        let blob = match tokio::fs::read(&self.path).await {
            Ok(blob) => blob,
            Err(_) => return PersistedState::default(),
        };
        let bytes = match self.key.open(&blob) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "state file failed to open, starting empty");
                return PersistedState::default();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "corrupt state file, starting empty");
                PersistedState::default()
            }
        }
    }

    async fn save(&self, state: &PersistedState) {
        let bytes = match serde_json::to_vec(state) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%err, "failed to serialize state");
                return;
            }
        };
        let blob = match self.key.seal(&bytes) {
            Ok(blob) => blob,
            Err(err) => {
                warn!(%err, "failed to seal state");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        if let Err(err) = tokio::fs::write(&self.path, blob).await {
            warn!(path = %self.path.display(), %err, "failed to persist state");
        }
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn read_tokens(&self) -> Option<AuthTokens> {
        self.load().await.tokens
    }

    async fn write_tokens(&self, tokens: &AuthTokens) {
        let mut state = self.load().await;
        state.tokens = Some(tokens.clone());
        self.save(&state).await;
    }

    async fn clear_tokens(&self) {
        let mut state = self.load().await;
        state.tokens = None;
        self.save(&state).await;
    }

    async fn read_current_tenant(&self) -> Option<TenantSummary> {
        self.load().await.current_tenant
    }

    async fn write_current_tenant(&self, tenant: &TenantSummary) -> bool {
        let mut state = self.load().await;
        state.current_tenant = Some(tenant.clone());
        self.save(&state).await;
        self.load().await.current_tenant.as_ref() == Some(tenant)
    }

    async fn clear_current_tenant(&self) {
        let mut state = self.load().await;
        state.current_tenant = None;
        self.save(&state).await;
    }

    async fn read_tenant_list(&self) -> Vec<TenantSummary> {
        self.load().await.tenants
    }

    async fn write_tenant_list(&self, tenants: &[TenantSummary]) {
        let mut state = self.load().await;
        state.tenants = tenants.to_vec();
        self.save(&state).await;
    }
}
