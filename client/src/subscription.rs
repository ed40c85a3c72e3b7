use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use common_access::ModuleAccessDecision;
use common_telemetry::Tracker;

use crate::api::{ApiClient, SubscriptionStatusResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Starter,
    Pro,
    Enterprise,
}

/// Tenant-scoped subscription snapshot. Advisory only: the server re-checks
/// module access on every API call, this cache just drives UI gating.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionStatus {
    pub tier: Tier,
    pub is_active: bool,
    pub is_trial: bool,
    pub days_remaining: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub enabled_modules: Vec<String>,
}

impl SubscriptionStatus {
    /// Zero-access default used when no status could be fetched and nothing
    /// is cached. The gate fails closed, never open.
    pub fn none() -> Self {
        Self {
            tier: Tier::Free,
            is_active: false,
            is_trial: false,
            days_remaining: None,
            expires_at: None,
            enabled_modules: Vec::new(),
        }
    }

    pub fn has_module(&self, module_id: &str) -> bool {
        self.enabled_modules.iter().any(|module| module == module_id)
    }
}

impl From<SubscriptionStatusResponse> for SubscriptionStatus {
    fn from(value: SubscriptionStatusResponse) -> Self {
        Self {
            tier: value.tier,
            is_active: value.has_subscription && value.is_active,
            is_trial: value.is_trial,
            days_remaining: value.days_remaining,
            expires_at: value.expires_at,
            enabled_modules: value.enabled_modules,
        }
    }
}

struct CacheEntry {
    status: SubscriptionStatus,
    fetched_at: Instant,
    // Seeded from a dashboard payload rather than the status endpoint; good
    // enough for module lookups, but the next status() read refetches.
    provisional: bool,
}

/// Per-tenant module gate with a short TTL cache.
///
/// Convention (resolved from inconsistent call sites in the source):
/// `has_module_access` (cached) is authoritative for navigation and UI
/// hiding; `check_module_access` (uncached round trip) for pre-mutation
/// checks.
pub struct SubscriptionGate {
    api: Arc<ApiClient>,
    ttl: Duration,
    tracker: Arc<dyn Tracker>,
    cache: Mutex<Option<CacheEntry>>,
}

impl SubscriptionGate {
    pub fn new(api: Arc<ApiClient>, ttl: Duration, tracker: Arc<dyn Tracker>) -> Self {
        Self {
            api,
            ttl,
            tracker,
            cache: Mutex::new(None),
        }
    }

    /// Cached status, refetched when older than the TTL or when forced.
    /// The cache lock is held across the fetch, so concurrent callers inside
    /// the TTL window share one request instead of issuing duplicates.
    pub async fn status(&self, force_refresh: bool) -> SubscriptionStatus {
        let mut cache = self.cache.lock().await;

        if !force_refresh {
            if let Some(entry) = cache.as_ref() {
                if !entry.provisional && entry.fetched_at.elapsed() < self.ttl {
                    debug!("subscription cache hit");
                    return entry.status.clone();
                }
            }
        }

        match self.api.subscription_status().await {
            Ok(response) => {
                let status = SubscriptionStatus::from(response);
                *cache = Some(CacheEntry {
                    status: status.clone(),
                    fetched_at: Instant::now(),
                    provisional: false,
                });
                status
            }
            Err(err) => {
                warn!(%err, "subscription status fetch failed");
                self.tracker
                    .track_error("subscription", &err.to_string());
                match cache.as_ref() {
                    // Stale-but-known beats unknown; keep serving the last
                    // good value until a fetch succeeds again.
                    Some(entry) => entry.status.clone(),
                    None => SubscriptionStatus::none(),
                }
            }
        }
    }

    /// Membership test against the cached status. No fetch; absent cache
    /// means no access.
    pub async fn has_module_access(&self, module_id: &str) -> bool {
        let cache = self.cache.lock().await;
        cache
            .as_ref()
            .map(|entry| entry.status.has_module(module_id))
            .unwrap_or(false)
    }

    /// Snapshot of the cached module list for the route guard.
    pub async fn module_snapshot(&self) -> Vec<String> {
        let cache = self.cache.lock().await;
        cache
            .as_ref()
            .map(|entry| entry.status.enabled_modules.clone())
            .unwrap_or_default()
    }

    /// Definitive single-module check against the server, used before
    /// mutating actions. Transport failure denies.
    pub async fn check_module_access(&self, module_id: &str) -> ModuleAccessDecision {
        match self.api.module_access(module_id).await {
            Ok(response) => {
                self.tracker.track_event(
                    "module_access_checked",
                    json!({"module": module_id, "allowed": response.allowed}),
                );
                if response.allowed {
                    ModuleAccessDecision::allow()
                } else {
                    ModuleAccessDecision::deny(
                        response
                            .reason
                            .or(response.upgrade_message)
                            .unwrap_or_else(|| "module not available".to_string()),
                    )
                }
            }
            Err(err) => {
                warn!(module_id, %err, "module access check failed");
                self.tracker.track_error("subscription", &err.to_string());
                ModuleAccessDecision::deny("module access check failed")
            }
        }
    }

    /// Seed the cache from an already-fetched status (dashboard bootstrap).
    /// The entry is provisional: module lookups use it immediately, while a
    /// later `status` read still goes to the server for the full picture
    /// (trial state, expiry) instead of trusting the seed for a TTL window.
    pub async fn warm(&self, status: SubscriptionStatus) {
        let mut cache = self.cache.lock().await;
        *cache = Some(CacheEntry {
            status,
            fetched_at: Instant::now(),
            provisional: true,
        });
    }

    /// Called on logout and tenant switch; the next read refetches.
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.lock().await;
        *cache = None;
    }
}
