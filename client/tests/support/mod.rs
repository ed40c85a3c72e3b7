#![allow(dead_code)]

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use httpmock::MockServer;
use serde_json::{json, Value};
use uuid::Uuid;

use common_telemetry::RecordingTracker;
use opshub_client::{AppDeps, ClientConfig, MemoryStore, TenantState, TenantSummary};

/// Forge an access token the client can decode. Signatures are never
/// verified client-side, so a fixed garbage signature is fine.
pub fn forge_token(subject: Uuid, tenant: Option<Uuid>, role: &str, ttl_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let mut payload = json!({
        "sub": subject.to_string(),
        "role": role,
        "email": format!("{role}@example.com"),
        "name": "Test User",
        "iat": now,
        "exp": now + ttl_secs,
    });
    if let Some(tenant) = tenant {
        payload["tid"] = json!(tenant.to_string());
    }

    let header = URL_SAFE_NO_PAD.encode(json!({"alg": "RS256", "typ": "JWT"}).to_string());
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.test-signature")
}

pub struct Harness {
    pub deps: AppDeps,
    pub store: Arc<MemoryStore>,
    pub tracker: RecordingTracker,
}

pub fn harness(server: &MockServer) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let tracker = RecordingTracker::new();
    let config = ClientConfig::new(server.base_url());
    let deps = AppDeps::build(config, store.clone(), Arc::new(tracker.clone())).expect("deps");
    Harness {
        deps,
        store,
        tracker,
    }
}

pub fn tenant_summary(name: &str) -> TenantSummary {
    TenantSummary {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: name.to_ascii_lowercase().replace(' ', "-"),
        logo: None,
        business_type: "clinic".to_string(),
    }
}

pub fn tenant_list_body(tenants: &[TenantSummary]) -> Value {
    serde_json::to_value(tenants).expect("serialize tenants")
}

pub fn tenant_detail_body(tenant: &TenantSummary, modules: &[&str]) -> Value {
    json!({
        "id": tenant.id.to_string(),
        "name": tenant.name,
        "slug": tenant.slug,
        "businessType": tenant.business_type,
        "settings": {"timezone": "UTC", "currency": "USD", "locale": "en"},
        "enabledModules": modules,
    })
}

pub fn subscription_body(tier: &str, modules: &[&str]) -> Value {
    json!({
        "hasSubscription": true,
        "isActive": true,
        "isTrial": false,
        "daysRemaining": 21,
        "tier": tier,
        "enabledModules": modules,
    })
}

/// Block until the tenant machine reaches a state matching the predicate.
/// Subscribes to the watch channel, so the wait is event-driven rather than
/// a timing guess; the timeout only bounds a genuinely broken listener.
pub async fn wait_for_tenants<F>(deps: &AppDeps, description: &str, predicate: F)
where
    F: Fn(&TenantState) -> bool,
{
    let mut rx = deps.tenants.subscribe();
    let wait = async {
        loop {
            if predicate(&rx.borrow_and_update()) {
                return;
            }
            if rx.changed().await.is_err() {
                panic!("tenant state channel closed while waiting for {description}");
            }
        }
    };
    tokio::time::timeout(std::time::Duration::from_secs(5), wait)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {description}"));
}

/// Wait for the auth-gated autoload to finish resolving the tenant context.
pub async fn settle(deps: &AppDeps) {
    wait_for_tenants(deps, "tenant resolution", TenantState::is_settled).await;
}

/// Bounded sleep for asserting that something does NOT happen; there is no
/// state change to await in that case.
pub async fn pause() {
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
}
