mod support;

use std::sync::Arc;

use httpmock::prelude::*;
use serde_json::json;
use uuid::Uuid;

use common_access::Role;
use opshub_client::{AppDeps, AuthState, AuthTokens, ClientConfig, StateStore};
use support::{forge_token, harness, settle, tenant_list_body, tenant_summary};

#[tokio::test(flavor = "multi_thread")]
async fn boot_with_valid_token_authenticates_without_refresh() {
    let server = MockServer::start();
    let tenant = tenant_summary("Bright Clinic");
    let tenants = server.mock(|when, then| {
        when.method(GET).path("/api/tenants");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(tenant_list_body(&[tenant.clone()]));
    });
    let refresh = server.mock(|when, then| {
        when.method(POST).path("/api/auth/refresh");
        then.status(200).body("{}");
    });

    let ctx = harness(&server);
    let subject = Uuid::new_v4();
    ctx.store
        .write_tokens(&AuthTokens {
            access_token: forge_token(subject, Some(tenant.id), "manager", 600),
            refresh_token: "refresh-1".to_string(),
        })
        .await;

    ctx.deps.bootstrap().await;

    match ctx.deps.session.state() {
        AuthState::Authenticated { user, bootstrapped } => {
            assert!(bootstrapped);
            assert_eq!(user.id, subject);
            assert_eq!(user.role, Role::Manager);
            assert_eq!(user.tenant_id, Some(tenant.id));
        }
        other => panic!("unexpected state: {other:?}"),
    }

    refresh.assert_hits(0);
    settle(&ctx.deps).await;
    tenants.assert_hits(1);
}

#[tokio::test(flavor = "multi_thread")]
async fn boot_with_expired_token_refreshes_exactly_once() {
    let server = MockServer::start();
    let subject = Uuid::new_v4();
    // The refreshed token carries a different role, proving the emitted user
    // is decoded from the new access token rather than the stale one.
    let new_access = forge_token(subject, None, "manager", 600);
    let refresh = server.mock(|when, then| {
        when.method(POST)
            .path("/api/auth/refresh")
            .json_body(json!({"refreshToken": "refresh-1"}));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"accessToken": new_access, "refreshToken": "refresh-2"}));
    });
    let tenants = server.mock(|when, then| {
        when.method(GET).path("/api/tenants");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!([]));
    });

    let ctx = harness(&server);
    ctx.store
        .write_tokens(&AuthTokens {
            access_token: forge_token(subject, None, "staff", -600),
            refresh_token: "refresh-1".to_string(),
        })
        .await;

    ctx.deps.bootstrap().await;

    match ctx.deps.session.state() {
        AuthState::Authenticated { user, bootstrapped } => {
            assert!(bootstrapped);
            assert_eq!(user.role, Role::Manager);
        }
        other => panic!("unexpected state: {other:?}"),
    }
    refresh.assert_hits(1);

    // The rotated pair is what got persisted.
    let stored = ctx.store.read_tokens().await.expect("tokens persisted");
    assert_eq!(stored.access_token, new_access);
    assert_eq!(stored.refresh_token, "refresh-2");

    settle(&ctx.deps).await;
    tenants.assert_hits(1);
}

#[tokio::test(flavor = "multi_thread")]
async fn boot_refresh_failure_clears_tokens_and_tenant() {
    let server = MockServer::start();
    let refresh = server.mock(|when, then| {
        when.method(POST).path("/api/auth/refresh");
        then.status(401)
            .header("content-type", "application/json")
            .body(r#"{"code":"refresh_revoked"}"#);
    });

    let ctx = harness(&server);
    ctx.store
        .write_tokens(&AuthTokens {
            access_token: forge_token(Uuid::new_v4(), None, "admin", -600),
            refresh_token: "revoked".to_string(),
        })
        .await;
    ctx.store
        .write_current_tenant(&tenant_summary("Old Tenant"))
        .await;

    ctx.deps.bootstrap().await;

    assert_eq!(
        ctx.deps.session.state(),
        AuthState::Unauthenticated { bootstrapped: true }
    );
    refresh.assert_hits(1);
    assert!(ctx.store.read_tokens().await.is_none());
    assert!(ctx.store.read_current_tenant().await.is_none());
    assert_eq!(ctx.tracker.errors().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn login_then_logout_leaves_nothing_for_the_next_boot() {
    let server = MockServer::start();
    let subject = Uuid::new_v4();
    let access = forge_token(subject, None, "admin", 600);
    let login = server.mock(|when, then| {
        when.method(POST).path("/api/auth/login");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "user": {"id": subject.to_string(), "name": "Ada", "email": "ada@example.com", "role": "admin"},
                "accessToken": access,
                "refreshToken": "refresh-1",
            }));
    });
    let logout = server.mock(|when, then| {
        when.method(POST).path("/api/auth/logout");
        then.status(204);
    });
    let refresh = server.mock(|when, then| {
        when.method(POST).path("/api/auth/refresh");
        then.status(200).body("{}");
    });
    let tenants = server.mock(|when, then| {
        when.method(GET).path("/api/tenants");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!([]));
    });

    let ctx = harness(&server);
    ctx.deps.session.login("ada@example.com", "pw", None).await;
    assert!(ctx.deps.session.state().is_authenticated());
    assert!(ctx.store.read_tokens().await.is_some());
    login.assert_hits(1);
    settle(&ctx.deps).await;

    ctx.deps.logout().await;
    logout.assert_hits(1);
    assert_eq!(
        ctx.deps.session.state(),
        AuthState::Unauthenticated { bootstrapped: true }
    );
    assert!(ctx.store.read_tokens().await.is_none());
    assert!(ctx.store.read_current_tenant().await.is_none());

    // A second boot over the same store finds nothing and stays offline.
    let rebooted = AppDeps::build(
        ClientConfig::new(server.base_url()),
        ctx.store.clone(),
        Arc::new(ctx.tracker.clone()),
    )
    .expect("deps");
    rebooted.bootstrap().await;
    assert_eq!(
        rebooted.session.state(),
        AuthState::Unauthenticated { bootstrapped: true }
    );
    refresh.assert_hits(0);
    let _ = tenants;
}

#[tokio::test(flavor = "multi_thread")]
async fn background_refresh_failure_logs_the_user_out() {
    let server = MockServer::start();
    let tenants = server.mock(|when, then| {
        when.method(GET).path("/api/tenants");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!([]));
    });
    let refresh = server.mock(|when, then| {
        when.method(POST).path("/api/auth/refresh");
        then.status(401).body(r#"{"code":"refresh_revoked"}"#);
    });

    let ctx = harness(&server);
    ctx.store
        .write_tokens(&AuthTokens {
            access_token: forge_token(Uuid::new_v4(), None, "staff", 600),
            refresh_token: "refresh-1".to_string(),
        })
        .await;
    ctx.deps.bootstrap().await;
    assert!(ctx.deps.session.state().is_authenticated());
    settle(&ctx.deps).await;

    ctx.deps.session.refresh().await;
    assert_eq!(
        ctx.deps.session.state(),
        AuthState::Unauthenticated { bootstrapped: true }
    );
    refresh.assert_hits(1);
    assert!(ctx.store.read_tokens().await.is_none());
    let _ = tenants;
}
