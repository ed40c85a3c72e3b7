use std::sync::Arc;

use chrono::Duration;
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use common_telemetry::Tracker;

use crate::api::{ApiClient, LoginRequest, SessionUser};
use crate::claims::Claims;
use crate::storage::{AuthTokens, StateStore};

/// Session lifecycle. `Initial` and `Loading` are transient and always
/// `bootstrapped=false`; routing must park on the splash view until the
/// first terminal state arrives.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Initial,
    Loading,
    Authenticated { user: SessionUser, bootstrapped: bool },
    Unauthenticated { bootstrapped: bool },
    Error { message: String, bootstrapped: bool },
}

impl AuthState {
    pub fn bootstrapped(&self) -> bool {
        match self {
            AuthState::Initial | AuthState::Loading => false,
            AuthState::Authenticated { bootstrapped, .. }
            | AuthState::Unauthenticated { bootstrapped }
            | AuthState::Error { bootstrapped, .. } => *bootstrapped,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }

    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            AuthState::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }
}

/// Drives the auth state machine and owns token persistence. Terminal states
/// are published over a watch channel only after a handler fully completes,
/// so subscribers never observe a contradicting intermediate emission.
pub struct SessionManager {
    api: Arc<ApiClient>,
    store: Arc<dyn StateStore>,
    tracker: Arc<dyn Tracker>,
    leeway: Duration,
    state_tx: watch::Sender<AuthState>,
}

impl SessionManager {
    pub fn new(
        api: Arc<ApiClient>,
        store: Arc<dyn StateStore>,
        tracker: Arc<dyn Tracker>,
        leeway_secs: i64,
    ) -> Self {
        let (state_tx, _) = watch::channel(AuthState::Initial);
        Self {
            api,
            store,
            tracker,
            leeway: Duration::seconds(leeway_secs),
            state_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    fn emit(&self, state: AuthState) {
        self.state_tx.send_replace(state);
    }

    /// Process-start bootstrap. Completes the whole sequence, including an
    /// inline refresh attempt, before emitting a terminal state; never leaves
    /// the machine in `Loading`.
    pub async fn check(&self) {
        self.emit(AuthState::Loading);
        let state = self.run_check().await;
        self.emit(state);
    }

    async fn run_check(&self) -> AuthState {
        let Some(tokens) = self.store.read_tokens().await else {
            debug!("no stored tokens, skipping network");
            return AuthState::Unauthenticated { bootstrapped: true };
        };

        match Claims::decode_unverified(&tokens.access_token) {
            Ok(claims) if !claims.is_expired(self.leeway) => {
                self.api.tokens().set(tokens);
                let user = user_from_claims(&claims);
                self.tracker
                    .track_event("session_restored", json!({"userId": user.id}));
                AuthState::Authenticated {
                    user,
                    bootstrapped: true,
                }
            }
            Ok(_expired) => self.refresh_into_state(tokens).await,
            Err(err) => {
                warn!(%err, "stored access token unreadable, clearing session");
                self.tracker.track_error("session", &err.to_string());
                self.clear_session().await;
                AuthState::Unauthenticated { bootstrapped: true }
            }
        }
    }

    async fn refresh_into_state(&self, tokens: AuthTokens) -> AuthState {
        match self.api.refresh(&tokens.refresh_token).await {
            Ok(response) => {
                let refreshed = AuthTokens {
                    access_token: response.access_token,
                    refresh_token: response.refresh_token.unwrap_or(tokens.refresh_token),
                };
                match Claims::decode_unverified(&refreshed.access_token) {
                    Ok(claims) => {
                        self.store.write_tokens(&refreshed).await;
                        self.api.tokens().set(refreshed);
                        let user = user_from_claims(&claims);
                        self.tracker
                            .track_event("session_refreshed", json!({"userId": user.id}));
                        AuthState::Authenticated {
                            user,
                            bootstrapped: true,
                        }
                    }
                    Err(err) => {
                        warn!(%err, "refreshed access token unreadable");
                        self.tracker.track_error("session", &err.to_string());
                        self.clear_session().await;
                        AuthState::Unauthenticated { bootstrapped: true }
                    }
                }
            }
            Err(err) => {
                warn!(%err, "token refresh failed, clearing session");
                self.tracker.track_error("session", &err.to_string());
                self.clear_session().await;
                AuthState::Unauthenticated { bootstrapped: true }
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str, tenant_id: Option<Uuid>) {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            tenant_id,
        };

        match self.api.login(&request).await {
            Ok(response) => {
                let tokens = AuthTokens {
                    access_token: response.access_token,
                    refresh_token: response.refresh_token,
                };
                self.store.write_tokens(&tokens).await;
                self.api.tokens().set(tokens);
                self.tracker
                    .track_event("login_succeeded", json!({"userId": response.user.id}));
                self.emit(AuthState::Authenticated {
                    user: response.user,
                    bootstrapped: true,
                });
            }
            Err(err) => {
                self.tracker.track_error("login", &err.to_string());
                // Login happens past the splash gate; errors are bootstrapped.
                self.emit(AuthState::Error {
                    message: err.to_string(),
                    bootstrapped: true,
                });
            }
        }
    }

    /// Best-effort server logout, then local teardown. Always ends in
    /// `Unauthenticated` regardless of what the server said.
    pub async fn logout(&self) {
        if self.api.tokens().get().is_some() {
            if let Err(err) = self.api.logout().await {
                debug!(%err, "logout call failed, clearing locally anyway");
            }
        }
        self.tracker.track_event("logout", json!({}));
        self.clear_session().await;
        self.emit(AuthState::Unauthenticated { bootstrapped: true });
    }

    /// Background refresh outside the initial bootstrap.
    pub async fn refresh(&self) {
        let tokens = match self.api.tokens().get() {
            Some(tokens) => Some(tokens),
            None => self.store.read_tokens().await,
        };
        let Some(tokens) = tokens else {
            self.emit(AuthState::Unauthenticated { bootstrapped: true });
            return;
        };
        let state = self.refresh_into_state(tokens).await;
        self.emit(state);
    }

    async fn clear_session(&self) {
        self.api.tokens().clear();
        self.store.clear_tokens().await;
        self.store.clear_current_tenant().await;
    }
}

fn user_from_claims(claims: &Claims) -> SessionUser {
    SessionUser {
        id: claims.subject,
        name: claims.name.clone(),
        email: claims.email.clone(),
        role: claims.role,
        tenant_id: claims.tenant_id,
    }
}
