use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use common_access::Role;

use crate::config::ClientConfig;
use crate::error::{error_for_status, ApiError, ApiResult, ErrorBody};
use crate::storage::{AuthTokens, StateStore};
use crate::subscription::Tier;

/// Shared mutable slot for the live token pair. The session machine writes it
/// on login/refresh; the client reads it to stamp bearer headers.
#[derive(Clone, Default)]
pub struct TokenCell {
    inner: Arc<RwLock<Option<AuthTokens>>>,
}

impl TokenCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<AuthTokens> {
        self.inner.read().expect("rwlock poisoned").clone()
    }

    pub fn set(&self, tokens: AuthTokens) {
        *self.inner.write().expect("rwlock poisoned") = Some(tokens);
    }

    pub fn clear(&self) {
        *self.inner.write().expect("rwlock poisoned") = None;
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: SessionUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub logo: Option<String>,
    pub business_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSettings {
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub logo: Option<String>,
    pub business_type: String,
    #[serde(default)]
    pub settings: Option<TenantSettings>,
    #[serde(default)]
    pub enabled_modules: Vec<String>,
}

impl Tenant {
    pub fn summary(&self) -> TenantSummary {
        TenantSummary {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            logo: self.logo.clone(),
            business_type: self.business_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusResponse {
    pub has_subscription: bool,
    pub is_active: bool,
    #[serde(default)]
    pub is_trial: bool,
    #[serde(default)]
    pub days_remaining: Option<i64>,
    pub tier: Tier,
    #[serde(default)]
    pub enabled_modules: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleAccessResponse {
    pub allowed: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub upgrade_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavItem {
    pub label: String,
    pub path: String,
    #[serde(default)]
    pub required_permission: Option<String>,
    #[serde(default)]
    pub required_module: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub tier: Tier,
    #[serde(default)]
    pub enabled_modules: Vec<String>,
    #[serde(default)]
    pub navigation: Vec<NavItem>,
}

/// Typed client over the platform API. Authorized calls stamp the current
/// bearer token and retry exactly once after a transparent refresh when the
/// server answers 401.
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: TokenCell,
    store: Option<Arc<dyn StateStore>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, tokens: TokenCell) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            tokens,
            store: None,
        })
    }

    /// Persist token rotations through this store. Without it a pair rotated
    /// by the transparent 401 refresh would live only in memory and the next
    /// boot would replay an already-consumed refresh token.
    pub fn persist_to(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn tokens(&self) -> &TokenCell {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        bearer: Option<&str>,
    ) -> ApiResult<Response> {
        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Authorized dispatch with the single-retry-on-401 refresh policy.
    async fn authorized(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> ApiResult<Response> {
        let access = self
            .tokens
            .get()
            .map(|tokens| tokens.access_token)
            .ok_or_else(|| ApiError::Unauthorized {
                code: "no_session".to_string(),
                message: "no active session".to_string(),
            })?;

        let response = self
            .send(method.clone(), path, body, Some(&access))
            .await?;
        if response.status().as_u16() != 401 {
            return Ok(response);
        }

        debug!(path, "401 response, attempting one token refresh");
        let refreshed = self.refresh_current().await?;
        self.send(method, path, body, Some(&refreshed.access_token))
            .await
    }

    /// Refresh using the cell's refresh token, then update both the cell and
    /// the persistent store so the rotated pair survives a process exit.
    async fn refresh_current(&self) -> ApiResult<AuthTokens> {
        let current = self.tokens.get().ok_or_else(|| ApiError::Unauthorized {
            code: "no_session".to_string(),
            message: "no active session".to_string(),
        })?;

        let refreshed = self.refresh(&current.refresh_token).await?;
        let tokens = AuthTokens {
            access_token: refreshed.access_token,
            refresh_token: refreshed
                .refresh_token
                .unwrap_or(current.refresh_token),
        };
        self.tokens.set(tokens.clone());
        if let Some(store) = &self.store {
            store.write_tokens(&tokens).await;
        }
        Ok(tokens)
    }

    pub async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
        let body = serde_json::to_value(request)
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        let response = self
            .send(Method::POST, "/api/auth/login", Some(&body), None)
            .await?;
        decode_json(response).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<RefreshResponse> {
        let body = serde_json::to_value(RefreshRequest { refresh_token })
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        let response = self
            .send(Method::POST, "/api/auth/refresh", Some(&body), None)
            .await?;
        decode_json(response).await
    }

    pub async fn logout(&self) -> ApiResult<()> {
        let response = self
            .authorized(Method::POST, "/api/auth/logout", None)
            .await?;
        expect_success(response).await
    }

    pub async fn dashboard(&self) -> ApiResult<DashboardSummary> {
        let response = self.authorized(Method::GET, "/api/dashboard", None).await?;
        decode_json(response).await
    }

    pub async fn subscription_status(&self) -> ApiResult<SubscriptionStatusResponse> {
        let response = self
            .authorized(Method::GET, "/api/dashboard/subscription/status", None)
            .await?;
        decode_json(response).await
    }

    pub async fn module_access(&self, module_id: &str) -> ApiResult<ModuleAccessResponse> {
        let path = format!("/api/dashboard/modules/{module_id}/access");
        let response = self.authorized(Method::GET, &path, None).await?;
        decode_json(response).await
    }

    pub async fn tenants(&self) -> ApiResult<Vec<TenantSummary>> {
        let response = self.authorized(Method::GET, "/api/tenants", None).await?;
        decode_json(response).await
    }

    pub async fn tenant(&self, id: Uuid) -> ApiResult<Tenant> {
        let path = format!("/api/tenants/{id}");
        let response = self.authorized(Method::GET, &path, None).await?;
        decode_json(response).await
    }

    /// Revoke one session. HTTP 428 surfaces as `ApiError::StepUpRequired`;
    /// the caller presents secondary verification and retries the same call.
    pub async fn revoke_session(&self, session_id: Uuid) -> ApiResult<()> {
        let path = format!("/api/security/sessions/{session_id}/revoke");
        let response = self.authorized(Method::POST, &path, None).await?;
        expect_success(response).await
    }

    pub async fn revoke_all_sessions(&self) -> ApiResult<()> {
        let response = self
            .authorized(Method::POST, "/api/security/sessions/revoke-all", None)
            .await?;
        expect_success(response).await
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    if status.is_success() {
        response
            .json::<T>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    } else {
        let body = response.json::<ErrorBody>().await.unwrap_or_default();
        Err(error_for_status(status.as_u16(), body))
    }
}

async fn expect_success(response: Response) -> ApiResult<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        let body = response.json::<ErrorBody>().await.unwrap_or_default();
        Err(error_for_status(status.as_u16(), body))
    }
}
