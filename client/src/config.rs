use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

pub const DEFAULT_SUBSCRIPTION_TTL_SECS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_TOKEN_LEEWAY_SECS: i64 = 30;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the platform API, without a trailing slash.
    pub api_base_url: String,
    /// Maximum age of a cached subscription status before a refetch.
    pub subscription_ttl: Duration,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Clock skew tolerated when deciding whether an access token is expired.
    pub token_leeway_secs: i64,
    /// Location of the persisted session state file. None keeps state in memory.
    pub state_path: Option<PathBuf>,
    /// Base64-encoded 32-byte key sealing the state file. Required whenever
    /// `state_path` is set; tokens are never persisted in plaintext.
    pub state_key: Option<String>,
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        let base = api_base_url.into();
        Self {
            api_base_url: base.trim_end_matches('/').to_string(),
            subscription_ttl: Duration::from_secs(DEFAULT_SUBSCRIPTION_TTL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            token_leeway_secs: DEFAULT_TOKEN_LEEWAY_SECS,
            state_path: None,
            state_key: None,
        }
    }

    pub fn with_subscription_ttl(mut self, ttl: Duration) -> Self {
        self.subscription_ttl = ttl;
        self
    }

    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }
}

pub fn load_client_config() -> Result<ClientConfig> {
    let api_base_url = env::var("OPSHUB_API_BASE_URL")
        .ok()
        .and_then(|value| normalize_optional(&value))
        .ok_or_else(|| anyhow!("OPSHUB_API_BASE_URL must be set"))?;

    let subscription_ttl = secs_from_env("OPSHUB_SUBSCRIPTION_TTL_SECS")
        .context("Failed to parse OPSHUB_SUBSCRIPTION_TTL_SECS")?
        .unwrap_or(DEFAULT_SUBSCRIPTION_TTL_SECS);

    let request_timeout = secs_from_env("OPSHUB_REQUEST_TIMEOUT_SECS")
        .context("Failed to parse OPSHUB_REQUEST_TIMEOUT_SECS")?
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

    let state_path = env::var("OPSHUB_STATE_PATH")
        .ok()
        .and_then(|value| normalize_optional(&value))
        .map(PathBuf::from);

    let state_key = env::var("OPSHUB_STATE_KEY")
        .ok()
        .and_then(|value| normalize_optional(&value));

    if state_path.is_some() && state_key.is_none() {
        return Err(anyhow!(
            "OPSHUB_STATE_KEY must be set when OPSHUB_STATE_PATH is used"
        ));
    }

    let mut config = ClientConfig::new(api_base_url)
        .with_subscription_ttl(Duration::from_secs(subscription_ttl));
    config.request_timeout = Duration::from_secs(request_timeout);
    config.state_path = state_path;
    config.state_key = state_key;
    Ok(config)
}

fn secs_from_env(key: &str) -> Result<Option<u64>> {
    match env::var(key) {
        Ok(value) => parse_secs(&value),
        Err(_) => Ok(None),
    }
}

fn parse_secs(value: &str) -> Result<Option<u64>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let secs = trimmed
        .parse::<u64>()
        .map_err(|err| anyhow!("Invalid seconds value '{trimmed}': {err}"))?;
    Ok(Some(secs))
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
