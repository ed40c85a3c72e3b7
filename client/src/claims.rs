use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use common_access::Role;

use crate::error::{ApiError, ApiResult};

/// Application-focused view of the access-token payload. The client never
/// verifies the signature; the server re-validates every request, so this is
/// a display/routing convenience only.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    pub subject: Uuid,
    pub tenant_id: Option<Uuid>,
    pub role: Role,
    pub email: Option<String>,
    pub name: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
}

impl Claims {
    /// Decode the payload of an access token without signature verification.
    /// Expiry is intentionally not validated here; the session machine decides
    /// whether an expired token is a refresh trigger or a dead end.
    pub fn decode_unverified(token: &str) -> ApiResult<Claims> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims::<&str>(&[]);

        let data = decode::<Value>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|err| ApiError::Decode(format!("access token: {err}")))?;
        Claims::try_from(data.claims)
    }

    pub fn is_expired(&self, leeway: Duration) -> bool {
        self.expires_at + leeway <= Utc::now()
    }
}

#[derive(Debug, Deserialize)]
struct ClaimsRepr {
    sub: String,
    #[serde(rename = "tid", default)]
    tenant_id: Option<String>,
    #[serde(default)]
    role: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
}

impl TryFrom<ClaimsRepr> for Claims {
    type Error = ApiError;

    fn try_from(value: ClaimsRepr) -> ApiResult<Self> {
        let subject = Uuid::parse_str(&value.sub)
            .map_err(|_| ApiError::Decode(format!("invalid sub claim '{}'", value.sub)))?;

        let tenant_id = match value.tenant_id {
            Some(raw) => Some(
                Uuid::parse_str(&raw)
                    .map_err(|_| ApiError::Decode(format!("invalid tid claim '{raw}'")))?,
            ),
            None => None,
        };

        let expires_at = Utc
            .timestamp_opt(value.exp, 0)
            .single()
            .ok_or_else(|| ApiError::Decode(format!("invalid exp claim '{}'", value.exp)))?;

        let issued_at = match value.iat {
            Some(iat) => Some(
                Utc.timestamp_opt(iat, 0)
                    .single()
                    .ok_or_else(|| ApiError::Decode(format!("invalid iat claim '{iat}'")))?,
            ),
            None => None,
        };

        Ok(Self {
            subject,
            tenant_id,
            role: Role::parse_or_default(&value.role),
            email: value.email,
            name: value.name,
            expires_at,
            issued_at,
        })
    }
}

impl TryFrom<Value> for Claims {
    type Error = ApiError;

    fn try_from(value: Value) -> ApiResult<Self> {
        let repr: ClaimsRepr = serde_json::from_value(value)
            .map_err(|err| ApiError::Decode(format!("claim payload: {err}")))?;
        Claims::try_from(repr)
    }
}
