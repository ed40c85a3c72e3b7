use serde::Deserialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Failure taxonomy for every network boundary in the client. Transport and
/// decode failures are always converted by callers into the safest state
/// (logged out, no module access); `StepUpRequired` is expected control flow,
/// not a failure.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed server response: {0}")]
    Decode(String),
    #[error("unauthorized ({code}): {message}")]
    Unauthorized { code: String, message: String },
    #[error("forbidden ({code}): {message}")]
    Forbidden { code: String, message: String },
    #[error("step-up verification required: {message}")]
    StepUpRequired {
        challenge_id: Option<String>,
        message: String,
    },
    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn is_step_up(&self) -> bool {
        matches!(self, ApiError::StepUpRequired { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            ApiError::Decode(value.to_string())
        } else {
            ApiError::Transport(value.to_string())
        }
    }
}

/// Error payload shape shared by the API's non-2xx responses. Every field is
/// optional; servers under incident can reply with bare status lines.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub challenge_id: Option<String>,
}

impl ErrorBody {
    pub fn code_or(&self, fallback: &str) -> String {
        self.code.clone().unwrap_or_else(|| fallback.to_string())
    }

    pub fn message_or(&self, fallback: &str) -> String {
        self.message.clone().unwrap_or_else(|| fallback.to_string())
    }
}

pub fn error_for_status(status: u16, body: ErrorBody) -> ApiError {
    match status {
        401 => ApiError::Unauthorized {
            code: body.code_or("unauthorized"),
            message: body.message_or("authentication required"),
        },
        403 => ApiError::Forbidden {
            code: body.code_or("forbidden"),
            message: body.message_or("access denied"),
        },
        428 => ApiError::StepUpRequired {
            message: body.message_or("secondary verification required"),
            challenge_id: body.challenge_id,
        },
        other => ApiError::Status {
            status: other,
            message: body.message_or("request failed"),
        },
    }
}
