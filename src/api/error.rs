use reqwest::StatusCode;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Failures talking to the BI backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Transport failures and 5xx responses are worth retrying by hand.
    /// Nothing in the crate retries automatically.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Status { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    /// Message suitable for a toast or error panel. Prefers the backend's
    /// `error`/`message` field when the body is JSON.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { status, body } => {
                let detail = serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|v| {
                        v.get("error")
                            .or_else(|| v.get("message"))
                            .and_then(|m| m.as_str())
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| body.trim().to_string());
                if detail.is_empty() {
                    format!("Request failed with status {}", status.as_u16())
                } else {
                    detail
                }
            }
            other => other.to_string(),
        }
    }
}
