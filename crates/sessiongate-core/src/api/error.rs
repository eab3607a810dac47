use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use super::client::AbortReason;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The backend rejected the session mid-flight. The stored session has
    /// already been cleared and the application sent to the login route;
    /// callers should stop rather than report their own failure.
    #[error("Session expired - please log in again")]
    SessionExpired,

    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Request failed with status {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Truncate a response body to avoid logging excessive data
pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        body.to_string()
    } else {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }
}

/// Best user-facing message for a failed response: the body's `message` or
/// `error` field, else the raw body, else the status reason.
pub(crate) fn server_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "error"] {
            if let Some(message) = value.get(field).and_then(|v| v.as_str()) {
                if !message.is_empty() {
                    return truncate_body(message);
                }
            }
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        truncate_body(trimmed)
    } else {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
    }
}

impl ApiError {
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = server_message(status, body);
        match status.as_u16() {
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(message),
            _ => ApiError::Status { status, message },
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout(_))
    }
}

impl From<AbortReason> for ApiError {
    fn from(reason: AbortReason) -> Self {
        match reason {
            AbortReason::TimedOut(after) => ApiError::Timeout(after),
            AbortReason::Cancelled => ApiError::Cancelled,
        }
    }
}
