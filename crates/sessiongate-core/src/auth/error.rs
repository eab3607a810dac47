use thiserror::Error;

use crate::api::error::server_message;

/// Login failed: credentials rejected or the backend was unreachable.
/// The message is meant for the user.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{message}")]
    Rejected {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Unable to reach the authentication server: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Login response did not carry a {0} header")]
    MissingToken(String),

    #[error("Invalid login response: {0}")]
    InvalidResponse(String),

    #[error("Failed to persist session: {0}")]
    Storage(#[from] StoreError),
}

impl AuthError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        AuthError::Rejected {
            status,
            message: server_message(status, body),
        }
    }

    /// True when the backend refused the credentials themselves
    pub fn is_credential_rejection(&self) -> bool {
        matches!(self, AuthError::Rejected { status, .. } if status.as_u16() == 401 || status.as_u16() == 403)
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Keychain access failed: {0}")]
    Keyring(#[from] keyring::Error),
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token has no exp claim")]
    MissingExpiry,

    #[error("Token exp claim out of range: {0}")]
    InvalidExpiry(f64),
}
