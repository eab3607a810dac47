//! Bearer token claim decoding.
//!
//! Only the payload segment is decoded; the signature is the backend's
//! business. Expiry is read from the `exp` claim and nothing else, so a
//! token revoked server-side stays "valid" here until the backend answers
//! with 401.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use super::error::TokenError;

/// Registered claims this crate cares about
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claims {
    /// NumericDate, which may carry a fractional part
    #[serde(default)]
    pub exp: Option<f64>,
}

impl Claims {
    pub fn expires_at(&self) -> Result<DateTime<Utc>, TokenError> {
        let exp = self.exp.ok_or(TokenError::MissingExpiry)?;
        if !exp.is_finite() {
            return Err(TokenError::InvalidExpiry(exp));
        }
        // Sub-millisecond precision is dropped
        let millis = (exp * 1000.0).floor();
        if millis.abs() > i64::MAX as f64 {
            return Err(TokenError::InvalidExpiry(exp));
        }
        DateTime::from_timestamp_millis(millis as i64).ok_or(TokenError::InvalidExpiry(exp))
    }
}

/// Decode the claims segment of a JWT without verifying it.
pub fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::Malformed("expected three segments".to_string()));
    }

    // Some issuers pad the segment even though RFC 7515 says not to
    let payload = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| TokenError::Malformed(format!("payload encoding: {}", e)))?;

    serde_json::from_slice(&payload)
        .map_err(|e| TokenError::Malformed(format!("payload json: {}", e)))
}

/// Expiry instant embedded in `token`
pub fn expires_at(token: &str) -> Result<DateTime<Utc>, TokenError> {
    decode_claims(token)?.expires_at()
}

/// True iff the token's expiry is strictly after `now`.
/// Tokens that fail to decode are never valid.
pub fn is_valid_at(token: &str, now: DateTime<Utc>) -> bool {
    expires_at(token).map(|exp| exp > now).unwrap_or(false)
}

/// Time left before `token` expires, zero once it has
pub fn time_until_expiry(token: &str, now: DateTime<Utc>) -> Result<Duration, TokenError> {
    let remaining = expires_at(token)? - now;
    Ok(remaining.max(Duration::zero()))
}

/// Build an unsigned token carrying the given `exp`. Test helper.
#[cfg(test)]
pub(crate) fn unsigned_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"a@example.com","exp":{}}}"#, exp));
    format!("{}.{}.sig", header, payload)
}
