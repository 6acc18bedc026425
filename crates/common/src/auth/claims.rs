//! JWT payload claims
//!
//! Only the payload segment is decoded; the signature is not checked. The
//! server remains the authority on validity, the client just avoids sending
//! tokens it already knows are stale.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;

/// Errors decoding a JWT payload
#[derive(Debug, Error)]
pub enum ClaimsError {
    #[error("token is not a three-part JWT")]
    Malformed,

    #[error("payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Registered claims the client cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Expiry, seconds since the Unix epoch.
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub sub: Option<String>,
}

impl TokenClaims {
    /// Decodes the payload segment. Padded and unpadded base64url both work.
    ///
    /// # Errors
    /// Returns [`ClaimsError`] when the token does not have three segments or
    /// the payload is not base64url-encoded JSON.
    pub fn decode(token: &str) -> Result<Self, ClaimsError> {
        let mut parts = token.split('.');
        let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
            _ => return Err(ClaimsError::Malformed),
        };

        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Seconds left before `exp`; negative once expired, `None` without
    /// `exp`.
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.exp.map(|exp| exp.saturating_sub(Utc::now().timestamp()))
    }

    pub fn is_expired(&self) -> bool {
        self.seconds_until_expiry().map_or(true, |left| left <= 0)
    }

    /// True when the token is expired or expires within `window`. Tokens
    /// without `exp` are never considered close to expiry.
    pub fn expires_within(&self, window: Duration) -> bool {
        let window = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
        self.seconds_until_expiry().is_some_and(|left| left <= window)
    }
}
