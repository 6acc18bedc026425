//! API-specific error types
//!
//! Classifies failed calls by cause so callers can tell a timeout from a
//! dead network, an expired session from a validation problem.

use std::time::Duration;

use chatline_domain::constants::{NETWORK_ERROR_MESSAGE, TIMEOUT_MESSAGE};
use reqwest::StatusCode;
use thiserror::Error;

use crate::http::ResponseBody;

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Missing or rejected credentials (401, 403)
    Authentication,
    /// Rejected input (400, 422)
    Validation,
    /// Server errors (5xx)
    Server,
    /// Other 4xx
    Client,
    /// Transport failures and timeouts
    Network,
    /// Malformed request or response, cancellation, configuration
    Internal,
}

/// API operation errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    /// An authenticated call was attempted with no access token.
    #[error("Authentication required")]
    AuthRequired,

    /// The session could not be (re)established; the store has been cleared.
    #[error("{message}")]
    Authentication { message: String, body: ResponseBody },

    #[error("{message}")]
    Validation { status: u16, message: String, body: ResponseBody },

    #[error("{message}")]
    Server { status: u16, message: String, body: ResponseBody },

    #[error("{message}")]
    Client { status: u16, message: String, body: ResponseBody },

    #[error("Failed to decode response ({status}): {message}")]
    Decode { status: u16, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Maps a non-2xx response to an error carrying the server's message.
    ///
    /// The message is the body's `message` field, or `HTTP error! status: N`.
    pub fn from_status(status: StatusCode, body: ResponseBody) -> Self {
        let code = status.as_u16();
        let message = body
            .message()
            .map_or_else(|| format!("HTTP error! status: {code}"), ToOwned::to_owned);

        match code {
            401 => Self::Authentication { message, body },
            400 | 422 => Self::Validation { status: code, message, body },
            500..=599 => Self::Server { status: code, message, body },
            _ => Self::Client { status: code, message, body },
        }
    }

    /// Unrecoverable 401.
    pub fn authentication_failed(body: ResponseBody) -> Self {
        Self::Authentication { message: "Authentication failed".to_string(), body }
    }

    /// A 401 whose refresh failed, keeping the 401 response body.
    pub fn refresh_failed(err: &RefreshError, body: ResponseBody) -> Self {
        Self::Authentication { message: format!("Authentication failed: {err}"), body }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::AuthRequired | Self::Authentication { .. } => ApiErrorCategory::Authentication,
            Self::Client { status: 403, .. } => ApiErrorCategory::Authentication,
            Self::Validation { .. } => ApiErrorCategory::Validation,
            Self::Server { .. } => ApiErrorCategory::Server,
            Self::Client { .. } => ApiErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Decode { .. } | Self::InvalidRequest(_) | Self::Cancelled | Self::Config(_) => {
                ApiErrorCategory::Internal
            }
        }
    }

    /// HTTP status, when the server answered.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { .. } => Some(401),
            Self::Validation { status, .. }
            | Self::Server { status, .. }
            | Self::Client { status, .. }
            | Self::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed body of the failed response, if any.
    pub const fn body(&self) -> Option<&ResponseBody> {
        match self {
            Self::Authentication { body, .. }
            | Self::Validation { body, .. }
            | Self::Server { body, .. }
            | Self::Client { body, .. } => Some(body),
            _ => None,
        }
    }

    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthRequired) || matches!(self.status(), Some(401 | 403))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self.status(), Some(400 | 422))
    }

    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|status| status >= 500)
    }

    /// Message suitable for showing to a user: the server's message when
    /// there is one, otherwise a fixed description of the failure.
    pub fn display_message(&self) -> String {
        if let Some(message) = self.body().and_then(ResponseBody::message) {
            return message.to_string();
        }
        match self {
            Self::Timeout(_) => TIMEOUT_MESSAGE.to_string(),
            Self::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

/// Errors from a token refresh
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Refresh rejected with status {status}")]
    Rejected { status: u16 },

    #[error("Refresh timed out after {0:?}")]
    Timeout(Duration),

    #[error("Refresh request failed: {0}")]
    Network(String),

    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),

    #[error("Refresh task aborted")]
    Aborted,
}

/// A failed refresh always ends the session.
impl From<RefreshError> for ApiError {
    fn from(err: RefreshError) -> Self {
        Self::refresh_failed(&err, ResponseBody::Empty)
    }
}
