//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Chatline
///
/// This is the error surfaced across crate boundaries (ports in
/// `chatline-core`). Transport-level detail lives in the infra `ApiError`,
/// which converts into this type.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ChatlineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatlineError {
    /// Message without the category prefix, suitable for showing to a user.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Config(msg)
            | Self::Storage(msg)
            | Self::Network(msg)
            | Self::Timeout(msg)
            | Self::Auth(msg)
            | Self::Validation(msg)
            | Self::Server(msg)
            | Self::NotFound(msg)
            | Self::InvalidInput(msg)
            | Self::Internal(msg) => msg,
        }
    }
}

/// Result type alias for Chatline operations
pub type Result<T> = std::result::Result<T, ChatlineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_strips_category() {
        let err = ChatlineError::Validation("Email already taken".to_string());
        assert_eq!(err.user_message(), "Email already taken");
        assert_eq!(err.to_string(), "Validation error: Email already taken");
    }

    #[test]
    fn serializes_with_type_tag() {
        let err = ChatlineError::Auth("expired".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "Auth");
        assert_eq!(json["message"], "expired");
    }
}
