//! Conversions from external infrastructure errors into domain errors.

use chatline_domain::ChatlineError;
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;

use crate::api::errors::ApiError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub ChatlineError);

impl From<InfraError> for ChatlineError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ChatlineError> for InfraError {
    fn from(value: ChatlineError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoChatlineError {
    fn into_chatline(self) -> ChatlineError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ChatlineError */
/* -------------------------------------------------------------------------- */

impl IntoChatlineError for HttpError {
    fn into_chatline(self) -> ChatlineError {
        if self.is_timeout() {
            return ChatlineError::Timeout("HTTP request timed out".into());
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return ChatlineError::Network(format!("HTTP connection failure: {self}"));
        }

        if self.is_builder() {
            return ChatlineError::InvalidInput(format!("invalid HTTP request: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => ChatlineError::Auth(message),
                404 => ChatlineError::NotFound(message),
                400 | 422 => ChatlineError::Validation(message),
                500..=599 => ChatlineError::Server(message),
                _ => ChatlineError::Network(message),
            };
        }

        ChatlineError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_chatline())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → ChatlineError */
/* -------------------------------------------------------------------------- */

impl IntoChatlineError for JsonError {
    fn into_chatline(self) -> ChatlineError {
        if self.is_io() {
            ChatlineError::Internal(format!("JSON I/O failure: {self}"))
        } else {
            ChatlineError::InvalidInput(format!("invalid JSON: {self}"))
        }
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_chatline())
    }
}

/* -------------------------------------------------------------------------- */
/* ApiError → ChatlineError */
/* -------------------------------------------------------------------------- */

impl IntoChatlineError for ApiError {
    fn into_chatline(self) -> ChatlineError {
        let message = self.display_message();
        match self {
            ApiError::Timeout(_) => ChatlineError::Timeout(message),
            ApiError::Network(_) => ChatlineError::Network(message),
            ApiError::AuthRequired | ApiError::Authentication { .. } => {
                ChatlineError::Auth(message)
            }
            ApiError::Validation { .. } => ChatlineError::Validation(message),
            ApiError::Server { .. } => ChatlineError::Server(message),
            ApiError::Client { status: 404, .. } => ChatlineError::NotFound(message),
            ApiError::Client { status: 401 | 403, .. } => ChatlineError::Auth(message),
            ApiError::Client { .. } | ApiError::InvalidRequest(_) => {
                ChatlineError::InvalidInput(message)
            }
            ApiError::Decode { .. } | ApiError::Cancelled => ChatlineError::Internal(message),
            ApiError::Config(_) => ChatlineError::Config(message),
        }
    }
}

impl From<ApiError> for InfraError {
    fn from(value: ApiError) -> Self {
        InfraError(value.into_chatline())
    }
}

impl From<ApiError> for ChatlineError {
    fn from(value: ApiError) -> Self {
        value.into_chatline()
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
