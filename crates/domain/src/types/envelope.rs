//! Backend response envelope
//!
//! Every JSON endpoint answers `{ success, message?, data? }`. Some endpoints
//! add fields beside `data` (`user`, `userData`, `avatarUrl`, `settings`);
//! those are kept in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::user::UserProfile;

/// Standard `{ success, message, data }` response wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T = Value> {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "none", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const fn none<T>() -> Option<T> {
    None
}

impl<T> ApiEnvelope<T> {
    /// Top-level field that is not part of the standard envelope.
    pub fn extra_field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key).filter(|value| !value.is_null())
    }
}

impl ApiEnvelope<Value> {
    /// Field from `data`, falling back to the top level.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data
            .as_ref()
            .and_then(|data| data.get(key))
            .filter(|value| !value.is_null())
            .or_else(|| self.extra_field(key))
    }

    /// Message from the server or the given fallback.
    pub fn message_or(&self, fallback: &str) -> String {
        self.message.clone().unwrap_or_else(|| fallback.to_string())
    }
}

/// `data` of a successful login or registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}
