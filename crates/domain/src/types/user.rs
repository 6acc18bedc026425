//! User profile and request types

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::utils::json::merge_objects;

/// User record as returned by the backend and cached on the client.
///
/// Only the fields the client reads are typed; everything else the server
/// sends (settings, address, role flags) is preserved in `extra` so that a
/// cached profile round-trips without loss.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, deserialize_with = "id_from_string_or_number", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Shallow merge: every top-level key of `patch` replaces the same key
    /// of `self`.
    pub fn merged_with(&self, patch: &Value) -> Result<Self, serde_json::Error> {
        let mut base = serde_json::to_value(self)?;
        merge_objects(&mut base, patch);
        serde_json::from_value(base)
    }

    /// Merges `fresh` over `self`, keeping cached fields the server omitted.
    pub fn merged_with_profile(&self, fresh: &Self) -> Result<Self, serde_json::Error> {
        self.merged_with(&serde_json::to_value(fresh)?)
    }

    pub fn settings(&self) -> Option<&Value> {
        self.extra.get("settings")
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(id)) => Some(id),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

/// Credentials for `POST /api/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body for `POST /api/auth/register`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Query parameters for `GET /api/users/all`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserQuery {
    pub params: Vec<(String, String)>,
}

impl UserQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Image sent as the `avatar` field of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}
