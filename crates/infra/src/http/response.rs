//! Response decoding

use reqwest::header::CONTENT_TYPE;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use chatline_domain::ApiEnvelope;

use crate::api::errors::ApiError;

/// Decoded response payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    #[default]
    Empty,
}

impl ResponseBody {
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// JSON view: text becomes a JSON string, empty becomes `null`.
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
            Self::Empty => Value::Null,
        }
    }

    /// Top-level `message` string of a JSON body.
    pub fn message(&self) -> Option<&str> {
        self.as_json()?.get("message")?.as_str()
    }

    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Deserializes a JSON body into `T`.
    ///
    /// # Errors
    /// Returns `ApiError::Decode` if the body is not JSON or does not match
    /// `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(self.into_json())
            .map_err(|e| ApiError::Decode { status: 200, message: e.to_string() })
    }

    /// Reads the `{ success, message, data }` envelope.
    ///
    /// An empty body (204) counts as success; a text body becomes the
    /// message of a successful envelope.
    ///
    /// # Errors
    /// Returns `ApiError::Decode` if a JSON body is not an object.
    pub fn into_envelope(self) -> Result<ApiEnvelope, ApiError> {
        match self {
            Self::Json(value) => serde_json::from_value(value)
                .map_err(|e| ApiError::Decode { status: 200, message: e.to_string() }),
            Self::Text(text) => Ok(ApiEnvelope {
                success: true,
                message: Some(text),
                data: None,
                extra: serde_json::Map::new(),
            }),
            Self::Empty => Ok(ApiEnvelope {
                success: true,
                message: None,
                data: None,
                extra: serde_json::Map::new(),
            }),
        }
    }
}

/// Reads the body of `response` according to its content type.
///
/// JSON when the content type contains `application/json`, empty for a 204,
/// text otherwise.
///
/// # Errors
/// Returns `ApiError::Decode` for an unreadable or malformed body.
pub async fn decode_response(response: Response) -> Result<(StatusCode, ResponseBody), ApiError> {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"));

    let decode_error =
        |e: &dyn std::fmt::Display| ApiError::Decode { status: status.as_u16(), message: e.to_string() };

    if is_json {
        let bytes = response.bytes().await.map_err(|e| decode_error(&e))?;
        let value = serde_json::from_slice(&bytes).map_err(|e| decode_error(&e))?;
        return Ok((status, ResponseBody::Json(value)));
    }

    if status == StatusCode::NO_CONTENT {
        return Ok((status, ResponseBody::Empty));
    }

    let text = response.text().await.map_err(|e| decode_error(&e))?;
    Ok((status, ResponseBody::Text(text)))
}
