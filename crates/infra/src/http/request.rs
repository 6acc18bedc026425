//! Request description: method, body, timeout and auth options.

use std::time::Duration;

use chatline_domain::constants::{DEFAULT_CONTENT_TYPE, MULTIPART_CONTENT_TYPE};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;

use crate::api::errors::ApiError;

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartPart {
    Text { name: String, value: String },
    File { name: String, file_name: String, mime_type: String, bytes: Vec<u8> },
}

/// Multipart form kept as plain data so it can be rebuilt for a retry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<MultipartPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(MultipartPart::Text { name: name.into(), value: value.into() });
        self
    }

    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(MultipartPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        });
        self
    }

    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    fn to_form(&self) -> Result<Form, ApiError> {
        self.parts.iter().try_fold(Form::new(), |form, part| match part {
            MultipartPart::Text { name, value } => Ok(form.text(name.clone(), value.clone())),
            MultipartPart::File { name, file_name, mime_type, bytes } => {
                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime_type)
                    .map_err(|e| {
                        ApiError::InvalidRequest(format!("invalid MIME type {mime_type}: {e}"))
                    })?;
                Ok(form.part(name.clone(), part))
            }
        })
    }
}

/// Request payload
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Text(String),
    Multipart(MultipartForm),
}

impl RequestBody {
    /// Serializes `value` into a JSON body.
    ///
    /// # Errors
    /// Returns `ApiError::InvalidRequest` if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to serialize body: {e}")))
    }

    pub const fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<MultipartForm> for RequestBody {
    fn from(form: MultipartForm) -> Self {
        Self::Multipart(form)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Options for a single API call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: RequestBody,
    /// Overrides the client's default request timeout.
    pub timeout: Option<Duration>,
    /// Attach `Authorization: Bearer` and take part in the refresh cycle.
    pub include_auth: bool,
    /// Overrides the default `application/json`.
    pub content_type: Option<String>,
    /// Run a refresh and retry once on a 401.
    pub refresh_on_unauthorized: bool,
    pub headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: RequestBody::Empty,
            timeout: None,
            include_auth: true,
            content_type: None,
            refresh_on_unauthorized: true,
            headers: Vec::new(),
        }
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self { method, ..Self::default() }
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn without_auth(mut self) -> Self {
        self.include_auth = false;
        self
    }

    #[must_use]
    pub fn without_refresh(mut self) -> Self {
        self.refresh_on_unauthorized = false;
        self
    }

    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Content type sent with the request. Multipart bodies get none so the
    /// transport can add the boundary.
    pub fn effective_content_type(&self) -> Option<&str> {
        if self.body.is_multipart() {
            return None;
        }
        match self.content_type.as_deref() {
            Some(MULTIPART_CONTENT_TYPE) => None,
            Some(content_type) => Some(content_type),
            None => Some(DEFAULT_CONTENT_TYPE),
        }
    }

    /// Adds headers and body to `builder`. Called once per attempt.
    pub(crate) fn apply(&self, mut builder: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        if let Some(content_type) = self.effective_content_type() {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        Ok(match &self.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(value.to_string()),
            RequestBody::Text(text) => builder.body(text.clone()),
            RequestBody::Multipart(form) => builder.multipart(form.to_form()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_match_authenticated_json_get() {
        let options = RequestOptions::default();
        assert_eq!(options.method, Method::GET);
        assert!(options.include_auth);
        assert!(options.refresh_on_unauthorized);
        assert_eq!(options.effective_content_type(), Some("application/json"));
    }

    #[test]
    fn multipart_omits_content_type() {
        let form = MultipartForm::new().file("avatar", "a.png", "image/png", vec![1, 2]);
        let options = RequestOptions::new(Method::POST).body(form);
        assert_eq!(options.effective_content_type(), None);

        let options = RequestOptions::new(Method::POST).content_type("multipart/form-data");
        assert_eq!(options.effective_content_type(), None);
    }

    #[test]
    fn content_type_override() {
        let options = RequestOptions::new(Method::POST)
            .body("plain".to_string())
            .content_type("text/plain");
        assert_eq!(options.effective_content_type(), Some("text/plain"));
    }

    #[test]
    fn json_body_from_serializable() {
        #[derive(Serialize)]
        struct Status<'a> {
            status: &'a str,
        }

        let body = RequestBody::json(&Status { status: "away" }).unwrap();
        assert_eq!(body, RequestBody::Json(json!({ "status": "away" })));
    }

    #[test]
    fn invalid_mime_type_is_rejected() {
        let form = MultipartForm::new().file("avatar", "a.png", "not a mime", vec![]);
        assert!(matches!(form.to_form(), Err(ApiError::InvalidRequest(_))));
    }
}
