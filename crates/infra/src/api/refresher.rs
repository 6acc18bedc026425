//! Token refresh call

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use super::errors::RefreshError;
use crate::http::{decode_response, HttpClient, ResponseBody};

/// Tokens issued by a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    pub access_token: String,
    /// Present when the server rotates refresh tokens.
    pub refresh_token: Option<String>,
}

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, RefreshError>;
}

/// Refresher that POSTs `{"refreshToken": ...}` to the backend.
pub struct HttpTokenRefresher {
    http: HttpClient,
    url: String,
}

impl HttpTokenRefresher {
    /// `url` is the absolute refresh endpoint.
    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, RefreshError> {
        debug!(url = %self.url, "Refreshing access token");

        let request = self
            .http
            .request(Method::POST, &self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(json!({ "refreshToken": refresh_token }).to_string());

        let response =
            self.http.send(request).await.map_err(|e| RefreshError::Network(e.to_string()))?;
        let (status, body) =
            decode_response(response).await.map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

        if !status.is_success() {
            return Err(RefreshError::Rejected { status: status.as_u16() });
        }

        parse_refresh_body(&body)
    }
}

/// Accepts `token` or `accessToken`, at the top level or under `data`.
fn parse_refresh_body(body: &ResponseBody) -> Result<RefreshedTokens, RefreshError> {
    let root = body
        .as_json()
        .ok_or_else(|| RefreshError::InvalidResponse("expected a JSON body".to_string()))?;

    let lookup = |key: &str| -> Option<String> {
        root.get(key)
            .or_else(|| root.get("data").and_then(|data| data.get(key)))
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
    };

    let access_token = lookup("token")
        .or_else(|| lookup("accessToken"))
        .ok_or_else(|| RefreshError::InvalidResponse("missing access token".to_string()))?;

    Ok(RefreshedTokens { access_token, refresh_token: lookup("refreshToken") })
}
