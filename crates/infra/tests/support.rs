use std::sync::Arc;
use std::time::Duration;

use chatline_common::auth::TokenStore;
use chatline_common::testing::MemoryStore;
use chatline_infra::ApiClient;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REFRESH_PATH: &str = "/api/auth/refresh";

/// Mock backend plus a client wired to an in-memory token store.
pub struct Harness {
    pub server: MockServer,
    pub store: Arc<MemoryStore>,
    pub tokens: Arc<TokenStore>,
    pub client: ApiClient,
}

impl Harness {
    /// Starts a backend with an empty session.
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());
        let tokens = Arc::new(TokenStore::new(store.clone()));
        let client = ApiClient::builder()
            .base_url(server.uri())
            .tokens(Arc::clone(&tokens))
            .build()
            .expect("client should build");

        Self { server, store, tokens, client }
    }

    /// Starts a backend with `access` (and `refresh`) already stored.
    pub async fn signed_in(access: &str, refresh: Option<&str>) -> Self {
        let harness = Self::start().await;
        harness.tokens.store_session(access, refresh);
        harness
    }

    /// Requests the mock server received for `route`, in arrival order.
    pub async fn requests_to(&self, route: &str) -> Vec<wiremock::Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == route)
            .collect()
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn authorization(request: &wiremock::Request) -> Option<String> {
    request
        .headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
}

/// Refresh endpoint issuing `token` after `delay`, expected `calls` times.
pub async fn mount_refresh(server: &MockServer, token: &str, delay: Duration, calls: u64) {
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true, "token": token }))
                .set_delay(delay),
        )
        .expect(calls)
        .mount(server)
        .await;
}

/// Refresh endpoint rejecting every refresh token.
pub async fn mount_refresh_rejection(server: &MockServer, delay: Duration) {
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "success": false, "message": "Invalid refresh token" }))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// `route` answers 200 for `valid` and 401 for any other bearer token.
pub async fn mount_protected(server: &MockServer, route: &str, valid: &str) {
    let expected = bearer(valid);
    Mock::given(path(route))
        .respond_with(move |request: &wiremock::Request| {
            if authorization(request).as_deref() == Some(expected.as_str()) {
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": true, "path": request.url.path() }))
            } else {
                ResponseTemplate::new(401).set_body_json(json!({ "message": "Token expired" }))
            }
        })
        .mount(server)
        .await;
}
