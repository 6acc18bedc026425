//! API client with token attachment and single-flight refresh
//!
//! Every authenticated call goes through the [`RefreshCoordinator`]: it runs
//! immediately when no refresh is in flight and is parked otherwise. A 401 on
//! the first attempt triggers one refresh and one retry; a 401 on the retry
//! ends the session.

use std::sync::Arc;
use std::time::Duration;

use chatline_common::auth::{AuthFailureSignal, TokenClaims, TokenStore};
use chatline_domain::constants::{
    AUTH_FAILURE_MESSAGE, DEFAULT_DEVELOPMENT_URL, DEFAULT_REFRESH_THRESHOLD_SECS, DEFAULT_REFRESH_TIMEOUT_MS,
    DEFAULT_REQUEST_TIMEOUT_MS, HEALTH_CHECK_TIMEOUT_MS,
};
use chatline_domain::{endpoints, ChatlineError, ClientConfig};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::errors::ApiError;
use super::refresh::RefreshCoordinator;
use super::refresher::{HttpTokenRefresher, TokenRefresher};
use crate::http::{decode_response, HttpClient, RequestBody, RequestOptions, ResponseBody};

/// Configuration for API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL without trailing slash (e.g., "http://localhost:6969")
    pub base_url: String,
    /// Default per-request timeout
    pub timeout: Duration,
    /// Path of the refresh endpoint
    pub refresh_path: String,
    /// Upper bound for the refresh call
    pub refresh_timeout: Duration,
    /// Refresh before sending when the access token expires this soon
    pub refresh_threshold: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DEVELOPMENT_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            refresh_path: endpoints::auth::REFRESH.to_string(),
            refresh_timeout: Duration::from_millis(DEFAULT_REFRESH_TIMEOUT_MS),
            refresh_threshold: Duration::from_secs(DEFAULT_REFRESH_THRESHOLD_SECS),
        }
    }
}

impl ApiClientConfig {
    /// Derives the client settings from the loaded configuration.
    ///
    /// # Errors
    /// Returns `ApiError::Config` when no base URL can be resolved.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let base_url = config.resolved_base_url().map_err(|e| ApiError::Config(e.to_string()))?;
        Ok(Self {
            base_url,
            timeout: config.request_timeout(),
            refresh_path: config.refresh_path.clone(),
            refresh_timeout: config.refresh_timeout(),
            refresh_threshold: config.refresh_threshold(),
        })
    }

    /// Absolute URL for `endpoint`. Absolute endpoints pass through.
    pub fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}{}", self.base_url.trim_end_matches('/'), endpoint)
        }
    }
}

struct ClientInner {
    http: HttpClient,
    tokens: Arc<TokenStore>,
    coordinator: RefreshCoordinator,
    signal: AuthFailureSignal,
    config: ApiClientConfig,
}

/// Authenticated API client
///
/// Cheap to clone; clones share the token store, coordinator and signal.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.config.base_url)
            .field("timeout", &self.inner.config.timeout)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.inner.config
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.inner.tokens
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    pub fn signal(&self) -> &AuthFailureSignal {
        &self.inner.signal
    }

    /// Executes a call against `endpoint` (a path under the base URL).
    ///
    /// # Errors
    /// See [`ApiError`]. `AuthRequired` when an authenticated call has no
    /// token; `Authentication` when the session could not be recovered.
    pub async fn request(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody, ApiError> {
        if !options.include_auth {
            return self.execute(endpoint, &options).await;
        }

        let client = self.clone();
        let endpoint = endpoint.to_owned();
        self.inner
            .coordinator
            .queue_request(move || async move { client.execute(&endpoint, &options).await })
            .await
    }

    /// Execute a GET request
    #[instrument(skip(self))]
    pub async fn get(&self, endpoint: &str) -> Result<ResponseBody, ApiError> {
        self.request(endpoint, RequestOptions::new(Method::GET)).await
    }

    /// Execute a POST request
    #[instrument(skip(self, body))]
    pub async fn post(
        &self,
        endpoint: &str,
        body: impl Into<RequestBody> + Send,
    ) -> Result<ResponseBody, ApiError> {
        self.request(endpoint, RequestOptions::new(Method::POST).body(body)).await
    }

    /// Execute a PUT request
    #[instrument(skip(self, body))]
    pub async fn put(
        &self,
        endpoint: &str,
        body: impl Into<RequestBody> + Send,
    ) -> Result<ResponseBody, ApiError> {
        self.request(endpoint, RequestOptions::new(Method::PUT).body(body)).await
    }

    /// Execute a PATCH request
    #[instrument(skip(self, body))]
    pub async fn patch(
        &self,
        endpoint: &str,
        body: impl Into<RequestBody> + Send,
    ) -> Result<ResponseBody, ApiError> {
        self.request(endpoint, RequestOptions::new(Method::PATCH).body(body)).await
    }

    /// Execute a DELETE request
    #[instrument(skip(self))]
    pub async fn delete(&self, endpoint: &str) -> Result<ResponseBody, ApiError> {
        self.request(endpoint, RequestOptions::new(Method::DELETE)).await
    }

    pub async fn post_json<T: Serialize + ?Sized + Sync>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<ResponseBody, ApiError> {
        self.post(endpoint, RequestBody::json(body)?).await
    }

    pub async fn put_json<T: Serialize + ?Sized + Sync>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<ResponseBody, ApiError> {
        self.put(endpoint, RequestBody::json(body)?).await
    }

    pub async fn patch_json<T: Serialize + ?Sized + Sync>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<ResponseBody, ApiError> {
        self.patch(endpoint, RequestBody::json(body)?).await
    }

    /// `GET /api/health` without credentials, bounded to five seconds.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<ResponseBody, ApiError> {
        let options = RequestOptions::new(Method::GET)
            .without_auth()
            .timeout(Duration::from_millis(HEALTH_CHECK_TIMEOUT_MS));
        self.request(endpoints::service::HEALTH, options).await
    }

    /// `GET /api/info` without credentials.
    pub async fn api_info(&self) -> Result<ResponseBody, ApiError> {
        let options = RequestOptions::new(Method::GET).without_auth();
        self.request(endpoints::service::INFO, options).await
    }

    /// Fetches raw bytes. Sends the current token if any; a 401 is returned
    /// as-is without a refresh.
    ///
    /// # Errors
    /// Transport failures, timeout, or the non-2xx status.
    #[instrument(skip(self))]
    pub async fn download(&self, endpoint: &str) -> Result<Vec<u8>, ApiError> {
        let timeout = self.inner.config.timeout;
        let mut builder = self.inner.http.request(Method::GET, self.inner.config.url(endpoint));
        if let Some(token) = self.inner.tokens.access_token() {
            builder = builder.bearer_auth(token);
        }

        let exchange = async {
            let response =
                self.inner.http.send(builder).await.map_err(|e| transport_error(e, timeout))?;
            let status = response.status();
            if !status.is_success() {
                let (status, body) = decode_response(response).await?;
                return Err(ApiError::from_status(status, body));
            }
            response
                .bytes()
                .await
                .map(|bytes| bytes.to_vec())
                .map_err(|e| ApiError::Decode { status: status.as_u16(), message: e.to_string() })
        };

        tokio::time::timeout(timeout, exchange).await.map_err(|_| ApiError::Timeout(timeout))?
    }

    /// One request with at most one retry after a refresh.
    async fn execute(&self, endpoint: &str, options: &RequestOptions) -> Result<ResponseBody, ApiError> {
        let url = self.inner.config.url(endpoint);
        let timeout = options.timeout.unwrap_or(self.inner.config.timeout);
        let mut retried = false;

        loop {
            let token = if options.include_auth {
                Some(self.access_token(!retried).await?)
            } else {
                None
            };

            let (status, body) = self.send_once(&url, options, token.as_deref(), timeout).await?;
            if status.is_success() {
                return Ok(body);
            }

            match token {
                Some(used) if status == StatusCode::UNAUTHORIZED => {
                    if !options.refresh_on_unauthorized {
                        return Err(ApiError::from_status(status, body));
                    }
                    if retried {
                        return Err(self.handle_auth_failure(&used, body));
                    }
                    debug!(%url, "Unauthorized; refreshing and retrying once");
                    if let Err(err) = self.inner.coordinator.refresh_stale(&used).await {
                        return Err(ApiError::refresh_failed(&err, body));
                    }
                    retried = true;
                }
                _ => return Err(ApiError::from_status(status, body)),
            }
        }
    }

    /// Current token, refreshed first when it is about to expire.
    async fn access_token(&self, first_attempt: bool) -> Result<String, ApiError> {
        let token = self.inner.tokens.access_token().ok_or(ApiError::AuthRequired)?;
        if first_attempt && self.expires_soon(&token) {
            debug!("Access token expires soon; refreshing before sending");
            return Ok(self.inner.coordinator.refresh_stale(&token).await?);
        }
        Ok(token)
    }

    fn expires_soon(&self, token: &str) -> bool {
        self.inner.tokens.refresh_token().is_some()
            && TokenClaims::decode(token)
                .is_ok_and(|claims| claims.expires_within(self.inner.config.refresh_threshold))
    }

    async fn send_once(
        &self,
        url: &str,
        options: &RequestOptions,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<(StatusCode, ResponseBody), ApiError> {
        let mut builder = self.inner.http.request(options.method.clone(), url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        let builder = options.apply(builder)?;

        let exchange = async {
            let response =
                self.inner.http.send(builder).await.map_err(|e| transport_error(e, timeout))?;
            decode_response(response).await
        };

        tokio::time::timeout(timeout, exchange).await.map_err(|_| {
            debug!(%url, ?timeout, "Request timed out");
            ApiError::Timeout(timeout)
        })?
    }

    /// The refreshed token was rejected too. Reports once per token.
    fn handle_auth_failure(&self, used: &str, body: ResponseBody) -> ApiError {
        if self.inner.tokens.clear_if_current(used) {
            warn!("Refreshed token rejected; ending session");
            self.inner.signal.emit(AUTH_FAILURE_MESSAGE);
        }
        ApiError::authentication_failed(body)
    }
}

fn transport_error(err: ChatlineError, timeout: Duration) -> ApiError {
    match err {
        ChatlineError::Timeout(_) => ApiError::Timeout(timeout),
        ChatlineError::InvalidInput(message) => ApiError::InvalidRequest(message),
        other => ApiError::Network(other.user_message().to_string()),
    }
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ApiClientConfig>,
    http: Option<HttpClient>,
    tokens: Option<Arc<TokenStore>>,
    signal: Option<AuthFailureSignal>,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl ApiClientBuilder {
    #[must_use]
    pub fn config(mut self, config: ApiClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Shorthand for a default config with `base_url`.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        let config = self.config.take().unwrap_or_default();
        self.config = Some(ApiClientConfig { base_url: base_url.into(), ..config });
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let config = self.config.take().unwrap_or_default();
        self.config = Some(ApiClientConfig { timeout, ..config });
        self
    }

    #[must_use]
    pub fn http_client(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    #[must_use]
    pub fn tokens(mut self, tokens: Arc<TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    #[must_use]
    pub fn signal(mut self, signal: AuthFailureSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Replaces the HTTP refresh call.
    #[must_use]
    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if no token store was given or the HTTP
    /// client cannot be created.
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config = self.config.unwrap_or_default();
        let tokens =
            self.tokens.ok_or_else(|| ApiError::Config("token store is required".to_string()))?;
        let http = match self.http {
            Some(http) => http,
            None => HttpClient::new()
                .map_err(|e| ApiError::Config(format!("Failed to build HttpClient: {e}")))?,
        };
        let signal = self.signal.unwrap_or_default();
        let refresher = self.refresher.unwrap_or_else(|| {
            Arc::new(HttpTokenRefresher::new(http.clone(), config.url(&config.refresh_path)))
        });

        let coordinator = RefreshCoordinator::new(refresher, Arc::clone(&tokens), signal.clone())
            .with_refresh_timeout(config.refresh_timeout);

        Ok(ApiClient { inner: Arc::new(ClientInner { http, tokens, coordinator, signal, config }) })
    }
}

#[cfg(test)]
mod tests {
    use chatline_common::testing::{jwt_expiring_in, MemoryStore};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;
    use crate::http::MultipartForm;

    fn client_for(server: &MockServer, tokens: &Arc<TokenStore>) -> ApiClient {
        ApiClient::builder().base_url(server.uri()).tokens(Arc::clone(tokens)).build().unwrap()
    }

    fn tokens_with(access: Option<&str>, refresh: Option<&str>) -> Arc<TokenStore> {
        let tokens = Arc::new(TokenStore::new(Arc::new(MemoryStore::new())));
        if let Some(access) = access {
            tokens.store_session(access, refresh);
        }
        tokens
    }

    #[test]
    fn urls_join_base_and_endpoint() {
        let config = ApiClientConfig { base_url: "http://api.test/".into(), ..Default::default() };
        assert_eq!(config.url("/api/users"), "http://api.test/api/users");
        assert_eq!(config.url("https://cdn.test/a.png"), "https://cdn.test/a.png");
    }

    #[test]
    fn build_requires_token_store() {
        assert!(matches!(ApiClient::builder().build(), Err(ApiError::Config(_))));
    }

    #[test]
    fn config_from_client_config() {
        let config = ClientConfig {
            base_url: Some("https://chat.example.com/".into()),
            refresh_path: "/api/auth/token-refresh".into(),
            ..ClientConfig::default()
        };
        let api = ApiClientConfig::from_config(&config).unwrap();
        assert_eq!(api.base_url, "https://chat.example.com");
        assert_eq!(api.url(&api.refresh_path), "https://chat.example.com/api/auth/token-refresh");
    }

    #[tokio::test]
    async fn attaches_bearer_and_json_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users"))
            .and(header("authorization", "Bearer token-1"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({ "email": "a@b.c" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = tokens_with(Some("token-1"), None);
        let body =
            client_for(&server, &tokens).post_json("/api/users", &json!({ "email": "a@b.c" })).await.unwrap();

        assert_eq!(body, ResponseBody::Json(json!({ "success": true })));
    }

    #[tokio::test]
    async fn auth_request_without_token_never_hits_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let tokens = tokens_with(None, None);
        let err = client_for(&server, &tokens).get("/api/users").await.unwrap_err();

        assert!(matches!(err, ApiError::AuthRequired));
    }

    #[tokio::test]
    async fn unauthenticated_request_sends_no_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(|request: &Request| {
                if request.headers.contains_key("authorization") {
                    ResponseTemplate::new(400)
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" }))
                }
            })
            .mount(&server)
            .await;

        let tokens = tokens_with(Some("token-1"), None);
        let body = client_for(&server, &tokens).health_check().await.unwrap();

        assert_eq!(body.as_json().unwrap()["status"], "ok");
    }

    #[tokio::test]
    async fn multipart_omits_json_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/7/avatar"))
            .respond_with(|request: &Request| {
                let content_type = request
                    .headers
                    .get("content-type")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if content_type.starts_with("multipart/form-data; boundary=") {
                    ResponseTemplate::new(200).set_body_json(json!({ "success": true }))
                } else {
                    ResponseTemplate::new(415)
                }
            })
            .mount(&server)
            .await;

        let tokens = tokens_with(Some("token-1"), None);
        let form = MultipartForm::new().file("avatar", "me.png", "image/png", vec![1, 2, 3]);
        let body = client_for(&server, &tokens).post("/api/users/7/avatar", form).await.unwrap();

        assert_eq!(body.as_json().unwrap()["success"], true);
    }

    #[tokio::test]
    async fn error_statuses_carry_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({ "message": "Username taken" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let tokens = tokens_with(Some("token-1"), None);
        let client = client_for(&server, &tokens);

        let err = client.put("/api/users", json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation { status: 422, .. }));
        assert_eq!(err.display_message(), "Username taken");

        let err = client.delete("/api/users").await.unwrap_err();
        assert!(err.is_server_error());
        assert_eq!(err.to_string(), "HTTP error! status: 503");
    }

    #[tokio::test]
    async fn per_request_timeout_is_reported_as_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let tokens = tokens_with(Some("token-1"), None);
        let options = RequestOptions::new(Method::GET).timeout(Duration::from_millis(50));
        let err = client_for(&server, &tokens).request("/api/users", options).await.unwrap_err();

        assert!(matches!(err, ApiError::Timeout(duration) if duration == Duration::from_millis(50)));
        assert_eq!(err.display_message(), "Request timeout. Please try again.");
    }

    #[tokio::test]
    async fn logout_style_request_skips_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/logout"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tokens = tokens_with(Some("token-1"), Some("refresh-1"));
        let client = client_for(&server, &tokens);
        let options = RequestOptions::new(Method::POST).without_refresh();
        let err = client.request("/api/auth/logout", options).await.unwrap_err();

        assert!(matches!(err, ApiError::Authentication { .. }));
        assert_eq!(tokens.access_token().as_deref(), Some("token-1"));
        assert_eq!(client.signal().emission_count(), 0);
    }

    #[tokio::test]
    async fn token_expiring_soon_is_refreshed_before_sending() {
        let server = MockServer::start().await;
        let fresh = jwt_expiring_in(3600);
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": fresh })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/users"))
            .and(header("authorization", format!("Bearer {fresh}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = tokens_with(Some(&jwt_expiring_in(10)), Some("refresh-1"));
        client_for(&server, &tokens).get("/api/users").await.unwrap();

        assert_eq!(tokens.access_token(), Some(fresh));
    }

    #[tokio::test]
    async fn download_returns_raw_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/report.bin"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0_u8, 1, 2, 255]))
            .mount(&server)
            .await;

        let tokens = tokens_with(Some("token-1"), None);
        let bytes = client_for(&server, &tokens).download("/files/report.bin").await.unwrap();

        assert_eq!(bytes, vec![0, 1, 2, 255]);
    }
}
