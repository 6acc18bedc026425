//! Authentication endpoints
//!
//! Login and registration persist the issued tokens and cache the user.
//! Logout always clears local credentials, whatever the server says.

use async_trait::async_trait;
use chatline_core::{AuthGateway, AuthOutcome};
use chatline_domain::{
    endpoints, ApiEnvelope, AuthPayload, ChatlineError, LoginRequest, RegisterRequest, UserProfile,
};
use reqwest::Method;
use tracing::{debug, info, instrument, warn};

use super::client::ApiClient;
use super::errors::{ApiError, RefreshError};
use crate::http::{RequestBody, RequestOptions, ResponseBody};

/// Client for `/api/auth/*`.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    /// Transport or status errors; a `success: false` envelope is returned
    /// as `Ok`.
    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<ApiEnvelope, ApiError> {
        self.authenticate(endpoints::auth::REGISTER, RequestBody::json(request)?).await
    }

    /// # Errors
    /// Transport or status errors; a `success: false` envelope is returned
    /// as `Ok`.
    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginRequest) -> Result<ApiEnvelope, ApiError> {
        self.authenticate(endpoints::auth::LOGIN, RequestBody::json(credentials)?).await
    }

    /// Forces a refresh through the shared coordinator.
    ///
    /// # Errors
    /// The refresh failure; the session has been cleared.
    pub async fn refresh_session(&self) -> Result<String, RefreshError> {
        self.client.coordinator().refresh().await
    }

    /// Validates the stored token. Any failure clears the session.
    ///
    /// # Errors
    /// Whatever the check failed with.
    #[instrument(skip(self))]
    pub async fn check_token(&self) -> Result<ApiEnvelope, ApiError> {
        let outcome =
            self.client.get(endpoints::auth::CHECK_TOKEN).await.and_then(ResponseBody::into_envelope);

        if let Err(e) = &outcome {
            warn!(error = %e, "Token check failed; clearing session");
            self.client.tokens().clear();
        }
        outcome
    }

    /// Tells the server to end the session, then clears local credentials.
    ///
    /// The call never enters the refresh cycle.
    ///
    /// # Errors
    /// The server call's error. Credentials are cleared either way.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        let options = RequestOptions::new(Method::POST).without_refresh();
        let outcome = self.client.request(endpoints::auth::LOGOUT, options).await;
        self.client.tokens().clear();

        match outcome {
            Ok(_) => {
                info!("Logged out");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Logout request failed; local session cleared");
                Err(e)
            }
        }
    }

    async fn authenticate(&self, endpoint: &str, body: RequestBody) -> Result<ApiEnvelope, ApiError> {
        let options = RequestOptions::new(Method::POST).without_auth().body(body);
        let envelope = self.client.request(endpoint, options).await?.into_envelope()?;
        if envelope.success {
            self.store_credentials(&envelope);
        } else {
            debug!(message = ?envelope.message, "Authentication rejected");
        }
        Ok(envelope)
    }

    fn store_credentials(&self, envelope: &ApiEnvelope) {
        let Some(data) = envelope.data.clone() else {
            warn!("Authentication succeeded without data");
            return;
        };

        match serde_json::from_value::<AuthPayload>(data) {
            Ok(payload) => {
                let tokens = self.client.tokens();
                tokens.store_session(&payload.token, payload.refresh_token.as_deref());
                if let Some(user) = &payload.user {
                    tokens.set_cached_user(user);
                }
                info!(
                    user_id = ?payload.user.as_ref().and_then(|u| u.id.as_deref()),
                    rotating = payload.refresh_token.is_some(),
                    "Session stored"
                );
            }
            Err(e) => warn!(error = %e, "Authentication response carried no token"),
        }
    }
}

fn auth_outcome(envelope: ApiEnvelope, fallback: &str) -> chatline_domain::Result<AuthOutcome> {
    if !envelope.success {
        return Err(ChatlineError::Auth(envelope.message_or(fallback)));
    }
    let user = envelope
        .field("user")
        .and_then(|user| serde_json::from_value::<UserProfile>(user.clone()).ok());
    Ok(AuthOutcome { user, message: envelope.message })
}

#[async_trait]
impl AuthGateway for AuthApi {
    async fn login(&self, credentials: &LoginRequest) -> chatline_domain::Result<AuthOutcome> {
        auth_outcome(Self::login(self, credentials).await?, "Login failed")
    }

    async fn register(&self, request: &RegisterRequest) -> chatline_domain::Result<AuthOutcome> {
        auth_outcome(Self::register(self, request).await?, "Registration failed")
    }

    async fn check_token(&self) -> chatline_domain::Result<Option<UserProfile>> {
        let envelope = Self::check_token(self).await?;
        if !envelope.success {
            return Ok(None);
        }
        Ok(envelope
            .field("user")
            .and_then(|user| serde_json::from_value::<UserProfile>(user.clone()).ok()))
    }

    async fn logout(&self) -> chatline_domain::Result<()> {
        Ok(Self::logout(self).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chatline_common::auth::TokenStore;
    use chatline_common::testing::MemoryStore;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;

    fn auth_api(server: &MockServer) -> (AuthApi, Arc<TokenStore>) {
        let tokens = Arc::new(TokenStore::new(Arc::new(MemoryStore::new())));
        let client =
            ApiClient::builder().base_url(server.uri()).tokens(Arc::clone(&tokens)).build().unwrap();
        (AuthApi::new(client), tokens)
    }

    fn credentials() -> LoginRequest {
        LoginRequest { email: "ada@example.com".into(), password: "hunter2".into() }
    }

    #[tokio::test]
    async fn login_stores_tokens_and_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(json!({ "email": "ada@example.com", "password": "hunter2" })))
            .respond_with(|request: &Request| {
                if request.headers.contains_key("authorization") {
                    return ResponseTemplate::new(400);
                }
                ResponseTemplate::new(200).set_body_json(json!({
                    "success": true,
                    "message": "Login successful",
                    "data": {
                        "token": "access-1",
                        "refreshToken": "refresh-1",
                        "user": { "id": 7, "email": "ada@example.com" }
                    }
                }))
            })
            .mount(&server)
            .await;

        let (api, tokens) = auth_api(&server);
        let outcome = AuthGateway::login(&api, &credentials()).await.unwrap();

        assert_eq!(outcome.message.as_deref(), Some("Login successful"));
        assert_eq!(outcome.user.unwrap().id.as_deref(), Some("7"));
        assert_eq!(tokens.access_token().as_deref(), Some("access-1"));
        assert_eq!(tokens.refresh_token().as_deref(), Some("refresh-1"));
        assert_eq!(tokens.cached_user().unwrap().email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn rejected_login_keeps_store_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": false, "message": "Invalid credentials" })),
            )
            .mount(&server)
            .await;

        let (api, tokens) = auth_api(&server);
        let err = AuthGateway::login(&api, &credentials()).await.unwrap_err();

        assert_eq!(err, ChatlineError::Auth("Invalid credentials".into()));
        assert!(tokens.access_token().is_none());
    }

    #[tokio::test]
    async fn wrong_password_status_surfaces_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "Wrong password" })),
            )
            .mount(&server)
            .await;

        let (api, _tokens) = auth_api(&server);
        let err = api.login(&credentials()).await.unwrap_err();

        assert!(matches!(err, ApiError::Authentication { .. }));
        assert_eq!(err.display_message(), "Wrong password");
    }

    #[tokio::test]
    async fn check_token_failure_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/check-token"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (api, tokens) = auth_api(&server);
        tokens.store_session("access-1", None);

        assert!(api.check_token().await.is_err());
        assert!(tokens.access_token().is_none());
    }

    #[tokio::test]
    async fn check_token_returns_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/check-token"))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "user": { "id": "u1", "username": "ada" } }
            })))
            .mount(&server)
            .await;

        let (api, tokens) = auth_api(&server);
        tokens.store_session("access-1", None);

        let user = AuthGateway::check_token(&api).await.unwrap().unwrap();
        assert_eq!(user.username.as_deref(), Some("ada"));
        assert_eq!(tokens.access_token().as_deref(), Some("access-1"));
    }

    #[tokio::test]
    async fn logout_clears_even_when_server_fails() {
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

        let (api, tokens) = auth_api(&server);
        tokens.store_session("access-1", Some("refresh-1"));

        assert!(api.logout().await.is_err());
        assert!(tokens.access_token().is_none());
        assert!(tokens.refresh_token().is_none());
    }
}
