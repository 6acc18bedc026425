//! Wiring of the client stack from configuration

use std::sync::Arc;

#[cfg(feature = "keychain")]
use chatline_common::storage::KeychainStore;
use chatline_common::storage::{CredentialStore, FileStore, MemoryStore};
use chatline_common::{AuthFailureSignal, TokenStore};
use chatline_core::SessionService;
use chatline_domain::{ClientConfig, Result, StorageConfig};
use tokio::task::JoinHandle;
use tracing::info;

use crate::api::{ApiClient, ApiClientConfig, AuthApi, UserApi};
use crate::http::HttpClient;

/// Everything a client application needs, sharing one token store and one
/// auth-failure signal.
pub struct ClientContext {
    pub tokens: Arc<TokenStore>,
    pub signal: AuthFailureSignal,
    pub api: ApiClient,
    pub auth: AuthApi,
    pub users: UserApi,
    pub session: SessionService,
}

impl ClientContext {
    /// Builds the stack and hydrates the token store.
    ///
    /// # Errors
    /// Returns `ChatlineError::Config` for an invalid configuration or a
    /// storage backend that is not compiled in.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let store = credential_store(&config.storage)?;
        Self::with_store(config, store)
    }

    /// Like [`from_config`](Self::from_config) with an explicit store.
    ///
    /// # Errors
    /// Returns `ChatlineError::Config` for an invalid configuration.
    pub fn with_store(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let tokens = Arc::new(TokenStore::new(store));
        let signal = AuthFailureSignal::new();

        let mut http = HttpClient::builder().connect_timeout(config.connect_timeout());
        if let Some(agent) = &config.user_agent {
            http = http.user_agent(agent.clone());
        }

        let api = ApiClient::builder()
            .config(ApiClientConfig::from_config(config)?)
            .http_client(http.build()?)
            .tokens(Arc::clone(&tokens))
            .signal(signal.clone())
            .build()?;

        let auth = AuthApi::new(api.clone());
        let users = UserApi::new(api.clone());
        let session =
            SessionService::new(Arc::new(auth.clone()), Arc::new(users.clone()), Arc::clone(&tokens));

        info!(base_url = %api.config().base_url, "Client context ready");
        Ok(Self { tokens, signal, api, auth, users, session })
    }

    /// Logs the session out whenever the auth-failure signal fires.
    pub fn watch_auth_failures(&self) -> JoinHandle<()> {
        self.session.watch_auth_failures(&self.signal)
    }
}

fn credential_store(storage: &StorageConfig) -> Result<Arc<dyn CredentialStore>> {
    match storage {
        StorageConfig::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageConfig::File { path } => Ok(Arc::new(FileStore::new(path.clone()))),
        #[cfg(feature = "keychain")]
        StorageConfig::Keychain { service } => Ok(Arc::new(KeychainStore::new(service.clone()))),
        #[cfg(not(feature = "keychain"))]
        StorageConfig::Keychain { .. } => Err(chatline_domain::ChatlineError::Config(
            "keychain storage requires the `keychain` feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use chatline_domain::constants::{AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY};
    use chatline_domain::ChatlineError;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config_for(server: &MockServer, storage: StorageConfig) -> ClientConfig {
        ClientConfig { base_url: Some(server.uri()), storage, ..ClientConfig::default() }
    }

    #[tokio::test]
    async fn file_store_persists_login_across_contexts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "token": "access-1", "refreshToken": "refresh-1", "user": { "id": 1 } }
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let storage = StorageConfig::File { path: dir.path().join("tokens.json") };
        let config = config_for(&server, storage);

        let context = ClientContext::from_config(&config).unwrap();
        let credentials = chatline_domain::LoginRequest {
            email: "ada@example.com".into(),
            password: "secret".into(),
        };
        context.session.login(&credentials).await.unwrap();
        assert!(context.session.state().is_authenticated);

        let restored = ClientContext::from_config(&config).unwrap();
        assert_eq!(restored.tokens.access_token().as_deref(), Some("access-1"));
        assert_eq!(restored.tokens.refresh_token().as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn auth_failure_logs_session_out() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());
        store.set(AUTH_TOKEN_KEY, "access-1").unwrap();
        store.set(REFRESH_TOKEN_KEY, "refresh-1").unwrap();

        let context =
            ClientContext::with_store(&config_for(&server, StorageConfig::Memory), store).unwrap();
        let mut states = context.session.subscribe();
        let listener = context.watch_auth_failures();

        context.signal.emit("Authentication failed. Please log in again.");
        states.changed().await.unwrap();

        assert!(!states.borrow().is_authenticated);
        listener.abort();
    }

    #[test]
    fn rejects_invalid_config() {
        let config = ClientConfig { request_timeout_ms: 0, ..ClientConfig::default() };
        assert!(matches!(ClientContext::from_config(&config), Err(ChatlineError::Config(_))));
    }

    #[cfg(not(feature = "keychain"))]
    #[test]
    fn keychain_storage_needs_feature() {
        let storage = StorageConfig::Keychain { service: "chatline.test".into() };
        let config = ClientConfig { storage, ..ClientConfig::default() };
        assert!(matches!(ClientContext::from_config(&config), Err(ChatlineError::Config(_))));
    }
}
