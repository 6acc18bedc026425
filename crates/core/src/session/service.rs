//! Session service - login state and cached profile

use std::sync::Arc;

use chatline_common::auth::{AuthFailureSignal, TokenStore};
use chatline_domain::{AvatarUpload, ChatlineError, LoginRequest, RegisterRequest, Result};
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::ports::{AuthGateway, AuthOutcome, ProfileGateway, ProfileUpdate};
use super::state::SessionState;

/// Holds the authenticated user and publishes [`SessionState`] changes.
pub struct SessionService {
    auth: Arc<dyn AuthGateway>,
    profiles: Arc<dyn ProfileGateway>,
    tokens: Arc<TokenStore>,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionService {
    /// Create a new session service
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        profiles: Arc<dyn ProfileGateway>,
        tokens: Arc<TokenStore>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        Self { auth, profiles, tokens, state: Arc::new(state) }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Current state snapshot
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Restores a stored session.
    ///
    /// With both a stored token and a cached user, the token is checked
    /// against the server and the fresh user is merged over the cached one.
    /// Any failure clears the stored session and ends logged out.
    pub async fn initialize(&self) -> SessionState {
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });

        let (Some(_), Some(cached)) = (self.tokens.access_token(), self.tokens.cached_user())
        else {
            debug!("No stored session to restore");
            self.state.send_modify(|state| state.is_loading = false);
            return self.state();
        };

        match self.auth.check_token().await {
            Ok(Some(fresh)) => {
                let user = cached.merged_with_profile(&fresh).unwrap_or(fresh);
                self.tokens.set_cached_user(&user);
                info!(user_id = ?user.id, "Stored session restored");
                self.state.send_replace(SessionState::logged_in(Some(user)));
            }
            Ok(None) => {
                warn!("Token check returned no user; discarding stored session");
                self.tokens.clear();
                self.state.send_replace(SessionState::logged_out());
            }
            Err(e) => {
                warn!(error = %e, "Stored session rejected");
                self.tokens.clear();
                self.state.send_replace(SessionState::logged_out());
            }
        }

        self.state()
    }

    /// Logs in and publishes the authenticated user.
    ///
    /// # Errors
    /// Returns the gateway error; the state carries its message.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<Option<String>> {
        self.begin_loading();
        let outcome = self.auth.login(credentials).await;
        self.finish_auth(outcome)
    }

    /// Registers and publishes the authenticated user.
    ///
    /// # Errors
    /// Returns the gateway error; the state carries its message.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Option<String>> {
        self.begin_loading();
        let outcome = self.auth.register(request).await;
        self.finish_auth(outcome)
    }

    /// Always ends logged out, even if the server call fails.
    pub async fn logout(&self) {
        if let Err(e) = self.auth.logout().await {
            warn!(error = %e, "Logout request failed");
        }
        self.tokens.clear();
        self.state.send_replace(SessionState::logged_out());
        info!("Logged out");
    }

    /// # Errors
    /// Returns the gateway error; the state carries its message.
    pub async fn update_user(&self, user_id: &str, changes: &Value) -> Result<Option<String>> {
        let update = self.profiles.update_user(user_id, changes).await;
        self.apply_update(update)
    }

    /// # Errors
    /// Returns the gateway error; the state carries its message.
    pub async fn update_settings(&self, user_id: &str, settings: &Value) -> Result<Option<String>> {
        let update = self.profiles.update_settings(user_id, settings).await;
        self.apply_update(update)
    }

    /// # Errors
    /// Returns the gateway error; the state carries its message.
    pub async fn update_avatar(&self, user_id: &str, avatar: AvatarUpload) -> Result<Option<String>> {
        let update = self.profiles.update_avatar(user_id, avatar).await;
        self.apply_update(update)
    }

    /// # Errors
    /// Returns the gateway error; the state carries its message.
    pub async fn delete_avatar(&self, user_id: &str) -> Result<Option<String>> {
        let update = self.profiles.delete_avatar(user_id).await;
        self.apply_update(update)
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|state| state.error = None);
    }

    /// Spawns a listener that logs the session out on every auth failure.
    ///
    /// The task ends when the signal (all its senders) is dropped.
    pub fn watch_auth_failures(&self, signal: &AuthFailureSignal) -> JoinHandle<()> {
        let mut events = signal.subscribe();
        let state = Arc::clone(&self.state);
        let tokens = Arc::clone(&self.tokens);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        info!(message = %event.message, "Auth failure received; logging out");
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Auth failure listener lagged; logging out");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                tokens.clear_cached_user();
                state.send_replace(SessionState::logged_out());
            }
            debug!("Auth failure listener stopped");
        })
    }

    fn begin_loading(&self) {
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });
    }

    fn finish_auth(&self, outcome: Result<AuthOutcome>) -> Result<Option<String>> {
        match outcome {
            Ok(AuthOutcome { user, message }) => {
                if let Some(user) = &user {
                    self.tokens.set_cached_user(user);
                }
                info!(user_id = ?user.as_ref().and_then(|u| u.id.as_deref()), "Authenticated");
                self.state.send_replace(SessionState::logged_in(user));
                Ok(message)
            }
            Err(e) => {
                self.state.send_replace(SessionState::failed(e.user_message()));
                Err(e)
            }
        }
    }

    fn apply_update(&self, update: Result<ProfileUpdate>) -> Result<Option<String>> {
        let update = match update {
            Ok(update) => update,
            Err(e) => {
                self.state.send_modify(|state| {
                    state.error = Some(e.user_message().to_string());
                    state.is_loading = false;
                });
                return Err(e);
            }
        };

        if update.changes.is_null() {
            return Ok(update.message);
        }

        let current = self.state.borrow().user.clone().unwrap_or_default();
        let merged = current
            .merged_with(&update.changes)
            .map_err(|e| ChatlineError::Internal(format!("Failed to merge profile: {e}")))?;

        self.tokens.set_cached_user(&merged);
        self.state.send_modify(|state| {
            state.user = Some(merged);
            state.error = None;
        });
        Ok(update.message)
    }
}
