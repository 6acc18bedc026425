//! Access and refresh token storage
//!
//! The session lives in memory behind a lock and is mirrored to a durable
//! [`CredentialStore`] under the keys `authToken`, `refreshToken` and
//! `user`. Durable failures are logged and swallowed: the in-memory session
//! stays authoritative for the lifetime of the process.

use std::sync::Arc;

use chatline_domain::constants::{AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
use chatline_domain::{Session, UserProfile};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::claims::TokenClaims;
use crate::storage::CredentialStore;

/// Owns the current session tokens.
///
/// The lock is only held in synchronous sections and never across an
/// `.await`.
pub struct TokenStore {
    store: Arc<dyn CredentialStore>,
    session: RwLock<Session>,
}

impl TokenStore {
    /// Hydrates the session once from durable storage. A failed read
    /// hydrates as "no token".
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let session = Session {
            access_token: read_key(store.as_ref(), AUTH_TOKEN_KEY),
            refresh_token: read_key(store.as_ref(), REFRESH_TOKEN_KEY),
        };

        debug!(
            has_access_token = session.access_token.is_some(),
            has_refresh_token = session.refresh_token.is_some(),
            "Token store hydrated"
        );

        Self { store, session: RwLock::new(session) }
    }

    pub fn access_token(&self) -> Option<String> {
        self.session.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.session.read().refresh_token.clone()
    }

    pub fn session(&self) -> Session {
        self.session.read().clone()
    }

    /// Replaces the access token. `None` removes it.
    pub fn set_token(&self, token: Option<&str>) {
        let mut session = self.session.write();
        session.access_token = token.map(ToOwned::to_owned);
        self.persist(AUTH_TOKEN_KEY, token);
    }

    /// Replaces the refresh token. `None` removes it.
    pub fn set_refresh_token(&self, token: Option<&str>) {
        let mut session = self.session.write();
        session.refresh_token = token.map(ToOwned::to_owned);
        self.persist(REFRESH_TOKEN_KEY, token);
    }

    /// Stores a new access token and, when given, a rotated refresh token.
    /// An absent refresh token keeps the current one.
    pub fn store_session(&self, access_token: &str, refresh_token: Option<&str>) {
        let mut session = self.session.write();
        session.access_token = Some(access_token.to_string());
        self.persist(AUTH_TOKEN_KEY, Some(access_token));

        if let Some(refresh_token) = refresh_token {
            session.refresh_token = Some(refresh_token.to_string());
            self.persist(REFRESH_TOKEN_KEY, Some(refresh_token));
        }
    }

    /// Removes both tokens and the cached user from memory and storage.
    pub fn clear(&self) {
        let mut session = self.session.write();
        self.clear_locked(&mut session);
    }

    /// Clears only if `used` is still the current access token.
    ///
    /// Returns `true` when this call cleared the session. A request that
    /// failed with a token that has since been replaced (or already cleared)
    /// returns `false`, so concurrent failures report once.
    pub fn clear_if_current(&self, used: &str) -> bool {
        let mut session = self.session.write();
        if session.access_token.as_deref() != Some(used) {
            return false;
        }
        self.clear_locked(&mut session);
        true
    }

    fn clear_locked(&self, session: &mut Session) {
        *session = Session::default();
        for key in [AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            self.persist(key, None);
        }
        info!("Session tokens cleared");
    }

    /// The user record cached at login. Unreadable records are dropped.
    pub fn cached_user(&self) -> Option<UserProfile> {
        let raw = read_key(self.store.as_ref(), USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable cached user");
                None
            }
        }
    }

    pub fn set_cached_user(&self, user: &UserProfile) {
        match serde_json::to_string(user) {
            Ok(raw) => self.persist(USER_KEY, Some(&raw)),
            Err(e) => warn!(error = %e, "Failed to serialize cached user"),
        }
    }

    pub fn clear_cached_user(&self) {
        self.persist(USER_KEY, None);
    }

    /// Whether `token` is a JWT whose `exp` is still in the future.
    ///
    /// Fails closed: an undecodable token, a missing `exp`, or a past `exp`
    /// are all invalid.
    pub fn is_valid(token: &str) -> bool {
        TokenClaims::decode(token).is_ok_and(|claims| !claims.is_expired())
    }

    pub fn has_valid_token(&self) -> bool {
        self.session.read().access_token.as_deref().is_some_and(Self::is_valid)
    }

    fn persist(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.store.set(key, value),
            None => self.store.remove(key),
        };
        if let Err(e) = result {
            warn!(key = %key, error = %e, "Credential storage write failed");
        }
    }
}

fn read_key(store: &dyn CredentialStore, key: &str) -> Option<String> {
    store.get(key).unwrap_or_else(|e| {
        warn!(key = %key, error = %e, "Credential storage read failed");
        None
    })
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.session.read();
        f.debug_struct("TokenStore")
            .field("has_access_token", &session.access_token.is_some())
            .field("has_refresh_token", &session.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}
