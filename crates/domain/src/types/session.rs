//! Authenticated session credentials

use serde::{Deserialize, Serialize};

/// Access and refresh token pair held by the client.
///
/// An absent access token means authenticated requests fail before any
/// network call is made.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self { access_token: Some(access_token.into()), refresh_token }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }
}
