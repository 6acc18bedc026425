//! Observable session state

use chatline_domain::UserProfile;

/// Snapshot published to observers on every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl SessionState {
    /// State before `initialize` has run.
    pub fn initial() -> Self {
        Self { is_loading: true, ..Self::default() }
    }

    pub fn logged_out() -> Self {
        Self::default()
    }

    pub fn logged_in(user: Option<UserProfile>) -> Self {
        Self { user, is_authenticated: true, ..Self::default() }
    }

    /// Failed login or registration.
    pub fn failed(message: impl Into<String>) -> Self {
        Self { error: Some(message.into()), ..Self::default() }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().and_then(|user| user.id.as_deref())
    }
}
