//! Port interfaces for session management
//!
//! These traits define the boundaries between session logic and the HTTP
//! implementations in `chatline-infra`.

use async_trait::async_trait;
use chatline_domain::{AvatarUpload, LoginRequest, RegisterRequest, Result, UserProfile};
use serde_json::Value;

/// Result of a successful login or registration.
///
/// Token persistence is the gateway's job; the session service only keeps
/// the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthOutcome {
    pub user: Option<UserProfile>,
    pub message: Option<String>,
}

/// Result of a profile mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub message: Option<String>,
    /// Fields to shallow-merge into the current user. `Value::Null` means
    /// the server returned nothing to merge.
    pub changes: Value,
}

/// Authentication endpoints
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Log in and persist the issued tokens
    async fn login(&self, credentials: &LoginRequest) -> Result<AuthOutcome>;

    /// Register and persist the issued tokens
    async fn register(&self, request: &RegisterRequest) -> Result<AuthOutcome>;

    /// Validate the stored token, returning the server's view of the user
    async fn check_token(&self) -> Result<Option<UserProfile>>;

    /// Best-effort server logout. Local credentials are cleared regardless.
    async fn logout(&self) -> Result<()>;
}

/// Profile mutation endpoints
#[async_trait]
pub trait ProfileGateway: Send + Sync {
    async fn update_user(&self, user_id: &str, changes: &Value) -> Result<ProfileUpdate>;

    async fn update_settings(&self, user_id: &str, settings: &Value) -> Result<ProfileUpdate>;

    async fn update_avatar(&self, user_id: &str, avatar: AvatarUpload) -> Result<ProfileUpdate>;

    async fn delete_avatar(&self, user_id: &str) -> Result<ProfileUpdate>;
}
