//! Backend API: authenticated client, token refresh and endpoint wrappers.

pub mod auth;
pub mod client;
pub mod errors;
pub mod refresh;
pub mod refresher;
pub mod users;

pub use auth::AuthApi;
pub use client::{ApiClient, ApiClientBuilder, ApiClientConfig};
pub use errors::{ApiError, ApiErrorCategory, RefreshError};
pub use refresh::RefreshCoordinator;
pub use refresher::{HttpTokenRefresher, RefreshedTokens, TokenRefresher};
pub use users::UserApi;
