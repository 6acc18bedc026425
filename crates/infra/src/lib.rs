//! # Chatline Infrastructure
//!
//! Infrastructure implementations of core session ports.
//!
//! This crate contains:
//! - HTTP request execution (timeouts, response decoding)
//! - Single-flight token refresh with request queuing
//! - Auth and user endpoint wrappers
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `chatline-core`
//! - Depends on `chatline-common` and `chatline-domain`
//! - Contains all "impure" code (network, environment, filesystem)

pub mod api;
pub mod config;
pub mod context;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::{
    ApiClient, ApiClientBuilder, ApiClientConfig, ApiError, ApiErrorCategory, AuthApi,
    HttpTokenRefresher, RefreshCoordinator, RefreshError, RefreshedTokens, TokenRefresher,
    UserApi,
};
pub use context::ClientContext;
pub use http::{HttpClient, MultipartForm, RequestBody, RequestOptions, ResponseBody};
