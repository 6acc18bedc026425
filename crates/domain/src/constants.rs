//! Application constants
//!
//! Centralized location for domain-level constants used throughout the
//! client.

// Durable storage keys
pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";

// Request defaults
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_REFRESH_TIMEOUT_MS: u64 = 30_000;
pub const HEALTH_CHECK_TIMEOUT_MS: u64 = 5_000;

/// Refresh a decodable access token this many seconds before it expires.
pub const DEFAULT_REFRESH_THRESHOLD_SECS: u64 = 60;

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data";

pub const DEFAULT_DEVELOPMENT_URL: &str = "http://localhost:6969";
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "chatline.client";

// User-facing messages
pub const AUTH_FAILURE_MESSAGE: &str = "Authentication failed. Please log in again.";
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";
pub const TIMEOUT_MESSAGE: &str = "Request timeout. Please try again.";
