//! Shared client utilities for Chatline crates.
//!
//! - `auth`: token store, JWT expiry claims, auth-failure signal
//! - `storage`: durable credential stores (file, platform keychain)
//! - `testing`: failing store and JWT fixtures (feature `test-utils`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod storage;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
pub use auth::{AuthFailureEvent, AuthFailureSignal, ClaimsError, TokenClaims, TokenStore};
#[cfg(feature = "keychain")]
pub use storage::KeychainStore;
pub use storage::{CredentialStore, FileStore, MemoryStore, StorageError, StorageResult};
