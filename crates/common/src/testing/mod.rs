//! Testing utilities and helpers
//!
//! - **[`mocks`]**: always-failing credential store (plus `MemoryStore`)
//! - **[`fixtures`]**: unsigned JWTs with controlled expiry
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(feature = "test-utils")]
//! # {
//! use std::sync::Arc;
//!
//! use chatline_common::testing::{jwt_expiring_in, MemoryStore};
//! use chatline_common::TokenStore;
//!
//! let tokens = TokenStore::new(Arc::new(MemoryStore::new()));
//! tokens.set_token(Some(&jwt_expiring_in(300)));
//! assert!(tokens.has_valid_token());
//! # }
//! ```

pub mod fixtures;
pub mod mocks;

pub use fixtures::{expired_jwt, jwt_expiring_in, jwt_with_payload};
pub use mocks::{FailingStore, MemoryStore};
