//! Session token handling
//!
//! - [`TokenStore`]: the access/refresh token pair in memory, mirrored to a
//!   durable [`CredentialStore`](crate::storage::CredentialStore)
//! - [`TokenClaims`]: expiry read from an unverified JWT payload
//! - [`AuthFailureSignal`]: broadcast raised when a session cannot be
//!   recovered

pub mod claims;
pub mod signal;
pub mod token_store;

pub use claims::{ClaimsError, TokenClaims};
pub use signal::{AuthFailureEvent, AuthFailureSignal};
pub use token_store::TokenStore;
