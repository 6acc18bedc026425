//! # Chatline Core
//!
//! Session logic with no transport dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for authentication and profile calls
//! - The session state holder observed by the UI
//!
//! ## Architecture Principles
//! - Only depends on `chatline-common` and `chatline-domain`
//! - No HTTP or platform code
//! - All external calls via traits

pub mod session;

pub use session::ports::{AuthGateway, AuthOutcome, ProfileGateway, ProfileUpdate};
pub use session::{SessionService, SessionState};
