//! Core domain types

pub mod envelope;
pub mod session;
pub mod user;

pub use envelope::{ApiEnvelope, AuthPayload};
pub use session::Session;
pub use user::{AvatarUpload, LoginRequest, RegisterRequest, UserProfile, UserQuery};
