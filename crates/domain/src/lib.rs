//! # Chatline Domain
//!
//! Domain types and models for the Chatline client.
//!
//! This crate contains:
//! - Session, user profile and API envelope types
//! - Domain error types and Result definitions
//! - Client configuration structures
//! - Endpoint paths and storage key constants
//!
//! ## Architecture
//! - No dependencies on other Chatline crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod endpoints;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::json::merge_objects;
