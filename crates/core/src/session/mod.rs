//! Authenticated session state

pub mod ports;
pub mod service;
pub mod state;

pub use service::SessionService;
pub use state::SessionState;
