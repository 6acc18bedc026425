//! Durable client-side credential storage
//!
//! The token store persists three string entries (`authToken`,
//! `refreshToken`, `user`) through the [`CredentialStore`] trait. Backends:
//!
//! - [`FileStore`]: a single JSON object file
//! - [`KeychainStore`]: one platform keychain entry per key (feature
//!   `keychain`)
//! - [`MemoryStore`]: process memory, for tests and ephemeral clients

pub mod error;
pub mod file;
#[cfg(feature = "keychain")]
pub mod keychain;
pub mod memory;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
#[cfg(feature = "keychain")]
pub use keychain::KeychainStore;
pub use memory::MemoryStore;
pub use traits::CredentialStore;
