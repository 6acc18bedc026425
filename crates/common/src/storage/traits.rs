//! Credential store abstraction

use super::error::StorageResult;

/// Key/value store for session credentials.
///
/// Implementations must be usable from any thread. Calls are synchronous and
/// short; callers never hold them across an `.await`.
pub trait CredentialStore: Send + Sync {
    /// Value for `key`, or `None` when the entry does not exist.
    ///
    /// # Errors
    /// Returns an error only when the backend could not be read.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Inserts or replaces the entry.
    ///
    /// # Errors
    /// Returns an error if the value could not be persisted.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes the entry. Removing a missing entry is not an error.
    ///
    /// # Errors
    /// Returns an error if the backend could not be updated.
    fn remove(&self, key: &str) -> StorageResult<()>;
}
