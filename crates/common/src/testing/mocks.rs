//! Mock credential stores

use crate::storage::{CredentialStore, StorageError, StorageResult};
pub use crate::storage::MemoryStore;

/// Credential store whose every operation fails, for exercising the
/// swallow-and-log paths.
#[derive(Debug, Default)]
pub struct FailingStore;

impl FailingStore {
    pub fn new() -> Self {
        Self
    }
}

impl CredentialStore for FailingStore {
    fn get(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(StorageError::Unavailable("storage disabled".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable("storage disabled".to_string()))
    }

    fn remove(&self, _key: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable("storage disabled".to_string()))
    }
}
