//! Platform keychain credential store
//!
//! Thin wrapper over the `keyring` crate: macOS Keychain Access, Windows
//! Credential Manager and the Linux Secret Service. Each key becomes one
//! entry under the configured service name.

use keyring::Entry;
use tracing::debug;

use super::error::{StorageError, StorageResult};
use super::traits::CredentialStore;

/// Credential store backed by the platform keychain.
pub struct KeychainStore {
    service_name: String,
}

impl KeychainStore {
    /// Create a store for a specific service
    ///
    /// # Examples
    /// ```
    /// use chatline_common::storage::KeychainStore;
    ///
    /// let store = KeychainStore::new("chatline.client");
    /// assert_eq!(store.service_name(), "chatline.client");
    /// ```
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn entry(&self, key: &str) -> StorageResult<Entry> {
        Entry::new(&self.service_name, key).map_err(|e| {
            StorageError::Keychain(format!("Failed to create keychain entry for {key}: {e}"))
        })
    }
}

impl CredentialStore for KeychainStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        debug!(service = %self.service_name, key = %key, "Reading keychain entry");

        match self.entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => {
                Err(StorageError::Keychain(format!("Failed to retrieve secret for {key}: {e}")))
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(service = %self.service_name, key = %key, "Writing keychain entry");

        self.entry(key)?
            .set_password(value)
            .map_err(|e| StorageError::Keychain(format!("Failed to store secret for {key}: {e}")))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        debug!(service = %self.service_name, key = %key, "Deleting keychain entry");

        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                Err(StorageError::Keychain(format!("Failed to delete secret for {key}: {e}")))
            }
        }
    }
}
