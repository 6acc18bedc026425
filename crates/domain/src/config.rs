//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_DEVELOPMENT_URL, DEFAULT_KEYCHAIN_SERVICE,
    DEFAULT_REFRESH_THRESHOLD_SECS, DEFAULT_REFRESH_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS,
};
use crate::endpoints;
use crate::errors::{ChatlineError, Result};
use crate::impl_enum_str_conversions;

/// Deployment the client talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl_enum_str_conversions!(Environment {
    Development => "development",
    Staging => "staging",
    Production => "production",
});

impl Environment {
    /// Built-in base URL, if the environment has one.
    pub const fn default_base_url(self) -> Option<&'static str> {
        match self {
            Self::Development => Some(DEFAULT_DEVELOPMENT_URL),
            Self::Staging | Self::Production => None,
        }
    }
}

/// Durable storage backend for tokens and the cached user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Process memory only; nothing survives a restart.
    Memory,
    /// JSON file on disk.
    File { path: PathBuf },
    /// Platform keychain entries under `service`.
    Keychain { service: String },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Keychain { service: DEFAULT_KEYCHAIN_SERVICE.to_string() }
    }
}

/// Kind of storage named by `CHATLINE_STORAGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    File,
    Keychain,
}

impl_enum_str_conversions!(StorageKind {
    Memory => "memory",
    File => "file",
    Keychain => "keychain",
});

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub environment: Environment,
    /// Overrides the environment's built-in URL.
    pub base_url: Option<String>,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub refresh_timeout_ms: u64,
    pub refresh_path: String,
    pub refresh_threshold_secs: u64,
    pub user_agent: Option<String>,
    pub storage: StorageConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            base_url: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            refresh_timeout_ms: DEFAULT_REFRESH_TIMEOUT_MS,
            refresh_path: endpoints::auth::REFRESH.to_string(),
            refresh_threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
            user_agent: None,
            storage: StorageConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Effective base URL without a trailing slash.
    ///
    /// # Errors
    /// Returns `ChatlineError::Config` when no URL is configured and the
    /// environment has no built-in default.
    pub fn resolved_base_url(&self) -> Result<String> {
        let url = self
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.environment.default_base_url())
            .ok_or_else(|| {
                ChatlineError::Config(format!(
                    "base_url is required for the {} environment",
                    self.environment
                ))
            })?;
        Ok(url.trim().trim_end_matches('/').to_string())
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub const fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }

    pub const fn refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.refresh_threshold_secs)
    }

    /// Checks values that serde cannot.
    ///
    /// # Errors
    /// Returns `ChatlineError::Config` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.resolved_base_url()?;
        if self.request_timeout_ms == 0 {
            return Err(ChatlineError::Config("request_timeout_ms must be positive".into()));
        }
        if self.refresh_timeout_ms == 0 {
            return Err(ChatlineError::Config("refresh_timeout_ms must be positive".into()));
        }
        if !self.refresh_path.starts_with('/') {
            return Err(ChatlineError::Config(format!(
                "refresh_path must start with '/': {}",
                self.refresh_path
            )));
        }
        Ok(())
    }
}
