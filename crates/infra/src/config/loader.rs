//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the environment, if present
//! 2. Loads from environment variables when `CHATLINE_API_URL` is set
//! 3. Otherwise probes for a config file (JSON or TOML)
//! 4. Otherwise uses defaults (development, `http://localhost:6969`)
//!
//! ## Environment Variables
//! - `CHATLINE_API_URL`: Base URL of the backend (required for env loading)
//! - `CHATLINE_ENV`: `development`, `staging` or `production`
//! - `CHATLINE_REQUEST_TIMEOUT_MS`: Default per-request timeout
//! - `CHATLINE_CONNECT_TIMEOUT_MS`: TCP connect timeout
//! - `CHATLINE_REFRESH_TIMEOUT_MS`: Upper bound for the refresh call
//! - `CHATLINE_REFRESH_PATH`: Refresh endpoint path
//! - `CHATLINE_REFRESH_THRESHOLD_SECS`: Proactive refresh window
//! - `CHATLINE_USER_AGENT`: User-Agent header
//! - `CHATLINE_STORAGE`: `memory`, `file` or `keychain`
//! - `CHATLINE_STORAGE_PATH`: Token file path (file storage)
//! - `CHATLINE_KEYCHAIN_SERVICE`: Keychain service name (keychain storage)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./chatline.{json,toml}` or `./config.{json,toml}` (current directory)
//! 2. The same names in the parent directory
//! 3. Relative to executable location

use std::path::{Path, PathBuf};

use chatline_domain::constants::DEFAULT_KEYCHAIN_SERVICE;
use chatline_domain::{ChatlineError, ClientConfig, Environment, Result, StorageConfig, StorageKind};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["chatline.json", "chatline.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// Environment first, then a config file, then defaults. The result is
/// validated before it is returned.
///
/// # Errors
/// Returns `ChatlineError::Config` if a source is present but invalid, or
/// the resulting configuration fails validation.
pub fn load() -> Result<ClientConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) if std::env::var("CHATLINE_API_URL").is_ok() => return Err(e),
        Err(e) => {
            tracing::debug!(error = ?e, "No environment configuration, trying file");
            match probe_config_paths() {
                Some(path) => load_from_file(Some(path))?,
                None => {
                    tracing::info!("No configuration found, using defaults");
                    ClientConfig::default()
                }
            }
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// `CHATLINE_API_URL` is required; every other variable falls back to its
/// default.
///
/// # Errors
/// Returns `ChatlineError::Config` if `CHATLINE_API_URL` is missing or a
/// variable has an invalid value.
pub fn load_from_env() -> Result<ClientConfig> {
    let defaults = ClientConfig::default();

    let base_url = env_var("CHATLINE_API_URL")?;
    let environment = match optional_env("CHATLINE_ENV") {
        Some(value) => value.parse::<Environment>().map_err(ChatlineError::Config)?,
        None => defaults.environment,
    };

    Ok(ClientConfig {
        environment,
        base_url: Some(base_url),
        request_timeout_ms: env_u64("CHATLINE_REQUEST_TIMEOUT_MS", defaults.request_timeout_ms)?,
        connect_timeout_ms: env_u64("CHATLINE_CONNECT_TIMEOUT_MS", defaults.connect_timeout_ms)?,
        refresh_timeout_ms: env_u64("CHATLINE_REFRESH_TIMEOUT_MS", defaults.refresh_timeout_ms)?,
        refresh_path: optional_env("CHATLINE_REFRESH_PATH").unwrap_or(defaults.refresh_path),
        refresh_threshold_secs: env_u64(
            "CHATLINE_REFRESH_THRESHOLD_SECS",
            defaults.refresh_threshold_secs,
        )?,
        user_agent: optional_env("CHATLINE_USER_AGENT"),
        storage: storage_from_env()?,
    })
}

fn storage_from_env() -> Result<StorageConfig> {
    let Some(kind) = optional_env("CHATLINE_STORAGE") else {
        return Ok(StorageConfig::default());
    };

    Ok(match kind.parse::<StorageKind>().map_err(ChatlineError::Config)? {
        StorageKind::Memory => StorageConfig::Memory,
        StorageKind::File => StorageConfig::File { path: env_var("CHATLINE_STORAGE_PATH")?.into() },
        StorageKind::Keychain => StorageConfig::Keychain {
            service: optional_env("CHATLINE_KEYCHAIN_SERVICE")
                .unwrap_or_else(|| DEFAULT_KEYCHAIN_SERVICE.to_string()),
        },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `ChatlineError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ChatlineError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ChatlineError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ChatlineError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ChatlineError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ChatlineError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ChatlineError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        let parent = cwd.join("..");
        dirs.push(cwd);
        dirs.push(parent);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `ChatlineError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    optional_env(key).ok_or_else(|| {
        ChatlineError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Set and non-empty.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    optional_env(key).map_or(Ok(default), |value| {
        value.trim().parse::<u64>().map_err(|e| ChatlineError::Config(format!("Invalid {key}: {e}")))
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::Builder;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const VARS: [&str; 11] = [
        "CHATLINE_API_URL",
        "CHATLINE_ENV",
        "CHATLINE_REQUEST_TIMEOUT_MS",
        "CHATLINE_CONNECT_TIMEOUT_MS",
        "CHATLINE_REFRESH_TIMEOUT_MS",
        "CHATLINE_REFRESH_PATH",
        "CHATLINE_REFRESH_THRESHOLD_SECS",
        "CHATLINE_USER_AGENT",
        "CHATLINE_STORAGE",
        "CHATLINE_STORAGE_PATH",
        "CHATLINE_KEYCHAIN_SERVICE",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("CHATLINE_API_URL", "https://chat.example.com");
        std::env::set_var("CHATLINE_ENV", "Production");
        std::env::set_var("CHATLINE_REQUEST_TIMEOUT_MS", "15000");
        std::env::set_var("CHATLINE_REFRESH_PATH", "/api/auth/token-refresh");
        std::env::set_var("CHATLINE_REFRESH_THRESHOLD_SECS", "120");
        std::env::set_var("CHATLINE_STORAGE", "file");
        std::env::set_var("CHATLINE_STORAGE_PATH", "/tmp/chatline/tokens.json");

        let result = load_from_env();
        clear_env();

        let config = result.expect("config from env");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.base_url.as_deref(), Some("https://chat.example.com"));
        assert_eq!(config.request_timeout_ms, 15_000);
        assert_eq!(config.connect_timeout_ms, 10_000);
        assert_eq!(config.refresh_path, "/api/auth/token-refresh");
        assert_eq!(config.refresh_threshold_secs, 120);
        assert_eq!(
            config.storage,
            StorageConfig::File { path: PathBuf::from("/tmp/chatline/tokens.json") }
        );
    }

    #[test]
    fn test_load_from_env_missing_url() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, ChatlineError::Config(ref message) if message.contains("CHATLINE_API_URL")));
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("CHATLINE_API_URL", "http://localhost:6969");
        std::env::set_var("CHATLINE_REFRESH_TIMEOUT_MS", "soon");
        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(ChatlineError::Config(_))));
    }

    #[test]
    fn test_file_storage_requires_path() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("CHATLINE_API_URL", "http://localhost:6969");
        std::env::set_var("CHATLINE_STORAGE", "file");
        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(ChatlineError::Config(ref m)) if m.contains("CHATLINE_STORAGE_PATH")));
    }

    #[test]
    fn test_load_rejects_invalid_env_config() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("CHATLINE_API_URL", "http://localhost:6969");
        std::env::set_var("CHATLINE_REQUEST_TIMEOUT_MS", "0");
        let result = load();
        clear_env();

        assert!(matches!(result, Err(ChatlineError::Config(_))));
    }

    #[test]
    fn test_load_from_file_json() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{
                "environment": "staging",
                "base_url": "https://staging.example.com",
                "storage": {{ "kind": "memory" }}
            }}"#
        )
        .unwrap();

        let config = load_from_file(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.environment, Environment::Staging);
        assert_eq!(config.storage, StorageConfig::Memory);
        assert_eq!(config.request_timeout_ms, 30_000);
    }

    #[test]
    fn test_load_from_file_toml() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "base_url = \"https://chat.example.com\"").unwrap();
        writeln!(file, "refresh_threshold_secs = 30").unwrap();
        writeln!(file, "[storage]").unwrap();
        writeln!(file, "kind = \"keychain\"").unwrap();
        writeln!(file, "service = \"chatline.test\"").unwrap();

        let config = load_from_file(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.refresh_threshold_secs, 30);
        assert_eq!(config.storage, StorageConfig::Keychain { service: "chatline.test".into() });
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/chatline.json")));
        assert!(matches!(result, Err(ChatlineError::Config(_))));
    }

    #[test]
    fn test_parse_config_invalid_and_unsupported() {
        assert!(parse_config("not json", Path::new("chatline.json")).is_err());
        assert!(parse_config("[[[", Path::new("chatline.toml")).is_err());
        let err = parse_config("a: 1", Path::new("chatline.yaml")).unwrap_err();
        assert!(matches!(err, ChatlineError::Config(ref m) if m.contains("yaml")));
    }
}
