//! `tracing-subscriber` installation

use chatline_domain::impl_enum_str_conversions;
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

/// Default directive when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "info";

static INSTALLED: OnceCell<bool> = OnceCell::new();

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl_enum_str_conversions!(LogFormat {
    Pretty => "pretty",
    Json => "json",
});

/// Installs the global subscriber with an `EnvFilter` (`RUST_LOG`,
/// defaulting to `info`).
///
/// Only the first call has an effect. Returns `false` if another subscriber
/// was already installed by someone else.
pub fn init_tracing(format: LogFormat) -> bool {
    *INSTALLED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let installed = match format {
            LogFormat::Json => fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .try_init(),
            LogFormat::Pretty => fmt().pretty().with_env_filter(filter).with_target(true).try_init(),
        };

        installed.is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::Pretty.to_string(), "pretty");
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn repeated_init_is_harmless() {
        let first = init_tracing(LogFormat::Json);
        let second = init_tracing(LogFormat::Pretty);
        assert_eq!(first, second);
        tracing::info!(target: "chatline_infra::tests", "logging initialised");
    }
}
