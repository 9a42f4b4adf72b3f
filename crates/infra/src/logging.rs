//! Subscriber initialization for binaries and examples

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (e.g.
/// `"gridrest_infra=debug,info"`) is used.
///
/// # Errors
///
/// Returns an error instead of panicking when the filter does not parse or
/// a subscriber is already installed.
pub fn init_tracing(default_filter: &str, format: LogFormat) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| LoggingError::InvalidFilter {
            filter: default_filter.to_owned(),
            reason: e.to_string(),
        })?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Compact => {
            registry.with(tracing_subscriber::fmt::layer().compact().with_target(true)).try_init()
        }
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
    };

    installed.map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_reports_error() {
        let first = init_tracing("info", LogFormat::Compact);
        let second = init_tracing("info", LogFormat::Json);

        // Another test binary thread may have won the first install.
        assert!(first.is_ok() || matches!(first, Err(LoggingError::AlreadyInstalled(_))));
        assert!(matches!(second, Err(LoggingError::AlreadyInstalled(_))));
    }

    #[test]
    fn bad_filter_is_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let err = init_tracing("gridrest=[[[", LogFormat::Compact).unwrap_err();
        assert!(matches!(err, LoggingError::InvalidFilter { .. } | LoggingError::AlreadyInstalled(_)));
    }
}
