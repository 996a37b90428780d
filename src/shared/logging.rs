//! Opt-in logging setup built on `tracing`.
//!
//! The library itself only emits `tracing` events and never installs a
//! global subscriber. Binaries and tests that want output can call
//! [`init_logging`] once at startup; `RUST_LOG` overrides the configured
//! level when set.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::{Error, Result};

/// Default verbosity when `RUST_LOG` is unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Everything, including per-line parser traces.
    Trace,
    /// Connection and dispatch detail.
    Debug,
    /// Session lifecycle only.
    #[default]
    Info,
    /// Handled anomalies.
    Warn,
    /// Fatal session failures.
    Error,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Output format for [`init_logging`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Default single-line format without ANSI colors, suitable for log
    /// collectors.
    Plain,
    /// Multi-line human-readable output.
    Pretty,
    /// Abbreviated single-line output.
    #[default]
    Compact,
}

/// Configuration for [`init_logging`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingConfig {
    /// Verbosity when `RUST_LOG` is unset.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
}

/// Install a global `tracing` subscriber.
///
/// Fails if a global subscriber is already installed.
///
/// # Examples
///
/// ```rust,no_run
/// use voltstream::{init_logging, LoggingConfig};
///
/// init_logging(LoggingConfig::default()).expect("subscriber already set");
/// ```
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.directive()));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let fmt_layer = match config.format {
        LogFormat::Plain => fmt_layer.with_ansi(false).boxed(),
        LogFormat::Pretty => fmt_layer.pretty().boxed(),
        LogFormat::Compact => fmt_layer.compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|err| Error::Other(anyhow::Error::new(err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_compact_info() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Compact);
    }

    #[test]
    fn levels_map_to_filter_directives() {
        assert_eq!(LogLevel::Trace.directive(), "trace");
        assert_eq!(LogLevel::Debug.directive(), "debug");
        assert_eq!(LogLevel::Info.directive(), "info");
        assert_eq!(LogLevel::Warn.directive(), "warn");
        assert_eq!(LogLevel::Error.directive(), "error");
    }
}
