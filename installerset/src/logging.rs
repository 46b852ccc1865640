//! Logging configuration module
//!
//! Console logging with an optional rolling JSON file, filtered by `RUST_LOG`
//! or the configured level.

use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_NAME: &str = "installerset.log";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,             // trace, debug, info, warn, error
    pub file_dir: Option<String>,  // directory for rolling log files
    pub rotation: LogRotation,
    pub ansi: bool,
}

/// Log rotation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_dir: None,
            rotation: LogRotation::Daily,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Filter directive, `RUST_LOG` taking precedence over the configured level
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    /// Install the global subscriber.
    ///
    /// Keep the returned guard alive for as long as file logs should be
    /// written; dropping it flushes and stops the file writer.
    pub fn init(&self) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
        // Logs go to stderr so command output on stdout stays parseable
        let console_layer = fmt::layer()
            .with_target(false)
            .with_level(true)
            .with_ansi(self.ansi)
            .with_writer(io::stderr);

        let guard = if let Some(ref dir) = self.file_dir {
            let file_appender = match self.rotation {
                LogRotation::Hourly => rolling::hourly(dir, LOG_FILE_NAME),
                LogRotation::Daily => rolling::daily(dir, LOG_FILE_NAME),
                LogRotation::Never => rolling::never(dir, LOG_FILE_NAME),
            };
            let (writer, guard) = non_blocking(file_appender);

            let file_layer = fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_writer(writer);

            tracing_subscriber::registry()
                .with(self.env_filter())
                .with(console_layer)
                .with(file_layer)
                .try_init()?;
            Some(guard)
        } else {
            tracing_subscriber::registry()
                .with(self.env_filter())
                .with(console_layer)
                .try_init()?;
            None
        };

        tracing::debug!(level = %self.level, file_dir = ?self.file_dir, "logging initialized");
        Ok(guard)
    }
}

impl std::str::FromStr for LogRotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "never" => Ok(Self::Never),
            other => Err(format!("unknown log rotation '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_log_to_console_only() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.file_dir.is_none());
        assert_eq!(config.rotation, LogRotation::Daily);
    }

    #[test]
    fn test_rotation_parse() {
        assert_eq!("Hourly".parse::<LogRotation>(), Ok(LogRotation::Hourly));
        assert_eq!("never".parse::<LogRotation>(), Ok(LogRotation::Never));
        assert!("weekly".parse::<LogRotation>().is_err());
    }
}
