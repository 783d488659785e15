//! Logging initialization
//!
//! - Console output on stderr, human-readable or JSON
//! - Optional daily-rotated log file when a directory is configured
//! - Filter from `RUST_LOG`, falling back to the configured level

use linkstash_domain::{LinkstashError, LoggingConfig, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// File name prefix of the rotated log file.
pub const LOG_FILE_NAME: &str = "linkstash.log";

/// Guard that keeps the file writer alive
///
/// When dropped, flushes any pending log writes. Hold it for the lifetime of
/// the process.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _guard: Option<WorkerGuard>,
}

/// Initialize the global subscriber.
///
/// # Errors
///
/// `LinkstashError::Config` when the filter or log directory is unusable, or
/// a global subscriber was already installed.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            LinkstashError::Config(format!("Invalid log level '{}': {e}", config.level))
        })?,
    };

    let console = if config.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).with_target(false).boxed()
    };

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                LinkstashError::Config(format!(
                    "Failed to create log directory {}: {e}",
                    dir.display()
                ))
            })?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_NAME);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| LinkstashError::Config(format!("Failed to install log subscriber: {e}")))?;

    tracing::debug!(
        level = %config.level,
        json = config.json,
        directory = ?config.directory,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Initialize logging for tests (captured by the test harness)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}
