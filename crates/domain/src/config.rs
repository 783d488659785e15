//! Configuration structures
//!
//! Every field has a default so a partial JSON/TOML file (or none at all)
//! still yields a usable configuration. Loading lives in
//! `linkstash_infra::config`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CAPTURE_PATH, DEFAULT_FLUSH_INTERVAL_SECS, DEFAULT_KEEP_TERMINAL, DEFAULT_QUEUE_FILE,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SYNCING_GRACE_SECS, DEFAULT_TIMEZONE,
};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub queue: QueueConfig,
    pub backoff: BackoffConfig,
    pub transport: TransportConfig,
    pub triggers: TriggerConfig,
    pub logging: LoggingConfig,
}

/// Local persisted queue settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Path of the JSON queue document.
    pub path: PathBuf,
    /// Number of terminal entries retained by garbage collection.
    pub keep_terminal: usize,
    /// How long a `syncing` entry left by a crash waits before it is retried.
    pub syncing_grace_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_QUEUE_FILE),
            keep_terminal: DEFAULT_KEEP_TERMINAL,
            syncing_grace_secs: DEFAULT_SYNCING_GRACE_SECS,
        }
    }
}

/// Named backoff presets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffPreset {
    /// 10s base, 15 minute cap, unbounded attempts.
    #[default]
    Fast,
    /// 30s base, 6 hour cap, 8 attempts.
    Conservative,
}

impl std::str::FromStr for BackoffPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" | "fast_retry" => Ok(Self::Fast),
            "conservative" => Ok(Self::Conservative),
            other => Err(format!("Invalid BackoffPreset: {other}")),
        }
    }
}

/// Retry delay settings
///
/// Explicit `base_secs`/`cap_secs`/`max_attempts` override the preset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub preset: BackoffPreset,
    pub base_secs: Option<u64>,
    pub cap_secs: Option<u64>,
    pub max_attempts: Option<u32>,
}

/// Remote capture endpoint settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Full URL of the capture endpoint, or a base URL to which
    /// [`DEFAULT_CAPTURE_PATH`] is appended.
    pub endpoint: String,
    pub api_token: Option<String>,
    pub timezone: String,
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_token: None,
            timezone: DEFAULT_TIMEZONE.to_string(),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConfig")
            .field("endpoint", &self.endpoint)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("timezone", &self.timezone)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl TransportConfig {
    /// Endpoint with the default capture path appended when only a base URL
    /// (no path, or `/`) was configured.
    #[must_use]
    pub fn capture_url(&self) -> String {
        let endpoint = self.endpoint.trim();
        match url::Url::parse(endpoint) {
            Ok(parsed) if parsed.path() == "/" || parsed.path().is_empty() => {
                format!("{}{DEFAULT_CAPTURE_PATH}", endpoint.trim_end_matches('/'))
            }
            _ => endpoint.to_string(),
        }
    }
}

/// Periodic and lifecycle trigger settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub enabled: bool,
    pub flush_interval_secs: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self { enabled: true, flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
    /// Directory for a daily-rotated log file. Console only when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false, directory: None }
    }
}
