//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `LINKSTASH_QUEUE_PATH`: Queue file path (required)
//! - `LINKSTASH_ENDPOINT`: Capture endpoint or API base URL (required)
//! - `LINKSTASH_API_TOKEN`: Bearer token for the capture endpoint
//! - `LINKSTASH_TIMEZONE`: IANA timezone sent with captures
//! - `LINKSTASH_KEEP_TERMINAL`: Terminal entries kept by garbage collection
//! - `LINKSTASH_BACKOFF_PRESET`: `fast` or `conservative`
//! - `LINKSTASH_FLUSH_INTERVAL`: Periodic flush interval in seconds
//! - `LINKSTASH_TRIGGERS_ENABLED`: Whether automatic flushes run (true/false)
//! - `LINKSTASH_LOG_LEVEL`: Default log filter when `RUST_LOG` is unset
//! - `LINKSTASH_LOG_JSON`: Emit JSON log lines (true/false)
//! - `LINKSTASH_LOG_DIR`: Directory for a daily-rotated log file
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./linkstash.json` or `./linkstash.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use linkstash_common::BackoffPolicy;
use linkstash_domain::{
    BackoffConfig, BackoffPreset, Config, LinkstashError, LoggingConfig, QueueConfig, Result,
    TransportConfig, TriggerConfig,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `LinkstashError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
pub fn load() -> Result<Config> {
    // Try loading from environment first
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            // Fall back to file
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// The queue path and endpoint must be present; everything else falls back
/// to its default.
///
/// # Environment Variables
/// See module documentation for the complete list.
///
/// # Errors
/// Returns `LinkstashError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    let queue_path = env_var("LINKSTASH_QUEUE_PATH")?;
    let endpoint = env_var("LINKSTASH_ENDPOINT")?;

    let mut queue = QueueConfig { path: PathBuf::from(queue_path), ..QueueConfig::default() };
    if let Some(keep) = env_parse::<usize>("LINKSTASH_KEEP_TERMINAL", "keep-terminal count")? {
        queue.keep_terminal = keep;
    }

    let mut backoff = BackoffConfig::default();
    if let Some(preset) = env_parse::<BackoffPreset>("LINKSTASH_BACKOFF_PRESET", "backoff preset")? {
        backoff.preset = preset;
    }

    let mut transport = TransportConfig {
        endpoint,
        api_token: std::env::var("LINKSTASH_API_TOKEN").ok().filter(|t| !t.trim().is_empty()),
        ..TransportConfig::default()
    };
    if let Ok(timezone) = std::env::var("LINKSTASH_TIMEZONE") {
        if !timezone.trim().is_empty() {
            transport.timezone = timezone.trim().to_string();
        }
    }

    let mut triggers = TriggerConfig {
        enabled: env_bool("LINKSTASH_TRIGGERS_ENABLED", true),
        ..TriggerConfig::default()
    };
    if let Some(interval) = env_parse::<u64>("LINKSTASH_FLUSH_INTERVAL", "flush interval")? {
        triggers.flush_interval_secs = interval;
    }

    let mut logging = LoggingConfig {
        json: env_bool("LINKSTASH_LOG_JSON", false),
        directory: std::env::var("LINKSTASH_LOG_DIR").ok().map(PathBuf::from),
        ..LoggingConfig::default()
    };
    if let Ok(level) = std::env::var("LINKSTASH_LOG_LEVEL") {
        logging.level = level;
    }

    Ok(Config { queue, backoff, transport, triggers, logging })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `LinkstashError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(LinkstashError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            LinkstashError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| LinkstashError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `LinkstashError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| LinkstashError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| LinkstashError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(LinkstashError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the working directory (and up to two parents), then the
/// executable's directory.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidate_files(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidate_files(exe_dir));
        }
    }

    // Return first existing candidate
    candidates.into_iter().find(|path| path.exists())
}

fn candidate_files(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("linkstash.json"),
        dir.join("linkstash.toml"),
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Build the retry policy described by `config`.
///
/// Starts from the preset and applies explicit overrides.
///
/// # Errors
/// Returns `LinkstashError::Config` when the resulting policy is invalid
/// (zero base, cap below base, zero attempts).
pub fn backoff_policy(config: &BackoffConfig) -> Result<BackoffPolicy> {
    let preset = match config.preset {
        BackoffPreset::Fast => BackoffPolicy::fast_retry(),
        BackoffPreset::Conservative => BackoffPolicy::conservative(),
    };

    let base = config.base_secs.map_or(preset.base(), Duration::from_secs);
    let cap = config.cap_secs.map_or(preset.cap(), Duration::from_secs);
    let max_attempts = config.max_attempts.or(preset.max_attempts());

    BackoffPolicy::new(base, cap, max_attempts)
        .map_err(|e| LinkstashError::Config(format!("Invalid backoff configuration: {e}")))
}

/// Get required environment variable
///
/// # Errors
/// Returns `LinkstashError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        LinkstashError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional environment variable.
///
/// # Errors
/// Returns `LinkstashError::Config` if the variable is set but invalid.
fn env_parse<T>(key: &str, what: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| LinkstashError::Config(format!("Invalid {what}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
///
/// # Returns
/// The parsed boolean value, or `default` if not set.
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
