//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Queue configuration
pub const DEFAULT_QUEUE_FILE: &str = "linkstash-queue.json";
pub const DEFAULT_KEEP_TERMINAL: usize = 200;
pub const DEFAULT_SYNCING_GRACE_SECS: u64 = 30;
pub const QUEUE_FILE_VERSION: u32 = 1;

// Capture endpoint
pub const DEFAULT_CAPTURE_PATH: &str = "/mobile/v1/share/article";
pub const DEFAULT_TIMEZONE: &str = "Europe/Bucharest";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const USER_AGENT: &str = concat!("linkstash/", env!("CARGO_PKG_VERSION"));

// Triggers
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 15;

// Error reporting
pub const MAX_ERROR_MESSAGE_LEN: usize = 256;
pub const INTERRUPTED_DELIVERY_MESSAGE: &str =
    "delivery interrupted before its outcome was recorded";

/// Query keys stripped during URL normalization, in addition to any `utm_*`.
pub const TRACKING_QUERY_KEYS: &[&str] =
    &["fbclid", "gclid", "igshid", "mc_cid", "mc_eid", "mkt_tok", "ref_src", "spm"];
