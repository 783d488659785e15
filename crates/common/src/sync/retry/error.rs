// Error types for retry module
use std::time::Duration;

use thiserror::Error;

/// Errors raised while building a [`super::BackoffPolicy`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackoffError {
    #[error("Invalid backoff configuration: {message}")]
    InvalidConfig { message: String },
}

impl BackoffError {
    pub(crate) fn zero_base() -> Self {
        Self::InvalidConfig { message: "base delay must be greater than zero".to_string() }
    }

    pub(crate) fn base_exceeds_cap(base: Duration, cap: Duration) -> Self {
        Self::InvalidConfig {
            message: format!("base delay {base:?} exceeds delay cap {cap:?}"),
        }
    }

    pub(crate) fn max_attempts_too_small(value: u32, min: u32) -> Self {
        Self::InvalidConfig { message: format!("max_attempts must be at least {min}, got {value}") }
    }
}

/// Result alias for backoff construction
pub type BackoffResult<T> = Result<T, BackoffError>;
