//! Error types used throughout the application

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Linkstash
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum LinkstashError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Linkstash operations
pub type Result<T> = std::result::Result<T, LinkstashError>;

/// Failure of a single capture RPC.
///
/// The variant decides whether the submission is retried; the payload is the
/// message stored in the entry's `last_error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, DNS failure, reset mid-body.
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// HTTP 429. `retry_after` comes from the `Retry-After` header.
    #[error("rate limited (HTTP 429): {message}")]
    RateLimited { retry_after: Option<Duration>, message: String },

    /// HTTP 401/403.
    #[error("{message}")]
    Unauthorized { status: u16, message: String },

    /// Any other 4xx. The message is the backend's detail, verbatim.
    #[error("{message}")]
    Validation { status: u16, message: String },

    /// 2xx whose body could not be decoded.
    #[error("invalid response from capture endpoint: {0}")]
    InvalidResponse(String),

    /// The client itself is unusable (bad endpoint, header values).
    #[error("transport configuration error: {0}")]
    Config(String),
}

impl TransportError {
    /// Whether the same request may succeed if sent again later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Timeout(_)
                | Self::Server { .. }
                | Self::RateLimited { .. }
                | Self::InvalidResponse(_)
        )
    }

    /// Server-provided floor for the next attempt, if any.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status associated with the failure, if one was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. }
            | Self::Unauthorized { status, .. }
            | Self::Validation { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }
}

impl From<TransportError> for LinkstashError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Config(message) => Self::Config(message),
            other => Self::Network(other.to_string()),
        }
    }
}
