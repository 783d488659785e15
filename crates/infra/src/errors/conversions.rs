//! Conversions from external infrastructure errors into domain errors.

use std::io::{Error as IoError, ErrorKind};
use std::time::Duration;

use linkstash_domain::{LinkstashError, TransportError};
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub LinkstashError);

impl From<InfraError> for LinkstashError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<LinkstashError> for InfraError {
    fn from(value: LinkstashError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoLinkstashError {
    fn into_linkstash(self) -> LinkstashError;
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → LinkstashError */
/* -------------------------------------------------------------------------- */

impl IntoLinkstashError for IoError {
    fn into_linkstash(self) -> LinkstashError {
        match self.kind() {
            ErrorKind::NotFound => LinkstashError::NotFound(self.to_string()),
            ErrorKind::PermissionDenied => {
                LinkstashError::Storage(format!("permission denied: {self}"))
            }
            _ => LinkstashError::Storage(format!("I/O failure: {self}")),
        }
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(value.into_linkstash())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → LinkstashError */
/* -------------------------------------------------------------------------- */

impl IntoLinkstashError for JsonError {
    fn into_linkstash(self) -> LinkstashError {
        if self.is_io() {
            LinkstashError::Storage(format!("JSON I/O failure: {self}"))
        } else {
            LinkstashError::Storage(format!("invalid JSON document: {self}"))
        }
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_linkstash())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → LinkstashError / TransportError */
/* -------------------------------------------------------------------------- */

impl IntoLinkstashError for HttpError {
    fn into_linkstash(self) -> LinkstashError {
        if self.is_builder() {
            return LinkstashError::Config(format!("invalid HTTP client setup: {self}"));
        }
        LinkstashError::from(transport_error_from_reqwest(self, None))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_linkstash())
    }
}

/// Map a reqwest failure onto the transport taxonomy.
///
/// `timeout` is reported on [`TransportError::Timeout`] when reqwest's own
/// timer fired.
pub fn transport_error_from_reqwest(err: HttpError, timeout: Option<Duration>) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout(timeout.unwrap_or_default());
    }

    if err.is_builder() {
        return TransportError::Config(err.to_string());
    }

    if err.is_decode() {
        return TransportError::InvalidResponse(err.to_string());
    }

    if let Some(status) = err.status() {
        let code = status.as_u16();
        let message =
            format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

        return match code {
            401 | 403 => TransportError::Unauthorized { status: code, message },
            429 => TransportError::RateLimited { retry_after: None, message },
            400..=499 => TransportError::Validation { status: code, message },
            _ => TransportError::Server { status: code, message },
        };
    }

    #[cfg(not(target_arch = "wasm32"))]
    if err.is_connect() {
        return TransportError::Network(format!("HTTP connection failure: {err}"));
    }

    TransportError::Network(err.to_string())
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
