//! CLI commands. Each returns a value the binary renders as text or JSON.

mod capture;
mod flush;
mod run;
mod status;

use std::fmt::Display;

use linkstash_domain::{LinkstashError, Result};
use serde::Serialize;

pub use capture::{capture, CaptureOutcome};
pub use flush::{flush, FlushSummary};
pub use run::{run, run_until};
pub use status::{status, StatusView};

/// Render a command result for the terminal.
///
/// # Errors
///
/// `Internal` if JSON encoding fails.
pub fn render<T>(value: &T, json: bool) -> Result<String>
where
    T: Serialize + Display,
{
    if json {
        serde_json::to_string_pretty(value)
            .map_err(|err| LinkstashError::Internal(format!("failed to encode output: {err}")))
    } else {
        Ok(value.to_string())
    }
}
