//! Outcome classification for a single delivery attempt.

use std::time::Duration;

use linkstash_domain::{CaptureResponse, CaptureStatus, TerminalOutcome, TransportError};

/// What the queue should do with an entry after an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Final; apply with `mark_terminal`.
    Terminal(TerminalOutcome),
    /// Try again later; apply with `mark_retry`.
    Retry { message: String, not_before: Option<Duration> },
}

impl Disposition {
    fn rejected(message: impl Into<String>) -> Self {
        Self::Terminal(TerminalOutcome::Rejected { message: message.into() })
    }

    fn retry(message: impl Into<String>) -> Self {
        Self::Retry { message: message.into(), not_before: None }
    }
}

/// Map a transport result onto a queue transition.
#[must_use]
pub fn classify(result: Result<CaptureResponse, TransportError>) -> Disposition {
    match result {
        Ok(response) => classify_response(&response),
        Err(err) => classify_error(err),
    }
}

fn classify_response(response: &CaptureResponse) -> Disposition {
    if let Some(outcome) = response.success_outcome() {
        return Disposition::Terminal(outcome);
    }
    let message = response.failure_message();
    match response.status {
        CaptureStatus::Failed if !response.failure_is_retryable() => Disposition::rejected(message),
        _ => Disposition::retry(message),
    }
}

fn classify_error(err: TransportError) -> Disposition {
    if !err.is_retryable() {
        return Disposition::rejected(err.to_string());
    }
    let not_before = err.retry_after();
    Disposition::Retry { message: err.to_string(), not_before }
}
