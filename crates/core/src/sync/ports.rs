//! Port interfaces for sync operations

use std::time::Duration;

use async_trait::async_trait;
use linkstash_domain::{CaptureRequest, CaptureResponse, PendingSubmission, Result, TransportError};

/// Durable storage for the whole submission collection.
///
/// The queue is small (active entries plus a bounded tail of terminal ones),
/// so adapters persist it as a single snapshot.
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Load every stored submission, repairing or dropping malformed records.
    async fn load(&self) -> Result<Vec<PendingSubmission>>;

    /// Replace the stored collection with `entries`.
    async fn save(&self, entries: &[PendingSubmission]) -> Result<()>;
}

/// Client for the remote capture RPC
#[async_trait]
pub trait CaptureTransport: Send + Sync {
    /// Deliver one capture request.
    async fn submit(
        &self,
        request: &CaptureRequest,
    ) -> std::result::Result<CaptureResponse, TransportError>;
}

/// Deferred wake-ups requested by the orchestrator.
///
/// Both calls are fire-and-forget; an adapter that cannot honour them logs
/// and moves on.
pub trait FlushScheduler: Send + Sync {
    /// Run a flush soon. Coalesces with any pending request.
    fn run_as_soon_as_possible(&self);

    /// Run a flush after `delay`, replacing any previously scheduled delay.
    fn run_after_delay(&self, delay: Duration);
}
