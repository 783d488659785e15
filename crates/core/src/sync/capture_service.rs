//! Capture service - entry point for share events and the status surface

use std::sync::Arc;

use linkstash_domain::{PendingSubmission, QueueSummary, Result};
use tracing::{info, instrument};

use super::ports::FlushScheduler;
use super::queue_store::QueueStore;

/// Accepts captures and exposes queue state to the client.
pub struct CaptureService {
    store: Arc<QueueStore>,
    scheduler: Arc<dyn FlushScheduler>,
}

impl CaptureService {
    pub fn new(store: Arc<QueueStore>, scheduler: Arc<dyn FlushScheduler>) -> Self {
        Self { store, scheduler }
    }

    /// Queue a shared link and ask for a flush.
    ///
    /// Returns the stored entry, which is the already-active one when the
    /// link was captured before and has not been delivered yet.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for links that are not absolute http(s) URLs, and
    /// storage errors.
    #[instrument(skip(self, shared_text, source_app))]
    pub async fn capture(
        &self,
        url: &str,
        shared_text: Option<&str>,
        source_app: Option<&str>,
    ) -> Result<PendingSubmission> {
        let entry = self.store.enqueue_or_merge(url, shared_text, source_app).await?;
        self.scheduler.run_as_soon_as_possible();
        Ok(entry)
    }

    /// Manual retry: re-triggers delivery of whatever is due. Entries whose
    /// retries are exhausted stay failed.
    pub fn retry_now(&self) {
        info!("manual retry requested");
        self.scheduler.run_as_soon_as_possible();
    }

    pub async fn recent(&self, limit: usize) -> Vec<PendingSubmission> {
        self.store.list_recent(limit).await
    }

    pub async fn summary(&self) -> QueueSummary {
        self.store.summary().await
    }
}
