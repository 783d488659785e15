//! Test doubles for the sync ports.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use linkstash_domain::{
    CaptureRequest, CaptureResponse, CaptureStatus, LinkstashError, PendingSubmission, Result,
    TransportError,
};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use super::ports::{CaptureTransport, FlushScheduler, SubmissionRepository};

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// Repository that keeps the last saved snapshot in memory.
#[derive(Default)]
pub struct InMemoryRepository {
    entries: Mutex<Vec<PendingSubmission>>,
    saves: AtomicUsize,
    fail: AtomicBool,
}

impl InMemoryRepository {
    pub fn with_entries(entries: Vec<PendingSubmission>) -> Self {
        Self { entries: Mutex::new(entries), ..Self::default() }
    }

    pub fn saved(&self) -> Vec<PendingSubmission> {
        self.entries.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubmissionRepository for InMemoryRepository {
    async fn load(&self) -> Result<Vec<PendingSubmission>> {
        Ok(self.entries.lock().clone())
    }

    async fn save(&self, entries: &[PendingSubmission]) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LinkstashError::Storage("disk full".into()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.entries.lock() = entries.to_vec();
        Ok(())
    }
}

pub fn saved_response() -> CaptureResponse {
    CaptureResponse {
        status: CaptureStatus::Saved,
        request_id: Some("req-1".into()),
        backend_status: Some("stored".into()),
        bucket_item_id: Some("item-1".into()),
        title: Some("A story".into()),
        canonical_url: None,
        message: None,
        candidates: Vec::new(),
        error: None,
    }
}

/// Transport that replays scripted results, defaulting to `saved`.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<std::result::Result<CaptureResponse, TransportError>>>,
    requests: Mutex<Vec<CaptureRequest>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, result: std::result::Result<CaptureResponse, TransportError>) {
        self.script.lock().push_back(result);
    }

    /// Block every submit until a permit is added to the returned semaphore.
    pub fn gated(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<CaptureRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl CaptureTransport for ScriptedTransport {
    async fn submit(
        &self,
        request: &CaptureRequest,
    ) -> std::result::Result<CaptureResponse, TransportError> {
        self.requests.lock().push(request.clone());
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }
        self.script.lock().pop_front().unwrap_or_else(|| Ok(saved_response()))
    }
}

/// Scheduler that records requests.
#[derive(Default)]
pub struct RecordingScheduler {
    asap: AtomicUsize,
    delays: Mutex<Vec<Duration>>,
}

impl RecordingScheduler {
    pub fn asap_count(&self) -> usize {
        self.asap.load(Ordering::SeqCst)
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }

    pub fn last_delay(&self) -> Option<Duration> {
        self.delays.lock().last().copied()
    }
}

impl FlushScheduler for RecordingScheduler {
    fn run_as_soon_as_possible(&self) {
        self.asap.fetch_add(1, Ordering::SeqCst);
    }

    fn run_after_delay(&self, delay: Duration) {
        self.delays.lock().push(delay);
    }
}
