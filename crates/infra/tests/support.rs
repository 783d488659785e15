#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use linkstash_common::{BackoffPolicy, MockClock};
use linkstash_core::{OrchestratorSettings, QueueStore, SyncOrchestrator};
use linkstash_infra::scheduling::DriverInbox;
use linkstash_infra::{
    CaptureClientConfig, FlushDriver, FlushHandle, HttpCaptureTransport, JsonFileRepository,
};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const CAPTURE_PATH: &str = "/mobile/v1/share/article";

/// Queue file, store, HTTP transport and orchestrator wired like the app.
pub struct TestStack {
    pub clock: MockClock,
    pub store: Arc<QueueStore>,
    pub orchestrator: SyncOrchestrator,
    pub handle: FlushHandle,
    pub queue_path: PathBuf,
    _inbox: DriverInbox,
    _dir: Arc<TempDir>,
}

pub struct StackBuilder {
    dir: Arc<TempDir>,
    clock: MockClock,
    endpoint: String,
    policy: BackoffPolicy,
}

impl StackBuilder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            dir: Arc::new(TempDir::new().expect("temp dir should be created")),
            clock: MockClock::new(),
            endpoint: endpoint.into(),
            policy: BackoffPolicy::fast_retry(),
        }
    }

    pub fn policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn queue_path(&self) -> PathBuf {
        self.dir.path().join("queue.json")
    }

    pub fn clock(&self) -> MockClock {
        self.clock.clone()
    }

    pub async fn build(&self) -> TestStack {
        let queue_path = self.queue_path();
        let repository = Arc::new(
            JsonFileRepository::open(&queue_path, self.clock.shared())
                .expect("queue lock should be free"),
        );
        let store = Arc::new(
            QueueStore::open(repository, self.policy, self.clock.shared())
                .await
                .expect("queue store should open"),
        );
        let transport = HttpCaptureTransport::with_config(CaptureClientConfig {
            endpoint: self.endpoint.clone(),
            api_token: Some("test-token".into()),
            timeout: Duration::from_secs(5),
        })
        .expect("capture transport should build")
        .with_clock(self.clock.shared());
        let (handle, inbox) = FlushDriver::channel();
        let orchestrator = SyncOrchestrator::new(
            store.clone(),
            Arc::new(transport),
            Arc::new(handle.clone()),
            self.clock.shared(),
            OrchestratorSettings { timezone: "UTC".into(), ..OrchestratorSettings::default() },
        );

        TestStack {
            clock: self.clock.clone(),
            store,
            orchestrator,
            handle,
            queue_path,
            _inbox: inbox,
            _dir: self.dir.clone(),
        }
    }
}

pub fn saved_body(title: &str) -> Value {
    json!({
        "status": "saved",
        "request_id": "req-1",
        "backend_status": "stored",
        "bucket_item_id": "item-1",
        "title": title,
    })
}

/// Parse the queue document currently on disk.
pub fn read_queue_file(path: &PathBuf) -> Value {
    let bytes = std::fs::read(path).expect("queue file should exist");
    serde_json::from_slice(&bytes).expect("queue file should be JSON")
}
