//! Application context - dependency injection container

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use linkstash_common::{SharedClock, SystemClock};
use linkstash_core::{
    CaptureService, CaptureTransport, FlushScheduler, OrchestratorSettings, QueueStore,
    SubmissionRepository, SyncOrchestrator,
};
use linkstash_domain::{Config, Result};
use linkstash_infra::config::backoff_policy;
use linkstash_infra::storage::IN_MEMORY_PATH;
use linkstash_infra::{
    CaptureClientConfig, FlushDriver, FlushDriverConfig, FlushHandle, HttpCaptureTransport,
    InMemoryRepository, JsonFileRepository,
};
use tokio::sync::Mutex;
use tracing::info;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub clock: SharedClock,
    pub store: Arc<QueueStore>,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub capture: Arc<CaptureService>,

    // Background delivery; only started by long-running commands
    handle: FlushHandle,
    driver: Mutex<FlushDriver>,
}

impl AppContext {
    /// Build the context on the system clock with the HTTP transport.
    ///
    /// # Errors
    ///
    /// `Config` errors for an unusable endpoint or backoff settings, and
    /// storage errors from opening the queue, including a queue file already
    /// held by another process.
    pub async fn new(config: Config) -> Result<Self> {
        let clock = SystemClock::shared();
        let transport = HttpCaptureTransport::with_config(CaptureClientConfig::from(
            &config.transport,
        ))?
        .with_clock(clock.clone());
        info!(endpoint = %transport.endpoint(), "capture transport ready");
        Self::with_parts(config, clock, Arc::new(transport)).await
    }

    /// Build the context from explicit clock and transport.
    ///
    /// # Errors
    ///
    /// Same as [`AppContext::new`], minus transport construction.
    pub async fn with_parts(
        config: Config,
        clock: SharedClock,
        transport: Arc<dyn CaptureTransport>,
    ) -> Result<Self> {
        let policy = backoff_policy(&config.backoff)?;
        let repository = open_repository(&config.queue.path, clock.clone())?;
        let store = Arc::new(QueueStore::open(repository, policy, clock.clone()).await?);

        let (handle, inbox) = FlushDriver::channel();
        let scheduler: Arc<dyn FlushScheduler> = Arc::new(handle.clone());

        let settings = OrchestratorSettings {
            keep_terminal: config.queue.keep_terminal,
            syncing_grace: Duration::from_secs(config.queue.syncing_grace_secs),
            timezone: config.transport.timezone.clone(),
        };
        let orchestrator = Arc::new(SyncOrchestrator::new(
            store.clone(),
            transport,
            scheduler.clone(),
            clock.clone(),
            settings,
        ));
        let capture = Arc::new(CaptureService::new(store.clone(), scheduler));
        let driver = FlushDriver::new(
            orchestrator.clone(),
            handle.clone(),
            inbox,
            FlushDriverConfig::from(&config.triggers),
        );

        Ok(Self {
            config,
            clock,
            store,
            orchestrator,
            capture,
            handle,
            driver: Mutex::new(driver),
        })
    }

    /// Handle for sending lifecycle triggers to the flush driver.
    pub fn flush_handle(&self) -> FlushHandle {
        self.handle.clone()
    }

    /// Start background delivery. Queues a startup flush unless triggers are
    /// disabled in the configuration.
    ///
    /// # Errors
    ///
    /// Scheduler errors when the driver is already running or cannot be
    /// restarted.
    pub async fn start_background_flush(&self) -> Result<()> {
        self.driver.lock().await.start()?;
        Ok(())
    }

    /// Whether the flush driver task is running.
    pub async fn is_flushing_in_background(&self) -> bool {
        self.driver.lock().await.is_running()
    }

    /// Stop background delivery, waiting for an in-flight run to finish.
    ///
    /// A context whose driver never started shuts down as a no-op.
    ///
    /// # Errors
    ///
    /// Scheduler errors when the driver task does not finish in time.
    pub async fn shutdown(&self) -> Result<()> {
        let mut driver = self.driver.lock().await;
        if driver.is_running() {
            driver.stop().await?;
            info!("background delivery stopped");
        }
        Ok(())
    }
}

fn open_repository(path: &Path, clock: SharedClock) -> Result<Arc<dyn SubmissionRepository>> {
    if path == Path::new(IN_MEMORY_PATH) {
        info!("using in-memory submission queue");
        return Ok(Arc::new(InMemoryRepository::new()));
    }
    info!(path = %path.display(), "using file-backed submission queue");
    Ok(Arc::new(JsonFileRepository::open(path, clock)?))
}
