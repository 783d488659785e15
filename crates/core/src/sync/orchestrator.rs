//! Single-flight delivery of due submissions.
//!
//! `flush_now` starts a run on a spawned task and hands every concurrent
//! caller the same shared future, so at most one run touches the transport at
//! a time and a caller that gives up waiting never cancels an attempt.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use linkstash_common::SharedClock;
use linkstash_domain::constants::{DEFAULT_KEEP_TERMINAL, DEFAULT_SYNCING_GRACE_SECS, DEFAULT_TIMEZONE};
use linkstash_domain::{CaptureRequest, Result, SubmissionStatus};
use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::disposition::{classify, Disposition};
use super::ports::{CaptureTransport, FlushScheduler};
use super::queue_store::QueueStore;

/// Tunables for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub keep_terminal: usize,
    pub syncing_grace: Duration,
    /// IANA zone sent with each capture.
    pub timezone: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            keep_terminal: DEFAULT_KEEP_TERMINAL,
            syncing_grace: Duration::from_secs(DEFAULT_SYNCING_GRACE_SECS),
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

/// Summary of one orchestrator run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Entries moved to `syncing` and handed to the transport.
    pub attempted: usize,
    /// Entries that reached a success-family terminal state.
    pub completed: usize,
    /// Entries rescheduled to `retry_wait`.
    pub retried: usize,
    /// Entries that ended `failed`.
    pub failed: usize,
    /// Orphaned `syncing` entries promoted at run start.
    pub recovered: usize,
    /// Terminal entries removed by garbage collection.
    pub collected: usize,
    /// Delay until the next retry becomes due.
    pub next_wake: Option<Duration>,
    /// Entries that were already due when the run ended.
    pub due_remaining: bool,
    /// Set when the run was aborted by a store error.
    pub error: Option<String>,
}

impl FlushReport {
    fn aborted(message: String) -> Self {
        Self { error: Some(message), ..Self::default() }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

type SharedRun = Shared<BoxFuture<'static, FlushReport>>;

struct RunContext {
    store: Arc<QueueStore>,
    transport: Arc<dyn CaptureTransport>,
    scheduler: Arc<dyn FlushScheduler>,
    clock: SharedClock,
    settings: OrchestratorSettings,
}

/// Drains due entries through the transport, one run at a time.
pub struct SyncOrchestrator {
    context: Arc<RunContext>,
    in_flight: Arc<Mutex<Option<SharedRun>>>,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<QueueStore>,
        transport: Arc<dyn CaptureTransport>,
        scheduler: Arc<dyn FlushScheduler>,
        clock: SharedClock,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            context: Arc::new(RunContext { store, transport, scheduler, clock, settings }),
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<QueueStore> {
        &self.context.store
    }

    /// Whether a run is currently in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.in_flight.lock().is_some()
    }

    /// Run a flush, or join the one already in progress.
    ///
    /// Must be called within a tokio runtime.
    pub async fn flush_now(&self) -> FlushReport {
        let run = {
            let mut slot = self.in_flight.lock();
            if let Some(run) = slot.as_ref() {
                debug!("flush already in progress, joining it");
                run.clone()
            } else {
                let run = self.spawn_run();
                *slot = Some(run.clone());
                run
            }
        };
        run.await
    }

    fn spawn_run(&self) -> SharedRun {
        let context = Arc::clone(&self.context);
        let slot = Arc::clone(&self.in_flight);
        let handle = tokio::spawn(async move {
            let report = context.run_once().await;
            // Clear before rescheduling so a wake-up requested below starts a
            // fresh run instead of joining this finished one.
            slot.lock().take();
            context.schedule_followups(&report);
            report
        });

        let in_flight = Arc::clone(&self.in_flight);
        async move {
            match handle.await {
                Ok(report) => report,
                Err(join_error) => {
                    error!(error = %join_error, "flush task failed");
                    in_flight.lock().take();
                    FlushReport::aborted(format!("flush task failed: {join_error}"))
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl RunContext {
    #[instrument(name = "flush_run", skip(self))]
    async fn run_once(&self) -> FlushReport {
        let mut report = FlushReport::default();
        if let Err(err) = self.drain(&mut report).await {
            error!(error = %err, attempted = report.attempted, "flush aborted by store error");
            report.error = Some(err.to_string());
        }
        info!(
            attempted = report.attempted,
            completed = report.completed,
            retried = report.retried,
            failed = report.failed,
            recovered = report.recovered,
            collected = report.collected,
            next_wake_secs = report.next_wake.map(|d| d.as_secs()),
            "flush finished"
        );
        report
    }

    async fn drain(&self, report: &mut FlushReport) -> Result<()> {
        let run_started_at = self.clock.now();
        report.recovered =
            self.store.recover_interrupted(run_started_at, self.settings.syncing_grace).await?;

        while let Some(due) = self.store.next_due_entry(run_started_at).await {
            let Some(entry) = self.store.mark_syncing(due.id).await? else {
                continue;
            };
            report.attempted += 1;

            let request = CaptureRequest::for_submission(&entry, &self.settings.timezone);
            let result = self.transport.submit(&request).await;

            match classify(result) {
                Disposition::Terminal(outcome) => {
                    let success = outcome.status().is_success_family();
                    if self.store.mark_terminal(entry.id, outcome).await?.is_some() {
                        if success {
                            report.completed += 1;
                        } else {
                            report.failed += 1;
                        }
                    }
                }
                Disposition::Retry { message, not_before } => {
                    debug!(id = %entry.id, attempt = entry.attempt_count, %message, "delivery will be retried");
                    if let Some(updated) =
                        self.store.mark_retry(entry.id, &message, not_before).await?
                    {
                        if updated.status == SubmissionStatus::Failed {
                            warn!(id = %entry.id, attempts = updated.attempt_count, "retries exhausted");
                            report.failed += 1;
                        } else {
                            report.retried += 1;
                        }
                    }
                }
            }
        }

        report.collected = self.store.garbage_collect(self.settings.keep_terminal).await?;
        let now = self.clock.now();
        report.due_remaining = self.store.has_due(now).await;
        report.next_wake = self.store.next_wake_delay(now).await;
        Ok(())
    }

    fn schedule_followups(&self, report: &FlushReport) {
        if report.due_remaining {
            self.scheduler.run_as_soon_as_possible();
        }
        if let Some(delay) = report.next_wake {
            self.scheduler.run_after_delay(delay);
        }
    }
}
