//! Background driver that turns triggers into orchestrator runs.
//!
//! Triggers arrive over one unbounded channel: lifecycle events sent through
//! [`FlushHandle::trigger`], and the orchestrator's own follow-up requests
//! through the [`FlushScheduler`] impl on the same handle. The driver task
//! additionally ticks a periodic timer and keeps at most one delayed wake-up,
//! where the most recent `run_after_delay` wins.
//!
//! Stopping never interrupts a delivery: cancellation is only observed
//! between runs, and `stop` waits up to the join timeout for the current run
//! to finish.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use linkstash_core::SyncOrchestrator;
//! use linkstash_infra::scheduling::{FlushDriver, FlushDriverConfig, TriggerSource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (handle, inbox) = FlushDriver::channel();
//! // ... build the orchestrator with `Arc::new(handle.clone())` as scheduler ...
//! # let orchestrator: Arc<SyncOrchestrator> = todo!();
//! let mut driver = FlushDriver::new(orchestrator, handle.clone(), inbox, FlushDriverConfig::default());
//!
//! driver.start()?;
//! handle.trigger(TriggerSource::Foreground);
//! // ... application runs ...
//! driver.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use linkstash_core::{FlushScheduler, SyncOrchestrator};
use linkstash_domain::constants::DEFAULT_FLUSH_INTERVAL_SECS;
use linkstash_domain::impl_domain_status_conversions;
use linkstash_domain::TriggerConfig;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};

/// Why a flush was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerSource {
    /// Process start.
    Startup,
    /// App became active.
    Foreground,
    /// Periodic timer tick.
    Timer,
    /// User asked for a retry.
    Manual,
    /// Network became reachable again.
    Connectivity,
    /// Follow-up requested by the orchestrator or a capture.
    Scheduled,
}

impl_domain_status_conversions!(TriggerSource {
    Startup => "startup",
    Foreground => "foreground",
    Timer => "timer",
    Manual => "manual",
    Connectivity => "connectivity",
    Scheduled => "scheduled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverCommand {
    Trigger(TriggerSource),
    RunAfter(Duration),
}

/// Cloneable sender side of the driver channel.
///
/// Doubles as the orchestrator's [`FlushScheduler`]. Commands sent while no
/// driver is running are buffered until the next `start`.
#[derive(Debug, Clone)]
pub struct FlushHandle {
    tx: mpsc::UnboundedSender<DriverCommand>,
}

impl FlushHandle {
    /// Request a flush on behalf of `source`.
    pub fn trigger(&self, source: TriggerSource) {
        self.send(DriverCommand::Trigger(source));
    }

    fn send(&self, command: DriverCommand) {
        if self.tx.send(command).is_err() {
            debug!(?command, "flush driver is gone, dropping command");
        }
    }
}

impl FlushScheduler for FlushHandle {
    fn run_as_soon_as_possible(&self) {
        self.send(DriverCommand::Trigger(TriggerSource::Scheduled));
    }

    fn run_after_delay(&self, delay: Duration) {
        self.send(DriverCommand::RunAfter(delay));
    }
}

/// Receiver side of the driver channel, owned by the driver task while it
/// runs.
#[derive(Debug)]
pub struct DriverInbox {
    rx: mpsc::UnboundedReceiver<DriverCommand>,
}

/// Configuration for the flush driver.
#[derive(Debug, Clone)]
pub struct FlushDriverConfig {
    /// Periodic flush interval; `None` disables the timer.
    pub periodic_interval: Option<Duration>,
    /// Queue a `Startup` trigger on every `start`.
    pub flush_on_start: bool,
    /// How long `stop` waits for the task (and any in-flight run).
    pub join_timeout: Duration,
}

impl Default for FlushDriverConfig {
    fn default() -> Self {
        Self {
            periodic_interval: Some(Duration::from_secs(DEFAULT_FLUSH_INTERVAL_SECS)),
            flush_on_start: true,
            join_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&TriggerConfig> for FlushDriverConfig {
    fn from(config: &TriggerConfig) -> Self {
        let periodic_interval = (config.enabled && config.flush_interval_secs > 0)
            .then(|| Duration::from_secs(config.flush_interval_secs));
        Self { periodic_interval, flush_on_start: config.enabled, ..Self::default() }
    }
}

/// Flush driver with explicit lifecycle management.
pub struct FlushDriver {
    orchestrator: Arc<SyncOrchestrator>,
    handle: FlushHandle,
    inbox: Option<DriverInbox>,
    config: FlushDriverConfig,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<DriverInbox>>,
}

impl FlushDriver {
    /// Create the channel shared by the driver, the orchestrator and trigger
    /// sources.
    pub fn channel() -> (FlushHandle, DriverInbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (FlushHandle { tx }, DriverInbox { rx })
    }

    pub fn new(
        orchestrator: Arc<SyncOrchestrator>,
        handle: FlushHandle,
        inbox: DriverInbox,
        config: FlushDriverConfig,
    ) -> Self {
        Self {
            orchestrator,
            handle,
            inbox: Some(inbox),
            config,
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// A handle for trigger sources.
    pub fn handle(&self) -> FlushHandle {
        self.handle.clone()
    }

    /// Start the driver, spawning the background task.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::AlreadyRunning`] when started twice, and
    /// [`SchedulerError::StartFailed`] when a previous stop timed out and the
    /// channel was not returned.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }
        let inbox = self.inbox.take().ok_or_else(|| {
            SchedulerError::StartFailed("command channel still held by a detached task".into())
        })?;

        info!(
            periodic_secs = self.config.periodic_interval.map(|d| d.as_secs()),
            "Starting flush driver"
        );

        // Create fresh cancellation token
        self.cancellation = CancellationToken::new();

        if self.config.flush_on_start {
            self.handle.trigger(TriggerSource::Startup);
        }

        let orchestrator = Arc::clone(&self.orchestrator);
        let periodic_interval = self.config.periodic_interval;
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            Self::process_loop(orchestrator, inbox, periodic_interval, cancel).await
        });

        self.task_handle = Some(handle);
        info!("Flush driver started");
        Ok(())
    }

    /// Stop the driver and wait for the background task to finish.
    ///
    /// A run in progress is allowed to complete first.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotRunning`], [`SchedulerError::Timeout`] when the
    /// task outlives the join timeout (it keeps running detached), and
    /// [`SchedulerError::TaskJoinFailed`] if it panicked.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let Some(handle) = self.task_handle.take() else {
            return Err(SchedulerError::NotRunning);
        };

        info!("Stopping flush driver");
        self.cancellation.cancel();

        let join_timeout = self.config.join_timeout;
        match tokio::time::timeout(join_timeout, handle).await {
            Ok(Ok(inbox)) => {
                self.inbox = Some(inbox);
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Flush driver task panicked");
                return Err(SchedulerError::TaskJoinFailed(e.to_string()));
            }
            Err(_) => {
                warn!(?join_timeout, "Flush driver task did not complete within timeout");
                return Err(SchedulerError::Timeout(join_timeout));
            }
        }

        info!("Flush driver stopped");
        Ok(())
    }

    /// Returns true when the background task is active.
    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    async fn process_loop(
        orchestrator: Arc<SyncOrchestrator>,
        mut inbox: DriverInbox,
        periodic_interval: Option<Duration>,
        cancel: CancellationToken,
    ) -> DriverInbox {
        let mut ticker = periodic_interval.map(|period| {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        let mut deadline: Option<Instant> = None;

        loop {
            let source = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Flush driver loop cancelled");
                    break;
                }
                command = inbox.rx.recv() => match command {
                    Some(DriverCommand::Trigger(source)) => source,
                    Some(DriverCommand::RunAfter(delay)) => {
                        deadline = Some(Instant::now() + delay);
                        debug!(delay_secs = delay.as_secs(), "delayed flush scheduled");
                        continue;
                    }
                    None => {
                        debug!("All flush handles dropped");
                        break;
                    }
                },
                () = sleep_until(deadline) => {
                    deadline = None;
                    TriggerSource::Scheduled
                }
                () = next_tick(&mut ticker) => TriggerSource::Timer,
            };

            // Everything already queued is covered by the run about to start.
            let mut coalesced = 0_usize;
            while let Ok(command) = inbox.rx.try_recv() {
                match command {
                    DriverCommand::Trigger(_) => coalesced += 1,
                    DriverCommand::RunAfter(delay) => deadline = Some(Instant::now() + delay),
                }
            }

            debug!(%source, coalesced, "flush triggered");
            let report = orchestrator.flush_now().await;
            if let Some(err) = &report.error {
                error!(%source, error = %err, "triggered flush failed");
            }
        }

        inbox
    }
}

impl Drop for FlushDriver {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
