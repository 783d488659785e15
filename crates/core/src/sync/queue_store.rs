//! Durable submission queue.
//!
//! `QueueStore` owns the in-memory copy of every submission and is the only
//! writer of the backing [`SubmissionRepository`]. Each mutation builds the
//! next state, persists it, and only then swaps it in, all while holding the
//! store mutex. A failed write therefore leaves memory and disk in agreement.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use linkstash_common::{BackoffPolicy, SharedClock};
use linkstash_domain::constants::{INTERRUPTED_DELIVERY_MESSAGE, MAX_ERROR_MESSAGE_LEN};
use linkstash_domain::{
    dedup_key, normalize_url, LinkstashError, PendingSubmission, QueueSummary, Result,
    SubmissionStatus, TerminalOutcome,
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::ports::SubmissionRepository;

/// Durable keyed collection of submissions with single-writer semantics.
pub struct QueueStore {
    repository: Arc<dyn SubmissionRepository>,
    policy: BackoffPolicy,
    clock: SharedClock,
    entries: Mutex<Vec<PendingSubmission>>,
}

impl std::fmt::Debug for QueueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueStore").field("policy", &self.policy).finish_non_exhaustive()
    }
}

impl QueueStore {
    /// Load persisted submissions and open the store.
    ///
    /// # Errors
    ///
    /// Propagates repository load failures. Malformed records are the
    /// repository's concern and never fail the open.
    pub async fn open(
        repository: Arc<dyn SubmissionRepository>,
        policy: BackoffPolicy,
        clock: SharedClock,
    ) -> Result<Self> {
        let entries = repository.load().await?;
        let summary = QueueSummary::from_entries(&entries);
        info!(
            total = summary.total,
            pending = summary.pending,
            syncing = summary.syncing,
            "submission queue opened"
        );
        Ok(Self { repository, policy, clock, entries: Mutex::new(entries) })
    }

    #[must_use]
    pub const fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Queue a capture, or return the active entry that already covers the
    /// same normalized URL.
    ///
    /// # Errors
    ///
    /// [`LinkstashError::InvalidInput`] when the URL is not an absolute
    /// http(s) link; storage errors from the repository.
    #[instrument(skip(self, shared_text, source_app))]
    pub async fn enqueue_or_merge(
        &self,
        url: &str,
        shared_text: Option<&str>,
        source_app: Option<&str>,
    ) -> Result<PendingSubmission> {
        let Some(key) = normalize_url(url) else {
            return Err(LinkstashError::InvalidInput(format!(
                "not an absolute http(s) url: {:?}",
                url.trim()
            )));
        };

        let mut guard = self.entries.lock().await;
        if let Some(existing) =
            guard.iter().find(|entry| entry.is_active() && dedup_key(&entry.url) == key)
        {
            debug!(id = %existing.id, status = %existing.status, "capture coalesced with active entry");
            return Ok(existing.clone());
        }

        let entry = PendingSubmission::new(url, shared_text, source_app, self.clock.now());
        let mut next = guard.clone();
        next.push(entry.clone());
        self.commit(&mut guard, next).await?;
        info!(id = %entry.id, url = %entry.url, "capture queued");
        Ok(entry)
    }

    /// Most recently updated entries first.
    pub async fn list_recent(&self, limit: usize) -> Vec<PendingSubmission> {
        let guard = self.entries.lock().await;
        let mut entries = guard.clone();
        drop(guard);
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        entries.truncate(limit);
        entries
    }

    /// Earliest due entry: ordered by `next_attempt_at` (missing first), then
    /// `created_at`.
    pub async fn next_due_entry(&self, now: DateTime<Utc>) -> Option<PendingSubmission> {
        let guard = self.entries.lock().await;
        guard
            .iter()
            .filter(|entry| entry.is_due(now))
            .min_by(|a, b| {
                a.next_attempt_at
                    .cmp(&b.next_attempt_at)
                    .then_with(|| a.created_at.cmp(&b.created_at))
            })
            .cloned()
    }

    /// Start an attempt: bump `attempt_count` and move to `syncing`.
    ///
    /// Returns `None` when the entry is gone or no longer active.
    ///
    /// # Errors
    ///
    /// Storage errors from the repository.
    pub async fn mark_syncing(&self, id: Uuid) -> Result<Option<PendingSubmission>> {
        let now = self.clock.now();
        self.update(id, "mark_syncing", |entry| {
            entry.attempt_count = entry.attempt_count.saturating_add(1);
            entry.status = SubmissionStatus::Syncing;
            entry.next_attempt_at = None;
            entry.last_error = None;
            entry.updated_at = now;
        })
        .await
    }

    /// Record a final outcome. The entry is never mutated again.
    ///
    /// # Errors
    ///
    /// Storage errors from the repository.
    pub async fn mark_terminal(
        &self,
        id: Uuid,
        outcome: TerminalOutcome,
    ) -> Result<Option<PendingSubmission>> {
        let now = self.clock.now();
        self.update(id, "mark_terminal", move |entry| {
            entry.status = outcome.status();
            entry.can_retry = false;
            entry.next_attempt_at = None;
            entry.updated_at = now;
            match outcome {
                TerminalOutcome::Saved(result)
                | TerminalOutcome::AlreadyExists(result)
                | TerminalOutcome::NeedsClarification(result) => {
                    entry.result_ref = Some(result);
                    entry.last_error = None;
                }
                TerminalOutcome::Rejected { message } => {
                    entry.last_error = Some(truncate_message(&message));
                }
            }
        })
        .await
    }

    /// Record a retryable failure.
    ///
    /// While the policy allows, the entry waits `max(delay(attempt_count),
    /// not_before)`; once exhausted it becomes `failed` for good. A
    /// `not_before` longer than the policy cap is clamped to the cap.
    ///
    /// # Errors
    ///
    /// Storage errors from the repository.
    pub async fn mark_retry(
        &self,
        id: Uuid,
        message: &str,
        not_before: Option<Duration>,
    ) -> Result<Option<PendingSubmission>> {
        let now = self.clock.now();
        let policy = self.policy;
        let message = truncate_message(message);
        self.update(id, "mark_retry", move |entry| {
            entry.updated_at = now;
            entry.last_error = Some(message);
            match policy.next_delay(entry.attempt_count) {
                Some(delay) => {
                    let delay = not_before.map_or(delay, |floor| delay.max(floor.min(policy.cap())));
                    entry.status = SubmissionStatus::RetryWait;
                    entry.next_attempt_at = Some(offset(now, delay));
                    entry.can_retry = true;
                }
                None => {
                    entry.status = SubmissionStatus::Failed;
                    entry.next_attempt_at = None;
                    entry.can_retry = false;
                }
            }
        })
        .await
    }

    /// Time until the earliest `retry_wait` entry becomes due.
    pub async fn next_wake_delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        let guard = self.entries.lock().await;
        guard
            .iter()
            .filter(|e| e.status == SubmissionStatus::RetryWait && e.can_retry)
            .map(|e| e.next_attempt_at.map_or(Duration::ZERO, |at| until(now, at)))
            .min()
    }

    /// Keep every active entry and the `keep_terminal` most recently updated
    /// terminal ones. Returns how many entries were deleted.
    ///
    /// # Errors
    ///
    /// Storage errors from the repository.
    pub async fn garbage_collect(&self, keep_terminal: usize) -> Result<usize> {
        let mut guard = self.entries.lock().await;
        let mut terminal: Vec<(DateTime<Utc>, Uuid)> =
            guard.iter().filter(|e| e.is_terminal()).map(|e| (e.updated_at, e.id)).collect();
        if terminal.len() <= keep_terminal {
            return Ok(0);
        }
        terminal.sort_by(|a, b| b.cmp(a));
        let evicted: std::collections::HashSet<Uuid> =
            terminal.into_iter().skip(keep_terminal).map(|(_, id)| id).collect();

        let next: Vec<PendingSubmission> =
            guard.iter().filter(|e| !evicted.contains(&e.id)).cloned().collect();
        self.commit(&mut guard, next).await?;
        debug!(removed = evicted.len(), keep_terminal, "garbage collected terminal entries");
        Ok(evicted.len())
    }

    /// Promote entries left in `syncing` by a crash back to `retry_wait`.
    ///
    /// Only call this when no delivery is in flight. The entry becomes due at
    /// `max(now, updated_at + grace)`, or `failed` if the policy is
    /// exhausted. Returns the number of entries promoted.
    ///
    /// # Errors
    ///
    /// Storage errors from the repository.
    pub async fn recover_interrupted(&self, now: DateTime<Utc>, grace: Duration) -> Result<usize> {
        let mut guard = self.entries.lock().await;
        if !guard.iter().any(|e| e.status == SubmissionStatus::Syncing) {
            return Ok(0);
        }

        let mut next = guard.clone();
        let mut promoted = 0;
        for entry in next.iter_mut().filter(|e| e.status == SubmissionStatus::Syncing) {
            promoted += 1;
            entry.last_error = Some(INTERRUPTED_DELIVERY_MESSAGE.to_string());
            if self.policy.is_exhausted(entry.attempt_count) {
                entry.status = SubmissionStatus::Failed;
                entry.can_retry = false;
                entry.next_attempt_at = None;
            } else {
                entry.status = SubmissionStatus::RetryWait;
                entry.can_retry = true;
                entry.next_attempt_at = Some(offset(entry.updated_at, grace).max(now));
            }
            warn!(
                id = %entry.id,
                attempt_count = entry.attempt_count,
                status = %entry.status,
                "recovered interrupted delivery"
            );
            entry.updated_at = now;
        }
        self.commit(&mut guard, next).await?;
        Ok(promoted)
    }

    /// Whether any entry is deliverable at `now`.
    pub async fn has_due(&self, now: DateTime<Utc>) -> bool {
        self.entries.lock().await.iter().any(|e| e.is_due(now))
    }

    pub async fn get(&self, id: Uuid) -> Option<PendingSubmission> {
        self.entries.lock().await.iter().find(|e| e.id == id).cloned()
    }

    pub async fn summary(&self) -> QueueSummary {
        QueueSummary::from_entries(self.entries.lock().await.iter())
    }

    /// Copy of every entry, in storage order.
    pub async fn snapshot(&self) -> Vec<PendingSubmission> {
        self.entries.lock().await.clone()
    }

    /// Apply `mutate` to an active entry and persist the result.
    async fn update<F>(&self, id: Uuid, operation: &str, mutate: F) -> Result<Option<PendingSubmission>>
    where
        F: FnOnce(&mut PendingSubmission),
    {
        let mut guard = self.entries.lock().await;
        let Some(index) = guard.iter().position(|e| e.id == id) else {
            debug!(%id, operation, "entry no longer exists");
            return Ok(None);
        };
        if guard[index].is_terminal() {
            warn!(%id, operation, status = %guard[index].status, "refusing to modify terminal entry");
            return Ok(None);
        }

        let mut next = guard.clone();
        mutate(&mut next[index]);
        let updated = next[index].clone();
        self.commit(&mut guard, next).await?;
        debug!(%id, operation, status = %updated.status, attempt_count = updated.attempt_count, "entry updated");
        Ok(Some(updated))
    }

    /// Persist `next` and make it the current state.
    async fn commit(
        &self,
        guard: &mut MutexGuard<'_, Vec<PendingSubmission>>,
        next: Vec<PendingSubmission>,
    ) -> Result<()> {
        self.repository.save(&next).await?;
        **guard = next;
        Ok(())
    }
}

fn offset(at: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn until(now: DateTime<Utc>, at: DateTime<Utc>) -> Duration {
    (at - now).to_std().unwrap_or(Duration::ZERO)
}

fn truncate_message(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return trimmed.to_string();
    }
    let mut truncated: String = trimmed.chars().take(MAX_ERROR_MESSAGE_LEN - 3).collect();
    truncated.push_str("...");
    truncated
}
