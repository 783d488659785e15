//! Submission record and lifecycle states

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_domain_status_conversions;

/// Lifecycle state of a [`PendingSubmission`].
///
/// `Queued`, `Syncing` and `RetryWait` are active; the rest are terminal and
/// never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Queued,
    Syncing,
    RetryWait,
    Saved,
    AlreadyExists,
    NeedsClarification,
    Failed,
}

impl_domain_status_conversions!(SubmissionStatus {
    Queued => "queued",
    Syncing => "syncing",
    RetryWait => "retry_wait",
    Saved => "saved",
    AlreadyExists => "already_exists",
    NeedsClarification => "needs_clarification",
    Failed => "failed",
});

impl SubmissionStatus {
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Syncing | Self::RetryWait)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Statuses the orchestrator may pick up for delivery.
    #[must_use]
    pub const fn is_deliverable(self) -> bool {
        matches!(self, Self::Queued | Self::RetryWait)
    }

    /// Backend accepted the capture in some form.
    #[must_use]
    pub const fn is_success_family(self) -> bool {
        matches!(self, Self::Saved | Self::AlreadyExists | Self::NeedsClarification)
    }
}

/// Backend identifiers recorded on a successful capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_status: Option<String>,
}

/// Final result of a delivery, applied by `mark_terminal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalOutcome {
    Saved(ResultRef),
    AlreadyExists(ResultRef),
    NeedsClarification(ResultRef),
    /// Non-retryable rejection (auth, validation, backend said no).
    Rejected { message: String },
}

impl TerminalOutcome {
    #[must_use]
    pub const fn status(&self) -> SubmissionStatus {
        match self {
            Self::Saved(_) => SubmissionStatus::Saved,
            Self::AlreadyExists(_) => SubmissionStatus::AlreadyExists,
            Self::NeedsClarification(_) => SubmissionStatus::NeedsClarification,
            Self::Rejected { .. } => SubmissionStatus::Failed,
        }
    }
}

/// One capture attempt lineage, persisted in the local queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSubmission {
    pub id: Uuid,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_app: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: SubmissionStatus,
    pub attempt_count: u32,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub can_retry: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_ref: Option<ResultRef>,
}

impl PendingSubmission {
    /// A fresh `queued` entry, due immediately.
    ///
    /// Text fields are trimmed and blank optional fields become `None`.
    #[must_use]
    pub fn new(
        url: &str,
        shared_text: Option<&str>,
        source_app: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            url: url.trim().to_string(),
            shared_text: normalize_optional_text(shared_text),
            source_app: normalize_optional_text(source_app),
            created_at: now,
            updated_at: now,
            status: SubmissionStatus::Queued,
            attempt_count: 0,
            next_attempt_at: Some(now),
            can_retry: true,
            last_error: None,
            result_ref: None,
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Eligible for delivery at `now`. A missing `next_attempt_at` counts as due.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.can_retry
            && self.status.is_deliverable()
            && self.next_attempt_at.map_or(true, |at| at <= now)
    }
}

/// Trim and drop blank optional text.
#[must_use]
pub fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(ToString::to_string)
}

/// Counts shown on the user-visible surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSummary {
    /// `queued` plus `retry_wait` entries that may still be delivered.
    pub pending: usize,
    pub syncing: usize,
    pub retry_wait: usize,
    pub failed: usize,
    /// Success-family terminal entries.
    pub completed: usize,
    pub total: usize,
}

impl QueueSummary {
    /// Tally a collection of submissions.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a PendingSubmission>) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            summary.total += 1;
            match entry.status {
                SubmissionStatus::Queued => summary.pending += usize::from(entry.can_retry),
                SubmissionStatus::RetryWait => {
                    summary.retry_wait += 1;
                    summary.pending += usize::from(entry.can_retry);
                }
                SubmissionStatus::Syncing => summary.syncing += 1,
                SubmissionStatus::Failed => summary.failed += 1,
                SubmissionStatus::Saved
                | SubmissionStatus::AlreadyExists
                | SubmissionStatus::NeedsClarification => summary.completed += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn new_entry_is_queued_and_due() {
        let entry =
            PendingSubmission::new("  https://example.com/a  ", Some("  "), Some(" Safari "), at(0));
        assert_eq!(entry.url, "https://example.com/a");
        assert_eq!(entry.status, SubmissionStatus::Queued);
        assert_eq!(entry.attempt_count, 0);
        assert_eq!(entry.next_attempt_at, Some(at(0)));
        assert!(entry.can_retry);
        assert_eq!(entry.shared_text, None);
        assert_eq!(entry.source_app.as_deref(), Some("Safari"));
        assert!(entry.is_due(at(0)));
    }

    #[test]
    fn due_detection_respects_next_attempt_at() {
        let mut entry = PendingSubmission::new("https://example.com", None, None, at(0));
        entry.status = SubmissionStatus::RetryWait;
        entry.next_attempt_at = Some(at(10));
        assert!(!entry.is_due(at(9)));
        assert!(entry.is_due(at(10)));

        entry.next_attempt_at = None;
        assert!(entry.is_due(at(0)));

        entry.can_retry = false;
        assert!(!entry.is_due(at(100)));
    }

    #[test]
    fn syncing_and_terminal_entries_are_never_due() {
        let mut entry = PendingSubmission::new("https://example.com", None, None, at(0));
        entry.status = SubmissionStatus::Syncing;
        assert!(!entry.is_due(at(100)));
        entry.status = SubmissionStatus::Saved;
        assert!(!entry.is_due(at(100)));
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&SubmissionStatus::NeedsClarification).unwrap();
        assert_eq!(json, "\"needs_clarification\"");
        assert_eq!("retry_wait".parse::<SubmissionStatus>(), Ok(SubmissionStatus::RetryWait));
        assert!(SubmissionStatus::AlreadyExists.is_terminal());
        assert!(SubmissionStatus::Syncing.is_active());
    }

    #[test]
    fn terminal_outcome_maps_to_status() {
        assert_eq!(TerminalOutcome::Saved(ResultRef::default()).status(), SubmissionStatus::Saved);
        assert_eq!(
            TerminalOutcome::Rejected { message: "nope".into() }.status(),
            SubmissionStatus::Failed
        );
    }

    #[test]
    fn summary_counts_by_state() {
        let mut entries = Vec::new();
        for status in [
            SubmissionStatus::Queued,
            SubmissionStatus::RetryWait,
            SubmissionStatus::Syncing,
            SubmissionStatus::Saved,
            SubmissionStatus::AlreadyExists,
            SubmissionStatus::Failed,
        ] {
            let mut entry = PendingSubmission::new("https://example.com", None, None, at(0));
            entry.status = status;
            entries.push(entry);
        }
        let summary = QueueSummary::from_entries(&entries);
        assert_eq!(summary.pending, 2);
        assert_eq!(summary.retry_wait, 1);
        assert_eq!(summary.syncing, 1);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total, 6);
    }
}
