//! Queue status surface.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use linkstash_domain::{PendingSubmission, QueueSummary};
use serde::Serialize;

use crate::cli::StatusArgs;
use crate::context::AppContext;

/// Counts plus the most recent entries, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub summary: QueueSummary,
    pub next_wake_secs: Option<u64>,
    pub entries: Vec<PendingSubmission>,
}

impl fmt::Display for StatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        write!(
            f,
            "pending {}, syncing {}, retry_wait {}, failed {}, completed {}, total {}",
            s.pending, s.syncing, s.retry_wait, s.failed, s.completed, s.total
        )?;
        if let Some(secs) = self.next_wake_secs {
            write!(f, "\nnext retry in {secs}s")?;
        }
        for entry in &self.entries {
            write!(f, "\n{}", EntryLine(entry))?;
        }
        Ok(())
    }
}

/// One-line rendering of a queue entry.
pub(crate) struct EntryLine<'a>(pub &'a PendingSubmission);

impl fmt::Display for EntryLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry = self.0;
        write!(
            f,
            "{}  {:<19} attempts={}  {}",
            entry.id,
            entry.status.as_str(),
            entry.attempt_count,
            entry.url
        )?;
        if entry.status.is_deliverable() {
            if let Some(at) = entry.next_attempt_at {
                write!(f, "  next={}", timestamp(at))?;
            }
        }
        if let Some(title) = entry.result_ref.as_ref().and_then(|r| r.title.as_deref()) {
            write!(f, "  title={title:?}")?;
        }
        if let Some(error) = &entry.last_error {
            write!(f, "  error={error:?}")?;
        }
        Ok(())
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub async fn status(ctx: &AppContext, args: &StatusArgs) -> StatusView {
    let now = ctx.clock.now();
    StatusView {
        summary: ctx.capture.summary().await,
        next_wake_secs: ctx.store.next_wake_delay(now).await.map(|delay| delay.as_secs()),
        entries: ctx.capture.recent(args.limit).await,
    }
}
