//! One delivery pass.

use std::fmt;

use linkstash_core::FlushReport;
use serde::Serialize;
use tracing::instrument;

use crate::context::AppContext;

/// Outcome of a delivery pass as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushSummary {
    pub attempted: usize,
    pub completed: usize,
    pub retried: usize,
    pub failed: usize,
    pub recovered: usize,
    pub collected: usize,
    pub next_wake_secs: Option<u64>,
    pub due_remaining: bool,
    pub error: Option<String>,
}

impl From<&FlushReport> for FlushSummary {
    fn from(report: &FlushReport) -> Self {
        Self {
            attempted: report.attempted,
            completed: report.completed,
            retried: report.retried,
            failed: report.failed,
            recovered: report.recovered,
            collected: report.collected,
            next_wake_secs: report.next_wake.map(|delay| delay.as_secs()),
            due_remaining: report.due_remaining,
            error: report.error.clone(),
        }
    }
}

impl FlushSummary {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for FlushSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempted {}, completed {}, retried {}, failed {}",
            self.attempted, self.completed, self.retried, self.failed
        )?;
        if self.recovered > 0 {
            write!(f, ", recovered {}", self.recovered)?;
        }
        if let Some(secs) = self.next_wake_secs {
            write!(f, "\nnext retry in {secs}s")?;
        }
        if let Some(error) = &self.error {
            write!(f, "\nerror: {error}")?;
        }
        Ok(())
    }
}

/// Deliver everything that is due, joining a run already in progress.
#[instrument(skip(ctx))]
pub async fn flush(ctx: &AppContext) -> FlushSummary {
    let report = ctx.orchestrator.flush_now().await;
    FlushSummary::from(&report)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn summary_copies_report() {
        let report = FlushReport {
            attempted: 3,
            completed: 1,
            retried: 1,
            failed: 1,
            next_wake: Some(Duration::from_millis(10_500)),
            ..FlushReport::default()
        };

        let summary = FlushSummary::from(&report);

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.next_wake_secs, Some(10));
        assert!(summary.is_success());
        assert_eq!(
            summary.to_string(),
            "attempted 3, completed 1, retried 1, failed 1\nnext retry in 10s"
        );
    }

    #[test]
    fn aborted_run_shows_error() {
        let summary =
            FlushSummary { error: Some("storage error: disk full".into()), ..Default::default() };

        assert!(!summary.is_success());
        assert!(summary.to_string().ends_with("error: storage error: disk full"));
    }
}
