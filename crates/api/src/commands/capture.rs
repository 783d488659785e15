//! Capture a shared link.

use std::fmt;

use linkstash_domain::{PendingSubmission, Result};
use serde::Serialize;
use tracing::{info, instrument};

use super::flush::FlushSummary;
use super::status::EntryLine;
use crate::cli::CaptureArgs;
use crate::context::AppContext;

/// Stored entry after the capture, and the delivery pass if one ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureOutcome {
    pub entry: PendingSubmission,
    pub flush: Option<FlushSummary>,
}

impl fmt::Display for CaptureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", EntryLine(&self.entry))?;
        if let Some(flush) = &self.flush {
            write!(f, "\n{flush}")?;
        }
        Ok(())
    }
}

/// Queue the link, then deliver due entries unless `--no-flush` was given.
///
/// # Errors
///
/// `InvalidInput` for links that are not absolute http(s) URLs, and storage
/// errors. Delivery failures are recorded on the entry instead.
#[instrument(skip(ctx, args), fields(url = %args.url))]
pub async fn capture(ctx: &AppContext, args: &CaptureArgs) -> Result<CaptureOutcome> {
    let entry =
        ctx.capture.capture(&args.url, args.text.as_deref(), args.source_app.as_deref()).await?;
    info!(id = %entry.id, status = %entry.status, "link captured");

    if args.no_flush {
        return Ok(CaptureOutcome { entry, flush: None });
    }

    let flush = super::flush(ctx).await;
    let entry = ctx.store.get(entry.id).await.unwrap_or(entry);
    Ok(CaptureOutcome { entry, flush: Some(flush) })
}
