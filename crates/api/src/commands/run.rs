//! Long-running delivery loop.

use std::future::Future;

use linkstash_domain::{QueueSummary, Result};
use tracing::{info, warn};

use crate::context::AppContext;

/// Deliver in the background until Ctrl-C.
///
/// # Errors
///
/// Scheduler errors from starting or stopping the flush driver.
pub async fn run(ctx: &AppContext) -> Result<QueueSummary> {
    run_until(ctx, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl-C, shutting down");
        }
    })
    .await
}

/// Deliver in the background until `shutdown` resolves, then stop the driver
/// and return the final counts.
///
/// # Errors
///
/// Scheduler errors from starting or stopping the flush driver.
pub async fn run_until<F>(ctx: &AppContext, shutdown: F) -> Result<QueueSummary>
where
    F: Future<Output = ()>,
{
    ctx.start_background_flush().await?;
    info!(
        interval_secs = ctx.config.triggers.flush_interval_secs,
        enabled = ctx.config.triggers.enabled,
        "background delivery running"
    );

    shutdown.await;
    info!("shutdown requested");

    ctx.shutdown().await?;
    Ok(ctx.capture.summary().await)
}
