//! Linkstash - offline-first link capture client
//!
//! Main entry point for the `linkstash` binary.

use anyhow::{bail, Context};
use clap::Parser;
use linkstash_app::commands::{self, render};
use linkstash_app::{AppContext, Cli, Command};
use linkstash_infra::{config, observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_from_file(Some(path.clone())),
        None => config::load(),
    }
    .context("failed to load configuration")?;

    // Hold the guard so buffered file logs are flushed on exit
    let _logging = observability::init(&config.logging).context("failed to initialize logging")?;
    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(err) => tracing::debug!(error = %err, "no .env loaded"),
    }

    let ctx = AppContext::new(config).await.context("failed to initialize linkstash")?;

    let output = match &cli.command {
        Command::Capture(args) => {
            let outcome = commands::capture(&ctx, args).await?;
            render(&outcome, cli.json)?
        }
        Command::Flush => {
            let summary = commands::flush(&ctx).await;
            let output = render(&summary, cli.json)?;
            if let Some(error) = &summary.error {
                println!("{output}");
                bail!("delivery pass aborted: {error}");
            }
            output
        }
        Command::Status(args) => render(&commands::status(&ctx, args).await, cli.json)?,
        Command::Run => {
            let summary = commands::run(&ctx).await?;
            format!(
                "stopped with {} pending, {} failed, {} completed",
                summary.pending, summary.failed, summary.completed
            )
        }
    };

    println!("{output}");
    Ok(())
}
