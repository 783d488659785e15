//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Offline-first link capture client.
#[derive(Debug, Parser)]
#[command(name = "linkstash", version, about)]
pub struct Cli {
    /// Read configuration from this file instead of the environment.
    #[arg(long, short = 'c', global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Queue a shared link and try to deliver it.
    Capture(CaptureArgs),
    /// Run one delivery pass over everything that is due.
    Flush,
    /// Show queue counts and the most recent entries.
    Status(StatusArgs),
    /// Keep delivering in the background until interrupted.
    Run,
}

#[derive(Debug, Args)]
pub struct CaptureArgs {
    /// The shared link.
    pub url: String,

    /// Text shared alongside the link.
    #[arg(long)]
    pub text: Option<String>,

    /// Application the link was shared from.
    #[arg(long)]
    pub source_app: Option<String>,

    /// Only queue the link; leave delivery to a later flush.
    #[arg(long)]
    pub no_flush: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// How many recent entries to list.
    #[arg(long, short = 'n', default_value_t = 10)]
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_capture_with_options() {
        let cli = Cli::try_parse_from([
            "linkstash",
            "capture",
            "https://example.com/a",
            "--text",
            "read later",
            "--source-app",
            "Firefox",
            "--no-flush",
        ])
        .unwrap();

        let Command::Capture(args) = cli.command else { panic!("expected capture") };
        assert_eq!(args.url, "https://example.com/a");
        assert_eq!(args.text.as_deref(), Some("read later"));
        assert_eq!(args.source_app.as_deref(), Some("Firefox"));
        assert!(args.no_flush);
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli =
            Cli::try_parse_from(["linkstash", "status", "--limit", "3", "--json", "-c", "ls.toml"])
                .unwrap();

        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("ls.toml")));
        let Command::Status(args) = cli.command else { panic!("expected status") };
        assert_eq!(args.limit, 3);
    }

    #[test]
    fn capture_requires_url() {
        assert!(Cli::try_parse_from(["linkstash", "capture"]).is_err());
    }

    #[test]
    fn status_limit_defaults() {
        let cli = Cli::try_parse_from(["linkstash", "status"]).unwrap();
        let Command::Status(args) = cli.command else { panic!("expected status") };
        assert_eq!(args.limit, 10);
    }
}
