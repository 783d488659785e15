//! # Linkstash App
//!
//! Command-line layer: argument parsing, the dependency-injection context and
//! the commands behind the `linkstash` binary.
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Wires the concrete adapters into the core services
//! - Commands return plain values; the binary renders them

pub mod cli;
pub mod commands;
pub mod context;

pub use cli::{Cli, Command};
pub use context::AppContext;
