//! # Linkstash Domain
//!
//! Business domain types and models for Linkstash.
//!
//! This crate contains:
//! - The submission record and its lifecycle states
//! - Wire contracts for the remote capture RPC
//! - Domain error types and Result definitions
//! - Configuration structures
//! - URL normalization used for deduplication
//!
//! ## Architecture
//! - No dependencies on other Linkstash crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::url::{dedup_key, normalize_url};
