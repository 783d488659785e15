//! Submission repositories.
//!
//! - `JsonFileRepository`: the durable queue document on local disk
//! - `InMemoryRepository`: process-lifetime storage for ephemeral runs

pub mod json_store;
pub mod memory;

pub use json_store::JsonFileRepository;
pub use memory::InMemoryRepository;

/// Path value that selects the in-memory repository instead of a file.
pub const IN_MEMORY_PATH: &str = ":memory:";
