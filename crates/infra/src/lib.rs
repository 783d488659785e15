//! # Linkstash Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - JSON-file and in-memory submission repositories
//! - The HTTP capture transport (reqwest)
//! - The tokio flush driver behind the `FlushScheduler` port
//! - Configuration loading and logging initialization
//!
//! ## Architecture
//! - Implements traits defined in `linkstash-core`
//! - Depends on `linkstash-common`, `linkstash-domain` and `linkstash-core`
//! - Contains all "impure" code (filesystem, network, timers)

pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod scheduling;
pub mod storage;
pub mod sync;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use scheduling::{FlushDriver, FlushDriverConfig, FlushHandle, SchedulerError, TriggerSource};
pub use storage::{InMemoryRepository, JsonFileRepository};
pub use sync::{CaptureClientConfig, HttpCaptureTransport};
