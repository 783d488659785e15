//! # Linkstash Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for persistence, transport and scheduling
//! - The durable submission queue and its state transitions
//! - The single-flight delivery orchestrator
//! - The capture service used by clients
//!
//! ## Architecture Principles
//! - Only depends on `linkstash-common` and `linkstash-domain`
//! - No filesystem, HTTP, or platform code
//! - All external dependencies via traits

pub mod sync;

pub use sync::capture_service::CaptureService;
pub use sync::disposition::{classify, Disposition};
pub use sync::orchestrator::{FlushReport, OrchestratorSettings, SyncOrchestrator};
pub use sync::ports::{CaptureTransport, FlushScheduler, SubmissionRepository};
pub use sync::queue_store::QueueStore;
