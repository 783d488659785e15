//! Observability infrastructure
//!
//! Structured logging through `tracing`. Initialization lives here so the
//! binary and integration tests configure it the same way.

pub mod logging;

pub use logging::{init, init_test, LoggingGuard};
