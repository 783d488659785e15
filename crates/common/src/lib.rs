//! Foundation utilities shared across Linkstash crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: retry/backoff policy and its validation errors
//! - `runtime`: time abstraction (`Clock`, `SystemClock`, `MockClock`)
//! - `observability`: optional tracing (not included by default)
//! - `test-utils`: alias for consumers that only need the testing helpers

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod sync;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use sync::retry::{BackoffError, BackoffPolicy, BackoffResult};
#[cfg(feature = "runtime")]
pub use testing::time::{Clock, MockClock, SharedClock, SystemClock};
