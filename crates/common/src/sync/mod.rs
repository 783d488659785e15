//! Synchronization primitives for reliable delivery
//!
//! ## Submodules
//!
//! - **`retry`**: exponential backoff policy used to reschedule failed
//!   deliveries and to decide when a submission has exhausted its attempts

pub mod retry;

pub use retry::{BackoffError, BackoffPolicy, BackoffResult};
