// Retry module: deterministic exponential backoff with an attempt ceiling

pub mod constants;
pub mod error;
pub mod policy;

pub use error::{BackoffError, BackoffResult};
pub use policy::BackoffPolicy;
