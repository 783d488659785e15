//! Flush scheduling
//!
//! The `FlushDriver` turns lifecycle triggers, a periodic timer and the
//! orchestrator's own follow-up requests into `flush_now` calls. It follows
//! the runtime rules used across the infra crate:
//! - Explicit lifecycle management (start/stop)
//! - Join handle for the spawned task, awaited with a timeout
//! - Cancellation token support

pub mod error;
pub mod flush_driver;

pub use error::{SchedulerError, SchedulerResult};
pub use flush_driver::{DriverInbox, FlushDriver, FlushDriverConfig, FlushHandle, TriggerSource};
