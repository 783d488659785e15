//! Infrastructure error conversions.

pub mod conversions;

pub use conversions::{transport_error_from_reqwest, InfraError};
