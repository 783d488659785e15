//! Remote delivery adapters.
//!
//! - `HttpCaptureTransport`: the capture RPC over HTTPS, implementing
//!   `linkstash_core::CaptureTransport`

pub mod capture_client;

pub use capture_client::{CaptureClientConfig, HttpCaptureTransport};
