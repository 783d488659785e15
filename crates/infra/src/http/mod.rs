//! HTTP plumbing shared by remote adapters.

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
