//! Offline-first delivery of captured links.

pub mod capture_service;
pub mod disposition;
pub mod orchestrator;
pub mod ports;
pub mod queue_store;

#[cfg(test)]
pub(crate) mod test_support;
