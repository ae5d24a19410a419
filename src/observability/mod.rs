//! # Observability
//!
//! Prometheus metrics and the HTTP server exposing them with the health probes.

pub mod metrics;
pub mod server;
