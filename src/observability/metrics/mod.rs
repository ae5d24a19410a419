//! # Metrics Module
//!
//! Prometheus metrics for monitoring the operator, organized by responsibility.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup and registration
//! - `controller_metrics` - Reconcile cycle metrics (reconciliations, durations, requeues)
//! - `action_metrics` - Executed and failed actions by kind

pub mod action_metrics;
pub mod controller_metrics;
pub mod registry;

pub use action_metrics::*;
pub use controller_metrics::*;
pub use registry::*;
