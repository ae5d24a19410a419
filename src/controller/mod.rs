//! # Controller
//!
//! Reconciliation core: data flows down this list once per cycle.
//!
//! - `state` - observed-state readers producing immutable snapshots
//! - `diff` - set reconciliation of identity-bearing entities
//! - `drift` - JSON subset comparison deciding whether an update is needed
//! - `plan` - snapshot + desired record to an ordered list of [`action::Action`]s
//! - `executor` - applies a plan in order, stopping at the first failure
//! - `reconciler` - the per-record cycle with status, events and cleanup finalizer

pub mod action;
pub mod diff;
pub mod drift;
pub mod executor;
pub mod plan;
pub mod reconciler;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;
