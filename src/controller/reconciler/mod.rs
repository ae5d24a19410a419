//! # Reconciler
//!
//! The per-record reconcile cycle shared by realms, clients and users.
//!
//! - `types` - shared context and error type
//! - `lifecycle` - finalizer/deletion state machine
//! - `targets` - selector-based resolution of Keycloak instances and realms
//! - `cycle` - the cycle itself, generic over [`Reconcilable`]
//! - `resources` - `Reconcilable` implementations per custom resource
//! - `status` - status write-back

pub mod cycle;
pub mod lifecycle;
mod resources;
pub mod status;
pub mod targets;
pub mod types;

pub use cycle::{reconcile, Reconcilable};
pub use targets::Target;
pub use types::{Reconciler, ReconcilerError, Result};
