//! # Observed State
//!
//! Immutable per-cycle snapshots of what currently exists in Keycloak and in the
//! cluster for one desired record and one target realm.
//!
//! Readers issue single best-effort calls and never retry; retry belongs to the
//! reconcile cycle. They have no side effects.

pub mod client;
pub mod realm;
pub mod user;

pub use client::{ClientMappingState, ClientState};
pub use realm::RealmState;
pub use user::UserState;
