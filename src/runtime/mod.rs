//! # Runtime Module
//!
//! Runtime components of the Keycloak operator: initialization, the watch loop
//! driving the reconcilers, and the error policy deciding when to retry.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use error_policy::*;
pub use initialization::*;
pub use watch_loop::*;
