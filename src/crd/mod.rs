//! # Custom Resource Definitions
//!
//! CRD types for the Keycloak operator.
//!
//! - `Keycloak` - a Keycloak server instance (the top-level target of every cycle)
//! - `KeycloakRealm` - a realm, bound to instances through `instanceSelector`
//! - `KeycloakClient` - a client with its roles, scope mappings and client scopes
//! - `KeycloakUser` - a user with realm-role mappings and group memberships
//!
//! Realm, client and user resources select their parents with label selectors.
//! A client or user selects realms, and each realm in turn selects instances, so a
//! single resource may be reconciled against several Keycloak servers.

mod client;
mod keycloak;
mod realm;
mod selector;
mod status;
mod user;

pub use client::{KeycloakClient, KeycloakClientSpec, ScopeMappings};
pub use keycloak::{ExternalKeycloak, Keycloak, KeycloakSpec, KeycloakStatus};
pub use realm::{KeycloakRealm, KeycloakRealmSpec};
pub use selector::{Selector, SelectorOperator, SelectorRequirement};
pub use status::{ResourceStatus, StatusPhase};
pub use user::{KeycloakUser, KeycloakUserSpec};

/// API group of every resource managed by the operator
pub const API_GROUP: &str = "keycloak.org";
