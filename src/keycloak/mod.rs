//! # Keycloak Admin API
//!
//! The remote backend of the operator.
//!
//! - `types` - JSON representations shared with the custom resources
//! - `error` - typed admin API failures
//! - `rest` - `reqwest` implementation of [`KeycloakAdmin`] with password-grant authentication
//!
//! Planning and execution only ever see the [`KeycloakAdmin`] trait, so cycles can
//! be exercised against an in-memory implementation.

pub mod error;
pub mod rest;
pub mod types;

pub use error::KeycloakError;
pub use rest::{AdminCredentials, KeycloakRestClient, RestConnector};
pub use types::*;

use crate::crd::Keycloak;
use async_trait::async_trait;
use std::sync::Arc;

pub type Result<T, E = KeycloakError> = std::result::Result<T, E>;

/// Which client-scope list of a client an assignment belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientScopeKind {
    Default,
    Optional,
}

impl ClientScopeKind {
    /// Path segment used by the admin API
    pub fn path(self) -> &'static str {
        match self {
            Self::Default => "default-client-scopes",
            Self::Optional => "optional-client-scopes",
        }
    }
}

/// Where the roles of a scope mapping come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeMappingSource {
    /// Realm roles
    Realm,
    /// Roles of another client, addressed by its internal id
    Client(String),
}

/// Keycloak admin operations used by the operator
///
/// Entities are looked up by natural key (realm name, client ID, username).
/// Deletes are idempotent: deleting an entity that does not exist succeeds.
#[async_trait]
pub trait KeycloakAdmin: Send + Sync {
    /// Pre-flight liveness check
    async fn ping(&self) -> Result<()>;

    async fn get_realm(&self, realm: &str) -> Result<Option<RealmRepresentation>>;
    async fn create_realm(&self, realm: &RealmRepresentation) -> Result<()>;
    async fn update_realm(&self, realm: &RealmRepresentation) -> Result<()>;
    async fn delete_realm(&self, realm: &str) -> Result<()>;

    async fn list_realm_roles(&self, realm: &str) -> Result<Vec<RoleRepresentation>>;

    async fn get_client(&self, realm: &str, client_id: &str)
        -> Result<Option<ClientRepresentation>>;
    async fn create_client(&self, realm: &str, client: &ClientRepresentation) -> Result<()>;
    async fn update_client(&self, realm: &str, client: &ClientRepresentation) -> Result<()>;
    async fn delete_client(&self, realm: &str, client_id: &str) -> Result<()>;
    /// Current secret of a confidential client
    async fn get_client_secret(&self, realm: &str, client_uuid: &str) -> Result<Option<String>>;

    async fn list_client_roles(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> Result<Vec<RoleRepresentation>>;
    async fn create_client_role(
        &self,
        realm: &str,
        client_uuid: &str,
        role: &RoleRepresentation,
    ) -> Result<()>;
    /// Replace a role; addressed by `role.id` when set, otherwise by `current_name`
    async fn update_client_role(
        &self,
        realm: &str,
        client_uuid: &str,
        current_name: &str,
        role: &RoleRepresentation,
    ) -> Result<()>;
    async fn delete_client_role(&self, realm: &str, client_uuid: &str, name: &str) -> Result<()>;

    async fn list_scope_mappings(
        &self,
        realm: &str,
        client_uuid: &str,
        source: &ScopeMappingSource,
    ) -> Result<Vec<RoleRepresentation>>;
    async fn add_scope_mappings(
        &self,
        realm: &str,
        client_uuid: &str,
        source: &ScopeMappingSource,
        roles: &[RoleRepresentation],
    ) -> Result<()>;
    async fn remove_scope_mappings(
        &self,
        realm: &str,
        client_uuid: &str,
        source: &ScopeMappingSource,
        roles: &[RoleRepresentation],
    ) -> Result<()>;

    /// All client scopes defined in the realm
    async fn list_client_scopes(&self, realm: &str) -> Result<Vec<ClientScopeRepresentation>>;
    async fn list_assigned_client_scopes(
        &self,
        realm: &str,
        client_uuid: &str,
        kind: ClientScopeKind,
    ) -> Result<Vec<ClientScopeRepresentation>>;
    async fn assign_client_scope(
        &self,
        realm: &str,
        client_uuid: &str,
        kind: ClientScopeKind,
        scope_id: &str,
    ) -> Result<()>;
    async fn unassign_client_scope(
        &self,
        realm: &str,
        client_uuid: &str,
        kind: ClientScopeKind,
        scope_id: &str,
    ) -> Result<()>;

    async fn get_user(&self, realm: &str, username: &str) -> Result<Option<UserRepresentation>>;
    async fn create_user(&self, realm: &str, user: &UserRepresentation) -> Result<()>;
    async fn update_user(&self, realm: &str, user: &UserRepresentation) -> Result<()>;
    async fn delete_user(&self, realm: &str, username: &str) -> Result<()>;
    async fn reset_user_password(
        &self,
        realm: &str,
        user_id: &str,
        credential: &CredentialRepresentation,
    ) -> Result<()>;

    async fn list_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
    ) -> Result<Vec<RoleRepresentation>>;
    async fn add_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
        roles: &[RoleRepresentation],
    ) -> Result<()>;
    async fn remove_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
        roles: &[RoleRepresentation],
    ) -> Result<()>;

    /// Group tree of the realm
    async fn list_groups(&self, realm: &str) -> Result<Vec<GroupRepresentation>>;
    async fn list_user_groups(&self, realm: &str, user_id: &str)
        -> Result<Vec<GroupRepresentation>>;
    async fn add_user_to_group(&self, realm: &str, user_id: &str, group_id: &str) -> Result<()>;
    async fn remove_user_from_group(&self, realm: &str, user_id: &str, group_id: &str)
        -> Result<()>;
}

/// Opens an authenticated admin session against a Keycloak instance
///
/// A fresh session is opened for every reconcile invocation.
#[async_trait]
pub trait AdminConnector: Send + Sync {
    async fn connect(&self, instance: &Keycloak) -> Result<Arc<dyn KeycloakAdmin>>;
}
