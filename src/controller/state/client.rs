//! # Client Snapshot
//!
//! The client, its roles, scope mappings and client-scope assignments, the
//! realm-level collections they reference, and the client Secret in the cluster.

use crate::cluster::SecretStore;
use crate::constants::CLIENT_SECRET_PREFIX;
use crate::controller::reconciler::{ReconcilerError, Result};
use crate::crd::KeycloakClient;
use crate::keycloak::{
    ClientRepresentation, ClientScopeKind, ClientScopeRepresentation, KeycloakAdmin,
    RoleRepresentation, ScopeMappingSource,
};
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Scope mappings towards the roles of one other client
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientMappingState {
    /// Internal id of the client owning the roles
    pub source_uuid: String,
    /// Roles defined by the source client
    pub available: Vec<RoleRepresentation>,
    /// Roles of the source client currently mapped into this client
    pub mapped: Vec<RoleRepresentation>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientState {
    pub realm: String,
    /// `None` when the client does not exist yet
    pub client: Option<ClientRepresentation>,
    /// Secret Keycloak currently holds for the client
    pub remote_secret: Option<String>,
    /// Client Secret in the cluster
    pub secret: Option<Secret>,
    pub roles: Vec<RoleRepresentation>,
    pub available_realm_roles: Vec<RoleRepresentation>,
    pub realm_scope_mappings: Vec<RoleRepresentation>,
    /// Keyed by the source client's client ID
    pub client_scope_mappings: BTreeMap<String, ClientMappingState>,
    pub available_client_scopes: Vec<ClientScopeRepresentation>,
    pub default_client_scopes: Vec<ClientScopeRepresentation>,
    pub optional_client_scopes: Vec<ClientScopeRepresentation>,
}

/// Name of the Secret mirroring a client's credentials
pub fn client_secret_name(client_id: &str) -> String {
    format!("{CLIENT_SECRET_PREFIX}{client_id}")
}

impl ClientState {
    /// Internal id of the observed client
    pub fn client_uuid(&self) -> Option<&str> {
        self.client
            .as_ref()
            .and_then(|c| c.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Snapshot for a record marked for deletion
    ///
    /// Nothing is read: the deletion plan only needs the natural key, and a
    /// dependency that is already gone must not block the cleanup.
    pub fn deleting(realm: &str) -> Self {
        Self {
            realm: realm.to_string(),
            ..Default::default()
        }
    }

    /// Snapshot `desired` inside `realm`
    ///
    /// Fails with `NotFound` when a client referenced by the scope mappings does not exist.
    pub async fn read(
        admin: &dyn KeycloakAdmin,
        secrets: &dyn SecretStore,
        desired: &KeycloakClient,
        realm: &str,
    ) -> Result<Self> {
        let spec = &desired.spec;
        let client_id = spec.client.client_id.as_str();

        let mut state = Self {
            realm: realm.to_string(),
            client: admin.get_client(realm, client_id).await?,
            available_realm_roles: admin.list_realm_roles(realm).await?,
            available_client_scopes: admin.list_client_scopes(realm).await?,
            secret: secrets
                .get_secret(
                    &desired.namespace().unwrap_or_default(),
                    &client_secret_name(client_id),
                )
                .await?,
            ..Default::default()
        };

        let uuid = state.client_uuid().map(ToString::to_string);
        if let Some(uuid) = &uuid {
            state.roles = admin.list_client_roles(realm, uuid).await?;
            state.remote_secret = admin.get_client_secret(realm, uuid).await?;
            state.realm_scope_mappings = admin
                .list_scope_mappings(realm, uuid, &ScopeMappingSource::Realm)
                .await?;
            state.default_client_scopes = admin
                .list_assigned_client_scopes(realm, uuid, ClientScopeKind::Default)
                .await?;
            state.optional_client_scopes = admin
                .list_assigned_client_scopes(realm, uuid, ClientScopeKind::Optional)
                .await?;
        }

        let sources = spec
            .scope_mappings
            .iter()
            .flat_map(|mappings| mappings.client_mappings.keys());
        for source_client_id in sources {
            let source_uuid = admin
                .get_client(realm, source_client_id)
                .await?
                .and_then(|c| c.id)
                .ok_or_else(|| {
                    ReconcilerError::NotFound(format!(
                        "client {source_client_id} in realm {realm}"
                    ))
                })?;
            let mapped = match &uuid {
                Some(uuid) => {
                    admin
                        .list_scope_mappings(
                            realm,
                            uuid,
                            &ScopeMappingSource::Client(source_uuid.clone()),
                        )
                        .await?
                }
                None => Vec::new(),
            };
            state.client_scope_mappings.insert(
                source_client_id.clone(),
                ClientMappingState {
                    available: admin.list_client_roles(realm, &source_uuid).await?,
                    source_uuid,
                    mapped,
                },
            );
        }

        Ok(state)
    }
}
