//! # KeycloakClient

use super::{ResourceStatus, Selector};
use crate::keycloak::{ClientRepresentation, ClientScopeRepresentation, RoleRepresentation};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Client in every realm matched by `realmSelector`
///
/// # Example
///
/// ```yaml
/// apiVersion: keycloak.org/v1alpha1
/// kind: KeycloakClient
/// metadata:
///   name: web
/// spec:
///   realmSelector:
///     matchLabels:
///       realm: demo
///   client:
///     clientId: web
///     publicClient: false
///     redirectUris: ["https://web.example.com/*"]
///   roles:
///     - name: admin
///     - name: viewer
///   defaultClientScopes:
///     - name: profile
///     - name: email
/// ```
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "KeycloakClient",
    group = "keycloak.org",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    shortname = "kcc",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Ready", "type":"boolean", "jsonPath":".status.ready"}, {"name":"Message", "type":"string", "jsonPath":".status.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakClientSpec {
    /// Selects the realms this client is created in
    #[serde(default)]
    pub realm_selector: Option<Selector>,
    pub client: ClientRepresentation,
    /// Client roles; roles missing here are removed from Keycloak
    #[serde(default)]
    pub roles: Vec<RoleRepresentation>,
    /// Default client scopes; left untouched when unset
    #[serde(default)]
    pub default_client_scopes: Option<Vec<ClientScopeRepresentation>>,
    /// Optional client scopes; left untouched when unset
    #[serde(default)]
    pub optional_client_scopes: Option<Vec<ClientScopeRepresentation>>,
    /// Role scope mappings; left untouched when unset
    #[serde(default)]
    pub scope_mappings: Option<ScopeMappings>,
}

/// Roles included in the client's token scope
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScopeMappings {
    /// Realm roles
    #[serde(default)]
    pub realm_mappings: Vec<RoleRepresentation>,
    /// Roles of other clients, keyed by their client ID
    #[serde(default)]
    pub client_mappings: BTreeMap<String, Vec<RoleRepresentation>>,
}
