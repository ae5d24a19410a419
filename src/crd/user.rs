//! # KeycloakUser

use super::{ResourceStatus, Selector};
use crate::keycloak::{CredentialRepresentation, UserRepresentation};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// User in every realm matched by `realmSelector`
///
/// # Example
///
/// ```yaml
/// apiVersion: keycloak.org/v1alpha1
/// kind: KeycloakUser
/// metadata:
///   name: alice
/// spec:
///   realmSelector:
///     matchLabels:
///       realm: demo
///   user:
///     username: alice
///     email: alice@example.com
///     enabled: true
///   realmRoles: ["offline_access"]
///   groups: ["engineering"]
///   credentials:
///     - type: password
///       value: change-me
///       temporary: true
/// ```
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "KeycloakUser",
    group = "keycloak.org",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    shortname = "kcu",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Ready", "type":"boolean", "jsonPath":".status.ready"}, {"name":"Message", "type":"string", "jsonPath":".status.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakUserSpec {
    /// Selects the realms this user is created in
    #[serde(default)]
    pub realm_selector: Option<Selector>,
    pub user: UserRepresentation,
    /// Realm role names; left untouched when unset
    #[serde(default)]
    pub realm_roles: Option<Vec<String>>,
    /// Group names or paths; left untouched when unset
    #[serde(default)]
    pub groups: Option<Vec<String>>,
    /// Only the first password credential is used
    #[serde(default)]
    pub credentials: Vec<CredentialRepresentation>,
}

impl KeycloakUserSpec {
    pub fn password(&self) -> Option<&CredentialRepresentation> {
        self.credentials
            .iter()
            .find(|c| c.is_password() && c.value.is_some())
    }
}
