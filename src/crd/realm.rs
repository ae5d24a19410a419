//! # KeycloakRealm

use super::{ResourceStatus, Selector};
use crate::keycloak::RealmRepresentation;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Realm on one or more Keycloak instances
///
/// # Example
///
/// ```yaml
/// apiVersion: keycloak.org/v1alpha1
/// kind: KeycloakRealm
/// metadata:
///   name: demo
///   labels:
///     realm: demo
/// spec:
///   instanceSelector:
///     matchLabels:
///       app: sso
///   realm:
///     realm: demo
///     enabled: true
/// ```
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "KeycloakRealm",
    group = "keycloak.org",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    shortname = "kcr",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Ready", "type":"boolean", "jsonPath":".status.ready"}, {"name":"Message", "type":"string", "jsonPath":".status.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakRealmSpec {
    /// Selects the Keycloak instances this realm is created on
    #[serde(default)]
    pub instance_selector: Option<Selector>,
    pub realm: RealmRepresentation,
}
