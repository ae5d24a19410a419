//! # Keycloak
//!
//! A Keycloak server instance. The operator only reads it: it provides the admin
//! URL and the credential Secret used to authenticate admin sessions.

use crate::constants::CREDENTIAL_SECRET_PREFIX;
use kube::CustomResource;
use kube::ResourceExt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Keycloak instance
///
/// # Example
///
/// ```yaml
/// apiVersion: keycloak.org/v1alpha1
/// kind: Keycloak
/// metadata:
///   name: sso
///   labels:
///     app: sso
/// spec:
///   external:
///     enabled: true
///     url: https://sso.example.com/auth
/// ```
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Keycloak",
    group = "keycloak.org",
    version = "v1alpha1",
    namespaced,
    status = "KeycloakStatus",
    shortname = "kc",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Ready", "type":"boolean", "jsonPath":".status.ready"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakSpec {
    /// Connection to a Keycloak server that is not run by this operator
    #[serde(default)]
    pub external: ExternalKeycloak,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalKeycloak {
    #[serde(default)]
    pub enabled: bool,
    /// Server root including context path, e.g. `https://sso.example.com/auth`
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakStatus {
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub ready: bool,
    /// In-cluster URL of an operator-managed server
    #[serde(default)]
    pub internal_url: Option<String>,
    /// Name of the Secret holding admin credentials
    #[serde(default)]
    pub credential_secret: Option<String>,
}

impl Keycloak {
    /// URL the admin client should talk to
    ///
    /// External instances use `spec.external.url`; managed instances use the
    /// internal URL published in their status.
    pub fn admin_url(&self) -> Option<&str> {
        let url = if self.spec.external.enabled {
            self.spec.external.url.as_deref()
        } else {
            self.status.as_ref().and_then(|s| s.internal_url.as_deref())
        };
        url.filter(|url| !url.is_empty())
    }

    /// Secret holding `ADMIN_USERNAME` / `ADMIN_PASSWORD`
    pub fn credential_secret_name(&self) -> String {
        self.status
            .as_ref()
            .and_then(|s| s.credential_secret.clone())
            .unwrap_or_else(|| format!("{CREDENTIAL_SECRET_PREFIX}{}", self.name_any()))
    }
}
