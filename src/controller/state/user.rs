//! # User Snapshot
//!
//! The user, its realm-role mappings and group memberships, the realm's roles and
//! groups, and the user's credential Secret in the cluster.

use crate::cluster::SecretStore;
use crate::constants::CREDENTIAL_SECRET_PREFIX;
use crate::controller::reconciler::Result;
use crate::crd::KeycloakUser;
use crate::keycloak::{GroupRepresentation, KeycloakAdmin, RoleRepresentation, UserRepresentation};
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserState {
    pub realm: String,
    /// `None` when the user does not exist yet
    pub user: Option<UserRepresentation>,
    /// Credential Secret in the cluster
    pub secret: Option<Secret>,
    pub available_realm_roles: Vec<RoleRepresentation>,
    pub realm_roles: Vec<RoleRepresentation>,
    /// Every group of the realm, flattened
    pub available_groups: Vec<GroupRepresentation>,
    pub groups: Vec<GroupRepresentation>,
}

/// Name of the Secret holding a user's credentials
pub fn user_secret_name(realm: &str, username: &str) -> String {
    format!("{CREDENTIAL_SECRET_PREFIX}{realm}-{}", username.to_lowercase())
}

impl UserState {
    pub fn user_id(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(|u| u.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Snapshot for a record marked for deletion; nothing is read
    pub fn deleting(realm: &str) -> Self {
        Self {
            realm: realm.to_string(),
            ..Default::default()
        }
    }

    pub async fn read(
        admin: &dyn KeycloakAdmin,
        secrets: &dyn SecretStore,
        desired: &KeycloakUser,
        realm: &str,
    ) -> Result<Self> {
        let username = desired.spec.user.username.as_str();
        let mut state = Self {
            realm: realm.to_string(),
            user: admin.get_user(realm, username).await?,
            secret: secrets
                .get_secret(
                    &desired.namespace().unwrap_or_default(),
                    &user_secret_name(realm, username),
                )
                .await?,
            available_realm_roles: admin.list_realm_roles(realm).await?,
            available_groups: GroupRepresentation::flatten(&admin.list_groups(realm).await?),
            ..Default::default()
        };

        if let Some(id) = state.user_id().map(ToString::to_string) {
            state.realm_roles = admin.list_user_realm_roles(realm, &id).await?;
            state.groups = admin.list_user_groups(realm, &id).await?;
        }
        Ok(state)
    }
}
