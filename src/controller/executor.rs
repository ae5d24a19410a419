//! # Action Executor
//!
//! Applies a plan strictly in order and stops at the first failure. There is no
//! rollback: the next cycle re-reads the observed state and plans the remainder.
//!
//! Creates are create-if-absent (a `409` from Keycloak or the cluster counts as
//! success) and updates are full replaces, so re-running a partially applied plan
//! is safe.

use crate::cluster::SecretStore;
use crate::controller::action::{Action, AuxiliarySecret, Entity, EntityRef, SecretValue, SubEntity};
use crate::controller::diff::Identified;
use crate::controller::reconciler::{ReconcilerError, Result};
use crate::keycloak::{KeycloakAdmin, KeycloakError, RoleRepresentation};
use crate::observability;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Backends an action may target
#[derive(Clone, Copy)]
pub struct Backends<'a> {
    pub admin: &'a dyn KeycloakAdmin,
    pub secrets: &'a dyn SecretStore,
}

impl std::fmt::Debug for Backends<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}

/// Run `actions` in order, returning the first error
pub async fn run(actions: &[Action], backends: Backends<'_>) -> Result<()> {
    for action in actions {
        let description = action.description();
        info!(action = %description, kind = action.kind(), "Executing action");
        if let Err(e) = apply(action, backends).await {
            warn!(action = %description, error = %e, "Action failed, aborting plan");
            observability::metrics::increment_action_failures(action.kind());
            return Err(ReconcilerError::Action {
                description,
                source: Box::new(e),
            });
        }
        observability::metrics::increment_actions_executed(action.kind());
    }
    Ok(())
}

/// Treat "already exists" as success
fn created(result: std::result::Result<(), KeycloakError>, what: &str) -> Result<()> {
    match result {
        Err(KeycloakError::Conflict(_)) => {
            debug!("{} already exists, nothing to create", what);
            Ok(())
        }
        other => Ok(other?),
    }
}

async fn apply(action: &Action, backends: Backends<'_>) -> Result<()> {
    let admin = backends.admin;
    match action {
        Action::Ping => Ok(admin.ping().await?),
        Action::CreateEntity(entity) => {
            let result = match entity {
                Entity::Realm(realm) => admin.create_realm(realm).await,
                Entity::Client { realm, client } => admin.create_client(realm, client).await,
                Entity::User { realm, user } => admin.create_user(realm, user).await,
            };
            created(result, &entity.to_string())
        }
        Action::UpdateEntity(entity) => Ok(match entity {
            Entity::Realm(realm) => admin.update_realm(realm).await?,
            Entity::Client { realm, client } => admin.update_client(realm, client).await?,
            Entity::User { realm, user } => admin.update_user(realm, user).await?,
        }),
        Action::DeleteEntity(entity) => Ok(match entity {
            EntityRef::Realm(realm) => admin.delete_realm(realm).await?,
            EntityRef::Client { realm, client_id } => admin.delete_client(realm, client_id).await?,
            EntityRef::User { realm, username } => admin.delete_user(realm, username).await?,
        }),
        Action::CreateSubEntity(sub) => create_sub(admin, sub).await,
        Action::UpdateSubEntity(sub) => update_sub(admin, sub).await,
        Action::DeleteSubEntity(sub) => delete_sub(admin, sub).await,
        Action::CreateAuxiliary(secret) => {
            let secret = materialize(admin, secret).await?;
            Ok(backends.secrets.create_secret(&secret).await?)
        }
        Action::UpdateAuxiliary(secret) => {
            let secret = materialize(admin, secret).await?;
            Ok(backends.secrets.update_secret(&secret).await?)
        }
    }
}

fn required_id<'a>(id: Option<&'a String>, what: impl FnOnce() -> String) -> Result<&'a str> {
    id.map(String::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ReconcilerError::NotFound(what()))
}

/// Mappings address roles by id; a declared role unknown to Keycloak has none
fn require_role_ids(roles: &[RoleRepresentation], realm: &str) -> Result<()> {
    match roles.iter().find(|role| role.id().is_none()) {
        Some(role) => Err(ReconcilerError::NotFound(format!(
            "role {} in realm {realm}",
            role.name
        ))),
        None => Ok(()),
    }
}

async fn create_sub(admin: &dyn KeycloakAdmin, sub: &SubEntity) -> Result<()> {
    match sub {
        SubEntity::ClientRole { client, role, .. } => created(
            admin
                .create_client_role(&client.realm, &client.uuid, role)
                .await,
            &format!("client role {}", role.name),
        ),
        SubEntity::ScopeMappings {
            client,
            source,
            roles,
            ..
        } => {
            require_role_ids(roles, &client.realm)?;
            Ok(admin
                .add_scope_mappings(&client.realm, &client.uuid, source, roles)
                .await?)
        }
        SubEntity::ClientScope {
            client,
            kind,
            scope,
        } => {
            let scope_id = required_id(scope.id.as_ref(), || {
                format!("client scope {} in realm {}", scope.name, client.realm)
            })?;
            Ok(admin
                .assign_client_scope(&client.realm, &client.uuid, *kind, scope_id)
                .await?)
        }
        SubEntity::UserRealmRoles { user, roles } => {
            require_role_ids(roles, &user.realm)?;
            Ok(admin.add_user_realm_roles(&user.realm, &user.id, roles).await?)
        }
        SubEntity::UserGroup { user, group } => {
            let group_id = required_id(group.id.as_ref(), || {
                format!("group {} in realm {}", group.name, user.realm)
            })?;
            Ok(admin
                .add_user_to_group(&user.realm, &user.id, group_id)
                .await?)
        }
        SubEntity::UserPassword { user, credential } => Ok(admin
            .reset_user_password(&user.realm, &user.id, credential)
            .await?),
    }
}

async fn update_sub(admin: &dyn KeycloakAdmin, sub: &SubEntity) -> Result<()> {
    match sub {
        SubEntity::ClientRole {
            client,
            current_name,
            role,
        } => Ok(admin
            .update_client_role(&client.realm, &client.uuid, current_name, role)
            .await?),
        // Assignments have no mutable fields; re-applying them is the update
        other => create_sub(admin, other).await,
    }
}

async fn delete_sub(admin: &dyn KeycloakAdmin, sub: &SubEntity) -> Result<()> {
    match sub {
        SubEntity::ClientRole {
            client,
            current_name,
            ..
        } => Ok(admin
            .delete_client_role(&client.realm, &client.uuid, current_name)
            .await?),
        SubEntity::ScopeMappings {
            client,
            source,
            roles,
            ..
        } => Ok(admin
            .remove_scope_mappings(&client.realm, &client.uuid, source, roles)
            .await?),
        SubEntity::ClientScope {
            client,
            kind,
            scope,
        } => {
            let scope_id = required_id(scope.id.as_ref(), || {
                format!("client scope {} in realm {}", scope.name, client.realm)
            })?;
            Ok(admin
                .unassign_client_scope(&client.realm, &client.uuid, *kind, scope_id)
                .await?)
        }
        SubEntity::UserRealmRoles { user, roles } => Ok(admin
            .remove_user_realm_roles(&user.realm, &user.id, roles)
            .await?),
        SubEntity::UserGroup { user, group } => {
            let group_id = required_id(group.id.as_ref(), || {
                format!("group {} in realm {}", group.name, user.realm)
            })?;
            Ok(admin
                .remove_user_from_group(&user.realm, &user.id, group_id)
                .await?)
        }
        SubEntity::UserPassword { .. } => Ok(()),
    }
}

/// Resolve every entry of an auxiliary Secret into a concrete `Secret`
async fn materialize(admin: &dyn KeycloakAdmin, aux: &AuxiliarySecret) -> Result<Secret> {
    let mut data = BTreeMap::new();
    for (key, value) in &aux.entries {
        let value = match value {
            SecretValue::Literal(value) => value.clone(),
            SecretValue::RemoteClientSecret { realm, client_uuid } => admin
                .get_client_secret(realm, client_uuid)
                .await?
                .ok_or_else(|| {
                    ReconcilerError::NotFound(format!(
                        "secret of client {client_uuid} in realm {realm}"
                    ))
                })?,
        };
        data.insert(key.clone(), ByteString(value.into_bytes()));
    }

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(aux.name.clone()),
            namespace: Some(aux.namespace.clone()),
            labels: Some(aux.labels.clone()),
            owner_references: aux.owner.clone().map(|owner| vec![owner]),
            ..Default::default()
        },
        data: Some(data),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    })
}
