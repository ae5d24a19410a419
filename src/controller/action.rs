//! # Actions
//!
//! The ordered unit of work produced by the planners and consumed once by the
//! executor. Each action is self-contained: it carries the full payload and the
//! addressing it needs, so executing it never consults the observed snapshot.

use crate::keycloak::{
    ClientRepresentation, ClientScopeKind, ClientScopeRepresentation, CredentialRepresentation,
    GroupRepresentation, RealmRepresentation, RoleRepresentation, ScopeMappingSource,
    UserRepresentation,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use std::collections::BTreeMap;
use std::fmt;

/// One idempotent operation against Keycloak or the cluster store
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Pre-flight liveness check of the Keycloak instance
    Ping,
    CreateEntity(Entity),
    UpdateEntity(Entity),
    DeleteEntity(EntityRef),
    CreateSubEntity(SubEntity),
    UpdateSubEntity(SubEntity),
    DeleteSubEntity(SubEntity),
    CreateAuxiliary(AuxiliarySecret),
    UpdateAuxiliary(AuxiliarySecret),
}

/// Top-level Keycloak entity payload
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Realm(RealmRepresentation),
    Client {
        realm: String,
        client: ClientRepresentation,
    },
    User {
        realm: String,
        user: UserRepresentation,
    },
}

/// Natural key of a top-level entity
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRef {
    Realm(String),
    Client { realm: String, client_id: String },
    User { realm: String, username: String },
}

/// Addressing of a client's sub-resources
#[derive(Debug, Clone, PartialEq)]
pub struct ClientTarget {
    pub realm: String,
    pub client_id: String,
    /// Internal id, known before creation because it is assigned by the operator
    pub uuid: String,
}

/// Addressing of a user's sub-resources
#[derive(Debug, Clone, PartialEq)]
pub struct UserTarget {
    pub realm: String,
    pub username: String,
    pub id: String,
}

/// Sub-resource of a client or user
#[derive(Debug, Clone, PartialEq)]
pub enum SubEntity {
    ClientRole {
        client: ClientTarget,
        /// Name the role has in Keycloak (equal to `role.name` unless renamed)
        current_name: String,
        role: RoleRepresentation,
    },
    /// Batch of roles mapped into the client's token scope
    ScopeMappings {
        client: ClientTarget,
        source: ScopeMappingSource,
        /// `realm` or the client ID the roles belong to
        source_name: String,
        roles: Vec<RoleRepresentation>,
    },
    ClientScope {
        client: ClientTarget,
        kind: ClientScopeKind,
        scope: ClientScopeRepresentation,
    },
    UserRealmRoles {
        user: UserTarget,
        roles: Vec<RoleRepresentation>,
    },
    UserGroup {
        user: UserTarget,
        group: GroupRepresentation,
    },
    UserPassword {
        user: UserTarget,
        credential: CredentialRepresentation,
    },
}

/// Secret owned by the operator next to the desired record
#[derive(Debug, Clone, PartialEq)]
pub struct AuxiliarySecret {
    pub namespace: String,
    pub name: String,
    pub owner: Option<OwnerReference>,
    pub labels: BTreeMap<String, String>,
    pub entries: BTreeMap<String, SecretValue>,
}

/// Value of one Secret entry, resolved at execution time
#[derive(Clone, PartialEq)]
pub enum SecretValue {
    Literal(String),
    /// Secret generated by Keycloak for a confidential client
    RemoteClientSecret { realm: String, client_uuid: String },
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(_) => f.write_str("Literal(<redacted>)"),
            Self::RemoteClientSecret { realm, client_uuid } => f
                .debug_struct("RemoteClientSecret")
                .field("realm", realm)
                .field("client_uuid", client_uuid)
                .finish(),
        }
    }
}

impl Action {
    /// Metric label of the action kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::CreateEntity(_) => "create_entity",
            Self::UpdateEntity(_) => "update_entity",
            Self::DeleteEntity(_) => "delete_entity",
            Self::CreateSubEntity(_) => "create_sub_entity",
            Self::UpdateSubEntity(_) => "update_sub_entity",
            Self::DeleteSubEntity(_) => "delete_sub_entity",
            Self::CreateAuxiliary(_) => "create_auxiliary",
            Self::UpdateAuxiliary(_) => "update_auxiliary",
        }
    }

    /// Human-readable description for logs, events and status messages
    ///
    /// Never includes secret values.
    pub fn description(&self) -> String {
        match self {
            Self::Ping => "Ping Keycloak".to_string(),
            Self::CreateEntity(entity) => format!("Create {entity}"),
            Self::UpdateEntity(entity) => format!("Update {entity}"),
            Self::DeleteEntity(entity) => format!("Delete {entity}"),
            Self::CreateSubEntity(sub) => sub.describe("Create", "Add", "Assign"),
            Self::UpdateSubEntity(sub) => sub.describe("Update", "Update", "Update"),
            Self::DeleteSubEntity(sub) => sub.describe("Delete", "Remove", "Unassign"),
            Self::CreateAuxiliary(secret) => {
                format!("Create secret {}/{}", secret.namespace, secret.name)
            }
            Self::UpdateAuxiliary(secret) => {
                format!("Update secret {}/{}", secret.namespace, secret.name)
            }
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Realm(realm) => write!(f, "realm {}", realm.realm),
            Self::Client { realm, client } => {
                write!(f, "client {} in realm {realm}", client.client_id)
            }
            Self::User { realm, user } => write!(f, "user {} in realm {realm}", user.username),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Realm(realm) => write!(f, "realm {realm}"),
            Self::Client { realm, client_id } => write!(f, "client {client_id} in realm {realm}"),
            Self::User { realm, username } => write!(f, "user {username} in realm {realm}"),
        }
    }
}

fn role_names(roles: &[RoleRepresentation]) -> String {
    roles
        .iter()
        .map(|r| r.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl SubEntity {
    /// `verb` applies to owned entities, `link` to mappings and memberships, `assign` to scopes
    fn describe(&self, verb: &str, link: &str, assign: &str) -> String {
        match self {
            Self::ClientRole {
                client,
                current_name,
                role,
            } => {
                if current_name != &role.name {
                    format!(
                        "{verb} client role {current_name} (renamed to {}) of client {} in realm {}",
                        role.name, client.client_id, client.realm
                    )
                } else {
                    format!(
                        "{verb} client role {} of client {} in realm {}",
                        role.name, client.client_id, client.realm
                    )
                }
            }
            Self::ScopeMappings {
                client,
                source_name,
                roles,
                ..
            } => format!(
                "{link} {source_name} scope mappings [{}] for client {} in realm {}",
                role_names(roles),
                client.client_id,
                client.realm
            ),
            Self::ClientScope {
                client,
                kind,
                scope,
            } => format!(
                "{assign} {} client scope {} for client {} in realm {}",
                match kind {
                    ClientScopeKind::Default => "default",
                    ClientScopeKind::Optional => "optional",
                },
                scope.name,
                client.client_id,
                client.realm
            ),
            Self::UserRealmRoles { user, roles } => format!(
                "{link} realm roles [{}] for user {} in realm {}",
                role_names(roles),
                user.username,
                user.realm
            ),
            Self::UserGroup { user, group } => format!(
                "{link} user {} in realm {} {} group {}",
                user.username,
                user.realm,
                if link == "Remove" { "from" } else { "to" },
                group.path.as_deref().unwrap_or(&group.name)
            ),
            Self::UserPassword { user, .. } => format!(
                "Reset password of user {} in realm {}",
                user.username, user.realm
            ),
        }
    }
}
