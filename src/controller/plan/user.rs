//! # User Plan
//!
//! Order: user, password reset, credential Secret, realm-role mappings, group
//! memberships.
//!
//! The password is reset before the credential Secret records it, so a failed
//! reset is retried on the next cycle instead of being masked by an up-to-date
//! Secret. Realm roles Keycloak assigns implicitly (`default-roles-<realm>`) are
//! never removed.
//!
//! Keycloak stores usernames lower-cased, so the plan does too.

use super::{
    auxiliary_action, auxiliary_secret, deletion_requested, derive_id, membership_changes,
};
use crate::cluster::secret_value;
use crate::constants::{USER_PASSWORD_KEY, USER_USERNAME_KEY};
use crate::controller::action::{Action, Entity, EntityRef, SecretValue, SubEntity, UserTarget};
use crate::controller::drift;
use crate::controller::state::user::user_secret_name;
use crate::controller::state::UserState;
use crate::crd::KeycloakUser;
use crate::keycloak::{CredentialRepresentation, GroupRepresentation, RoleRepresentation, UserRepresentation};
use std::collections::BTreeMap;

const DEFAULT_ROLES_PREFIX: &str = "default-roles-";

pub fn plan(desired: &KeycloakUser, state: &UserState) -> Vec<Action> {
    let mut actions = vec![Action::Ping];
    let spec = &desired.spec;
    let realm = state.realm.clone();
    let username = spec.user.username.to_lowercase();

    if deletion_requested(desired) {
        actions.push(Action::DeleteEntity(EntityRef::User { realm, username }));
        return actions;
    }

    let target = UserTarget {
        realm: realm.clone(),
        username: username.clone(),
        id: state
            .user_id()
            .map_or_else(|| derive_id("user", &realm, &username), ToString::to_string),
    };

    let payload = UserRepresentation {
        id: Some(target.id.clone()),
        username: username.clone(),
        ..spec.user.clone()
    };
    match &state.user {
        None => actions.push(Action::CreateEntity(Entity::User {
            realm: realm.clone(),
            user: payload,
        })),
        Some(observed) if drift::differs(&payload, observed) => {
            actions.push(Action::UpdateEntity(Entity::User {
                realm: realm.clone(),
                user: payload,
            }));
        }
        Some(_) => {}
    }

    if let Some(password) = spec.password().and_then(|c| c.value.as_deref()) {
        let stored = state
            .secret
            .as_ref()
            .and_then(|s| secret_value(s, USER_PASSWORD_KEY));
        if state.user.is_none() || stored.as_deref() != Some(password) {
            let temporary = spec.password().and_then(|c| c.temporary).unwrap_or(false);
            actions.push(Action::CreateSubEntity(SubEntity::UserPassword {
                user: target.clone(),
                credential: CredentialRepresentation::password(password, temporary),
            }));
        }

        let entries = BTreeMap::from([
            (
                USER_USERNAME_KEY.to_string(),
                SecretValue::Literal(username.clone()),
            ),
            (
                USER_PASSWORD_KEY.to_string(),
                SecretValue::Literal(password.to_string()),
            ),
        ]);
        let secret = auxiliary_secret(
            desired,
            user_secret_name(&realm, &username),
            entries,
        );
        actions.extend(auxiliary_action(state.secret.as_ref(), secret));
    }

    if let Some(names) = &spec.realm_roles {
        let declared: Vec<RoleRepresentation> = names
            .iter()
            .map(|name| RoleRepresentation {
                name: name.clone(),
                ..Default::default()
            })
            .collect();
        let changes = membership_changes(
            &state.realm_roles,
            &declared,
            &state.available_realm_roles,
            |role| role.name.starts_with(DEFAULT_ROLES_PREFIX),
        );
        if !changes.remove.is_empty() {
            actions.push(Action::DeleteSubEntity(SubEntity::UserRealmRoles {
                user: target.clone(),
                roles: changes.remove,
            }));
        }
        if !changes.add.is_empty() {
            actions.push(Action::CreateSubEntity(SubEntity::UserRealmRoles {
                user: target.clone(),
                roles: changes.add,
            }));
        }
    }

    if let Some(groups) = &spec.groups {
        let declared: Vec<GroupRepresentation> = groups
            .iter()
            .map(|group| GroupRepresentation {
                name: group.clone(),
                ..Default::default()
            })
            .collect();
        let changes = membership_changes(&state.groups, &declared, &state.available_groups, |_| false);
        let membership = |group| SubEntity::UserGroup {
            user: target.clone(),
            group,
        };
        actions.extend(
            changes
                .remove
                .into_iter()
                .map(|g| Action::DeleteSubEntity(membership(g))),
        );
        actions.extend(
            changes
                .add
                .into_iter()
                .map(|g| Action::CreateSubEntity(membership(g))),
        );
    }

    actions
}
