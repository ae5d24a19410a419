//! # Client Plan
//!
//! Order: client, client Secret, client roles, realm scope mappings, client
//! scope mappings (per source client), default then optional client scopes.
//!
//! Collections left unset in the spec (`scopeMappings`, `defaultClientScopes`,
//! `optionalClientScopes`) are not managed. An empty list is managed and removes
//! every assignment.

use super::{
    auxiliary_action, auxiliary_secret, deletion_requested, derive_id, membership_changes,
    push_changes, PlanConfig,
};
use crate::cluster::secret_value;
use crate::constants::{CLIENT_ID_KEY, CLIENT_SECRET_KEY};
use crate::controller::action::{Action, ClientTarget, Entity, EntityRef, SecretValue, SubEntity};
use crate::controller::diff::reconcile_collection;
use crate::controller::drift;
use crate::controller::state::client::client_secret_name;
use crate::controller::state::ClientState;
use crate::crd::KeycloakClient;
use crate::keycloak::{
    ClientRepresentation, ClientScopeKind, ClientScopeRepresentation, RoleRepresentation,
    ScopeMappingSource,
};
use std::collections::BTreeMap;

pub fn plan(desired: &KeycloakClient, state: &ClientState, config: &PlanConfig) -> Vec<Action> {
    let mut actions = vec![Action::Ping];
    let spec = &desired.spec;
    let realm = state.realm.clone();

    if deletion_requested(desired) {
        actions.push(Action::DeleteEntity(EntityRef::Client {
            realm,
            client_id: spec.client.client_id.clone(),
        }));
        return actions;
    }

    let target = ClientTarget {
        realm: realm.clone(),
        client_id: spec.client.client_id.clone(),
        uuid: state
            .client_uuid()
            .map_or_else(|| derive_id("client", &realm, &spec.client.client_id), ToString::to_string),
    };

    // The cluster Secret wins over a Keycloak-generated value so that a recreated
    // client keeps the credentials applications already use
    let existing_secret = state
        .secret
        .as_ref()
        .and_then(|s| secret_value(s, CLIENT_SECRET_KEY))
        .filter(|s| !s.is_empty());
    let client_secret = spec.client.secret.clone().or(existing_secret);

    let payload = ClientRepresentation {
        id: Some(target.uuid.clone()),
        secret: client_secret.clone(),
        ..spec.client.clone()
    };
    plan_entity(&mut actions, &realm, payload, state);

    if spec.client.public_client != Some(true) {
        let value = match client_secret.or_else(|| state.remote_secret.clone()) {
            Some(secret) => SecretValue::Literal(secret),
            None => SecretValue::RemoteClientSecret {
                realm: realm.clone(),
                client_uuid: target.uuid.clone(),
            },
        };
        let entries = BTreeMap::from([
            (
                CLIENT_ID_KEY.to_string(),
                SecretValue::Literal(spec.client.client_id.clone()),
            ),
            (CLIENT_SECRET_KEY.to_string(), value),
        ]);
        let secret = auxiliary_secret(desired, client_secret_name(&spec.client.client_id), entries);
        actions.extend(auxiliary_action(state.secret.as_ref(), secret));
    }

    let authorization_enabled = spec.client.authorization_services_enabled == Some(true);
    let protected = |role: &RoleRepresentation| {
        authorization_enabled && config.protected_client_roles.contains(&role.name)
    };
    let roles = reconcile_collection(&state.roles, &spec.roles, protected);
    push_changes(&mut actions, roles, |role, current_name| SubEntity::ClientRole {
        client: target.clone(),
        current_name,
        role,
    });

    if let Some(mappings) = &spec.scope_mappings {
        plan_scope_mappings(
            &mut actions,
            &target,
            ScopeMappingSource::Realm,
            "realm",
            &state.realm_scope_mappings,
            &mappings.realm_mappings,
            &state.available_realm_roles,
        );
        for (source_client_id, roles) in &mappings.client_mappings {
            if let Some(source) = state.client_scope_mappings.get(source_client_id) {
                plan_scope_mappings(
                    &mut actions,
                    &target,
                    ScopeMappingSource::Client(source.source_uuid.clone()),
                    source_client_id,
                    &source.mapped,
                    roles,
                    &source.available,
                );
            }
        }
    }

    for (kind, desired_scopes, assigned) in [
        (
            ClientScopeKind::Default,
            &spec.default_client_scopes,
            &state.default_client_scopes,
        ),
        (
            ClientScopeKind::Optional,
            &spec.optional_client_scopes,
            &state.optional_client_scopes,
        ),
    ] {
        if let Some(desired_scopes) = desired_scopes {
            plan_client_scopes(
                &mut actions,
                &target,
                kind,
                assigned,
                desired_scopes,
                &state.available_client_scopes,
            );
        }
    }

    actions
}

fn plan_entity(actions: &mut Vec<Action>, realm: &str, payload: ClientRepresentation, state: &ClientState) {
    let Some(observed) = &state.client else {
        actions.push(Action::CreateEntity(Entity::Client {
            realm: realm.to_string(),
            client: payload,
        }));
        return;
    };

    // The secret is compared against the dedicated secret endpoint, not the client body
    let attributes_changed = drift::differs(
        &ClientRepresentation {
            secret: None,
            ..payload.clone()
        },
        observed,
    );
    let secret_changed = payload.secret.is_some() && payload.secret != state.remote_secret;
    if attributes_changed || secret_changed {
        actions.push(Action::UpdateEntity(Entity::Client {
            realm: realm.to_string(),
            client: payload,
        }));
    }
}

fn plan_scope_mappings(
    actions: &mut Vec<Action>,
    target: &ClientTarget,
    source: ScopeMappingSource,
    source_name: &str,
    mapped: &[RoleRepresentation],
    desired: &[RoleRepresentation],
    available: &[RoleRepresentation],
) {
    let changes = membership_changes(mapped, desired, available, |_| false);
    let batch = |roles| SubEntity::ScopeMappings {
        client: target.clone(),
        source: source.clone(),
        source_name: source_name.to_string(),
        roles,
    };
    if !changes.remove.is_empty() {
        actions.push(Action::DeleteSubEntity(batch(changes.remove)));
    }
    if !changes.add.is_empty() {
        actions.push(Action::CreateSubEntity(batch(changes.add)));
    }
}

fn plan_client_scopes(
    actions: &mut Vec<Action>,
    target: &ClientTarget,
    kind: ClientScopeKind,
    assigned: &[ClientScopeRepresentation],
    desired: &[ClientScopeRepresentation],
    available: &[ClientScopeRepresentation],
) {
    let changes = membership_changes(assigned, desired, available, |_| false);
    let assignment = |scope| SubEntity::ClientScope {
        client: target.clone(),
        kind,
        scope,
    };
    actions.extend(
        changes
            .remove
            .into_iter()
            .map(|scope| Action::DeleteSubEntity(assignment(scope))),
    );
    actions.extend(
        changes
            .add
            .into_iter()
            .map(|scope| Action::CreateSubEntity(assignment(scope))),
    );
}
