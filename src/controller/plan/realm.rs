//! Realm plan: the realm itself, nothing nested.

use super::deletion_requested;
use crate::controller::action::{Action, Entity, EntityRef};
use crate::controller::drift;
use crate::controller::state::RealmState;
use crate::crd::KeycloakRealm;

pub fn plan(desired: &KeycloakRealm, state: &RealmState) -> Vec<Action> {
    let mut actions = vec![Action::Ping];
    let realm = &desired.spec.realm;

    if deletion_requested(desired) {
        actions.push(Action::DeleteEntity(EntityRef::Realm(realm.realm.clone())));
        return actions;
    }

    match &state.realm {
        None => actions.push(Action::CreateEntity(Entity::Realm(realm.clone()))),
        Some(observed) if drift::differs(realm, observed) => {
            actions.push(Action::UpdateEntity(Entity::Realm(realm.clone())));
        }
        Some(_) => {}
    }
    actions
}
