//! # Action Planner
//!
//! Pure functions from `(desired record, observed snapshot)` to an ordered plan.
//!
//! Every plan starts with [`Action::Ping`]. A record marked for deletion plans
//! exactly `[Ping, DeleteEntity]`. Otherwise the entity comes first, then its
//! auxiliary Secret, then sub-collections, each as deletions, creations, updates
//! and finally re-creations of names vacated by renames.
//!
//! Planning is deterministic: identifiers of entities that do not exist yet are
//! derived from their natural key, so planning twice against the same snapshot
//! yields the same plan, and a converged snapshot plans only `[Ping]`.

pub mod client;
pub mod realm;
pub mod user;

use super::action::{Action, AuxiliarySecret, SecretValue, SubEntity};
use super::diff::{self, Changes, Identified};
use crate::cluster::secret_value;
use crate::constants::FIELD_MANAGER;
use k8s_openapi::api::core::v1::Secret;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Planner configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PlanConfig {
    /// Client roles Keycloak provisions for authorization services; never deleted while enabled
    pub protected_client_roles: Vec<String>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        crate::config::ControllerConfig::default().plan_config()
    }
}

/// Label put on every Secret the operator owns
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Stable identifier for an entity that does not exist yet
///
/// UUIDv5 of the entity kind, realm and natural key.
pub fn derive_id(kind: &str, realm: &str, key: &str) -> String {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("keycloak.org/{kind}/{realm}/{key}").as_bytes(),
    )
    .to_string()
}

/// True when a record is marked for deletion
pub fn deletion_requested<K: Resource>(record: &K) -> bool {
    record.meta().deletion_timestamp.is_some()
}

/// Auxiliary Secret owned by `owner` in the owner's namespace
pub fn auxiliary_secret<K>(owner: &K, name: String, entries: BTreeMap<String, SecretValue>) -> AuxiliarySecret
where
    K: Resource<DynamicType = ()>,
{
    AuxiliarySecret {
        namespace: owner.namespace().unwrap_or_default(),
        name,
        owner: owner.controller_owner_ref(&()),
        labels: BTreeMap::from([(MANAGED_BY_LABEL.to_string(), FIELD_MANAGER.to_string())]),
        entries,
    }
}

/// Create, update or leave alone an auxiliary Secret
///
/// An existing Secret is up to date when every literal entry already holds the
/// desired value. Entries only known remotely always force a write.
pub fn auxiliary_action(existing: Option<&Secret>, desired: AuxiliarySecret) -> Option<Action> {
    let Some(existing) = existing else {
        return Some(Action::CreateAuxiliary(desired));
    };
    let up_to_date = desired.entries.iter().all(|(key, value)| match value {
        SecretValue::Literal(value) => secret_value(existing, key).as_deref() == Some(value),
        SecretValue::RemoteClientSecret { .. } => false,
    });
    (!up_to_date).then_some(Action::UpdateAuxiliary(desired))
}

/// Emit the actions of one owned sub-collection
///
/// Order: deletions, creations, updates, then re-creations of rename-vacated names.
pub fn push_changes<T>(
    actions: &mut Vec<Action>,
    changes: Changes<T>,
    sub: impl Fn(T, String) -> SubEntity,
) where
    T: Identified,
{
    for entity in changes.delete {
        let name = entity.name().to_string();
        actions.push(Action::DeleteSubEntity(sub(entity, name)));
    }
    for entity in changes.create {
        let name = entity.name().to_string();
        actions.push(Action::CreateSubEntity(sub(entity, name)));
    }
    for update in changes.update {
        actions.push(Action::UpdateSubEntity(sub(update.desired, update.current_name)));
    }
    for entity in changes.recreate {
        let name = entity.name().to_string();
        actions.push(Action::CreateSubEntity(sub(entity, name)));
    }
}

/// Entities to unlink and to link for an assignment-style collection
///
/// Assignments (scope mappings, client scopes, role mappings, memberships) carry
/// no mutable fields, so only membership matters. Ids of `desired` are inherited
/// from `available` before comparing.
#[derive(Debug, Clone, PartialEq)]
pub struct Membership<T> {
    pub remove: Vec<T>,
    pub add: Vec<T>,
}

pub fn membership_changes<T, P>(observed: &[T], desired: &[T], available: &[T], protected: P) -> Membership<T>
where
    T: Identified + Clone,
    P: Fn(&T) -> bool,
{
    let desired = diff::inherit_ids(desired, available);
    Membership {
        remove: diff::diff(observed, &desired)
            .only_in_a
            .into_iter()
            .filter(|entity| !protected(entity))
            .cloned()
            .collect(),
        add: diff::diff(&desired, observed)
            .only_in_a
            .into_iter()
            .cloned()
            .collect(),
    }
}
