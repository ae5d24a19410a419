//! # Set Reconciliation
//!
//! Compares collections of identity-bearing entities (roles, client scopes, groups).
//!
//! Two entities match when both carry an `id` and the ids are equal; otherwise
//! they match when their names are equal. An id match is always preferred over a
//! name match. The single [`diff`] primitive is reused by [`reconcile_collection`]
//! to derive deletions, creations and updates, including rename detection.

use super::drift;
use crate::keycloak::{ClientScopeRepresentation, GroupRepresentation, RoleRepresentation};
use serde::Serialize;
use std::collections::HashSet;

/// An entity with an optional remote identifier and a mandatory name
pub trait Identified {
    /// Identifier assigned by Keycloak; empty ids are treated as absent
    fn id(&self) -> Option<&str>;
    fn name(&self) -> &str;
    /// Copy of `self` carrying `id`
    #[must_use]
    fn with_id(&self, id: &str) -> Self
    where
        Self: Sized;
    /// Whether a declared reference (name, or path for groups) designates this entity
    fn is_named(&self, name: &str) -> bool {
        self.name() == name
    }
}

fn non_empty(id: Option<&String>) -> Option<&str> {
    id.map(String::as_str).filter(|id| !id.is_empty())
}

impl Identified for RoleRepresentation {
    fn id(&self) -> Option<&str> {
        non_empty(self.id.as_ref())
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn with_id(&self, id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..self.clone()
        }
    }
}

impl Identified for ClientScopeRepresentation {
    fn id(&self) -> Option<&str> {
        non_empty(self.id.as_ref())
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn with_id(&self, id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..self.clone()
        }
    }
}

impl Identified for GroupRepresentation {
    fn id(&self) -> Option<&str> {
        non_empty(self.id.as_ref())
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn with_id(&self, id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..self.clone()
        }
    }
    fn is_named(&self, name: &str) -> bool {
        self.name == name || self.path.as_deref() == Some(name)
    }
}

/// Pair of matched entities
#[derive(Debug)]
pub struct Matched<'a, T> {
    /// Entity from the first collection
    pub a: &'a T,
    /// Its counterpart in the second collection
    pub b: &'a T,
}

/// Result of comparing collection `a` against collection `b`
///
/// `only_in_a` and the `a` side of `matched` partition `a` exactly.
#[derive(Debug)]
pub struct Diff<'a, T> {
    pub only_in_a: Vec<&'a T>,
    pub matched: Vec<Matched<'a, T>>,
}

fn find_match<'a, T: Identified>(entity: &T, others: &'a [T]) -> Option<&'a T> {
    if let Some(id) = entity.id() {
        if let Some(found) = others.iter().find(|o| o.id() == Some(id)) {
            return Some(found);
        }
    }
    others.iter().find(|o| {
        (entity.id().is_none() || o.id().is_none()) && o.name() == entity.name()
    })
}

/// Split `a` into entities without a counterpart in `b` and matched pairs
pub fn diff<'a, T: Identified>(a: &'a [T], b: &'a [T]) -> Diff<'a, T> {
    let mut result = Diff {
        only_in_a: Vec::new(),
        matched: Vec::new(),
    };
    for entity in a {
        match find_match(entity, b) {
            Some(other) => result.matched.push(Matched { a: entity, b: other }),
            None => result.only_in_a.push(entity),
        }
    }
    result
}

/// Fill in missing ids of `desired` from `available` entities with the same name
///
/// Ids already present on the desired side are kept.
pub fn inherit_ids<T: Identified + Clone>(desired: &[T], available: &[T]) -> Vec<T> {
    desired
        .iter()
        .map(|entity| {
            if entity.id().is_some() {
                return entity.clone();
            }
            available
                .iter()
                .find(|a| a.is_named(entity.name()))
                .and_then(|a| a.id().map(|id| entity.with_id(id)))
                .unwrap_or_else(|| entity.clone())
        })
        .collect()
}

/// A matched entity whose remote value must be replaced
#[derive(Debug, Clone, PartialEq)]
pub struct Update<T> {
    /// Name the entity currently has in Keycloak
    pub current_name: String,
    pub desired: T,
}

/// Changes needed to converge one sub-collection
#[derive(Debug, Clone, PartialEq)]
pub struct Changes<T> {
    pub delete: Vec<T>,
    pub create: Vec<T>,
    pub update: Vec<Update<T>>,
    /// Entities whose name was vacated by a rename in `update`
    pub recreate: Vec<T>,
}

impl<T> Changes<T> {
    pub fn is_empty(&self) -> bool {
        self.delete.is_empty()
            && self.create.is_empty()
            && self.update.is_empty()
            && self.recreate.is_empty()
    }
}

/// Compute deletions, creations and updates that turn `observed` into `desired`
///
/// Observed entities for which `protected` returns true are never deleted.
/// A declared entity without id whose name was just vacated by a rename is
/// re-created rather than updated, so it cannot inherit the renamed entity.
pub fn reconcile_collection<T, P>(observed: &[T], desired: &[T], protected: P) -> Changes<T>
where
    T: Identified + Clone + Serialize,
    P: Fn(&T) -> bool,
{
    let delete = diff(observed, desired)
        .only_in_a
        .into_iter()
        .filter(|entity| !protected(entity))
        .cloned()
        .collect();

    let forward = diff(desired, observed);
    let create = forward.only_in_a.into_iter().cloned().collect();

    let renamed: HashSet<&str> = forward
        .matched
        .iter()
        .filter(|m| m.a.id().is_some() && m.a.id() == m.b.id() && m.a.name() != m.b.name())
        .map(|m| m.b.name())
        .collect();

    let mut update = Vec::new();
    let mut recreate = Vec::new();
    for pair in &forward.matched {
        if pair.a.id().is_none() && renamed.contains(pair.a.name()) {
            recreate.push(pair.a.clone());
        } else if drift::differs(pair.a, pair.b) {
            update.push(Update {
                current_name: pair.b.name().to_string(),
                desired: pair.a.clone(),
            });
        }
    }

    Changes {
        delete,
        create,
        update,
        recreate,
    }
}
