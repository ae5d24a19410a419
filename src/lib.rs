//! # Keycloak Operator
//!
//! A Kubernetes operator that converges Keycloak realms, clients and users with
//! declared custom resources.
//!
//! ## Overview
//!
//! Every `KeycloakRealm`, `KeycloakClient` and `KeycloakUser` record is reconciled in
//! a cycle:
//!
//! 1. **Resolve targets** - label selectors pick the `Keycloak` instances (and realms) the record applies to
//! 2. **Read** - an immutable snapshot of the remote entity, its sub-collections and owned Secrets
//! 3. **Plan** - a pure diff of desired against observed state into an ordered list of actions
//! 4. **Execute** - actions run in order and stop at the first failure
//! 5. **Report** - status `Reconciling`/`Failing`, a cleanup finalizer, events on failure
//!
//! Failed cycles are retried after a fixed delay. A converged record plans
//! nothing but a liveness ping.
//!
//! ## Modules
//!
//! - `crd` - custom resource definitions
//! - `keycloak` - admin API trait, representations and REST client
//! - `cluster` - Kubernetes stores for records, Secrets and events
//! - `controller` - readers, differ, planner, executor and the reconcile cycle
//! - `observability` - Prometheus metrics and probe server
//! - `runtime` - start-up, watch loop and error policy

pub mod cluster;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod keycloak;
pub mod observability;
pub mod runtime;
