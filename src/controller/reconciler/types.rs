//! # Types
//!
//! Shared context and error type of the reconcilers.

use crate::cluster::{ClusterError, EventSink, RecordStore, SecretStore};
use crate::config::ControllerConfig;
use crate::crd::{Keycloak, KeycloakClient, KeycloakRealm, KeycloakUser};
use crate::keycloak::{AdminConnector, KeycloakError};
use std::sync::Arc;
use thiserror::Error;

/// Reconciler error
///
/// Every variant is surfaced the same way: status `Failing` with the error
/// text as message, then a fixed-delay retry.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error(transparent)]
    Keycloak(#[from] KeycloakError),
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    /// A dependency required by the plan does not exist
    #[error("{0} not found")]
    NotFound(String),
    /// An action of the plan failed; the rest of the plan was not applied
    #[error("{description}: {source}")]
    Action {
        description: String,
        #[source]
        source: Box<ReconcilerError>,
    },
}

pub type Result<T, E = ReconcilerError> = std::result::Result<T, E>;

/// Reconciler context shared by every cycle
///
/// Holds no per-record state; cycles for different records run concurrently.
pub struct Reconciler {
    pub keycloaks: Arc<dyn RecordStore<Keycloak>>,
    pub realms: Arc<dyn RecordStore<KeycloakRealm>>,
    pub clients: Arc<dyn RecordStore<KeycloakClient>>,
    pub users: Arc<dyn RecordStore<KeycloakUser>>,
    pub secrets: Arc<dyn SecretStore>,
    pub events: Arc<dyn EventSink>,
    pub connector: Arc<dyn AdminConnector>,
    pub config: ControllerConfig,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
