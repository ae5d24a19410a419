//! # Cluster Store
//!
//! The Kubernetes side of the operator, behind narrow traits:
//!
//! - [`RecordStore`] - get/list custom resources, write status and finalizers
//! - [`SecretStore`] - auxiliary Secrets owned by the operator
//! - [`EventSink`] - diagnostic events on the owning resource
//!
//! The `store` module holds the `kube::Api` implementations. Reconcile cycles only
//! depend on the traits so they can run against in-memory stores in tests.

mod events;
mod store;

pub use self::events::{EventSink, KubeEventSink};
pub use self::store::{KubeRecordStore, KubeSecretStore};

use crate::crd::{ResourceStatus, Selector};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use thiserror::Error;

/// Cluster store error
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("Object is missing {0}")]
    MissingObjectKey(&'static str),
}

pub type Result<T, E = ClusterError> = std::result::Result<T, E>;

/// Custom resources of one kind
#[async_trait]
pub trait RecordStore<K>: Send + Sync {
    /// Fetch a record; `None` when it no longer exists
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>>;

    /// List records in `namespace` matching `selector`
    async fn list(&self, namespace: &str, selector: &Selector) -> Result<Vec<K>>;

    /// Write the status sub-record
    async fn patch_status(&self, record: &K, status: &ResourceStatus) -> Result<()>;

    /// Replace the finalizer list (guarded by the record's resource version)
    async fn set_finalizers(&self, record: &K, finalizers: Vec<String>) -> Result<()>;
}

/// Secrets owned by the operator
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;

    /// Create the Secret; succeeds when it already exists
    async fn create_secret(&self, secret: &Secret) -> Result<()>;

    /// Full replace of the Secret's data, labels and owner references
    async fn update_secret(&self, secret: &Secret) -> Result<()>;
}

/// Read a UTF-8 value from a Secret's `data` (or not yet materialized `stringData`)
pub fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .and_then(|bytes| String::from_utf8(bytes.0.clone()).ok())
        .or_else(|| {
            secret
                .string_data
                .as_ref()
                .and_then(|data| data.get(key).cloned())
        })
}
