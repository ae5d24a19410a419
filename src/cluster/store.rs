//! # Kubernetes Implementations
//!
//! `kube::Api` backed stores.

use super::{ClusterError, RecordStore, Result, SecretStore};
use crate::constants::FIELD_MANAGER;
use crate::crd::{ResourceStatus, Selector};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::marker::PhantomData;
use tracing::debug;

/// Record store for any namespaced custom resource
pub struct KubeRecordStore<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeRecordStore<K> {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

impl<K> std::fmt::Debug for KubeRecordStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeRecordStore").finish_non_exhaustive()
    }
}

impl<K> KubeRecordStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug,
{
    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn key(record: &K) -> Result<(String, String)> {
        let namespace = record
            .namespace()
            .ok_or(ClusterError::MissingObjectKey(".metadata.namespace"))?;
        let name = record
            .meta()
            .name
            .clone()
            .ok_or(ClusterError::MissingObjectKey(".metadata.name"))?;
        Ok((namespace, name))
    }
}

#[async_trait]
impl<K> RecordStore<K> for KubeRecordStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Serialize
        + Debug
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        Ok(self.api(namespace).get_opt(name).await?)
    }

    async fn list(&self, namespace: &str, selector: &Selector) -> Result<Vec<K>> {
        let params = ListParams::default().labels(&selector.to_selector_string());
        Ok(self.api(namespace).list(&params).await?.items)
    }

    async fn patch_status(&self, record: &K, status: &ResourceStatus) -> Result<()> {
        let (namespace, name) = Self::key(record)?;
        let patch = serde_json::json!({ "status": status });
        match self
            .api(&namespace)
            .patch_status(
                &name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(patch),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
                // Resource was deleted during reconciliation - this is expected and not an error
                debug!(
                    "{}/{} was deleted during reconciliation, skipping status update",
                    namespace, name
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn set_finalizers(&self, record: &K, finalizers: Vec<String>) -> Result<()> {
        let (namespace, name) = Self::key(record)?;
        let patch = serde_json::json!({
            "metadata": {
                "finalizers": finalizers,
                "resourceVersion": record.resource_version(),
            }
        });
        self.api(&namespace)
            .patch(&name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }
}

/// Secret store backed by the core/v1 Secret API
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretStore").finish_non_exhaustive()
    }
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, secret: &Secret) -> Result<(Api<Secret>, String)> {
        let namespace = secret
            .metadata
            .namespace
            .as_deref()
            .ok_or(ClusterError::MissingObjectKey(".metadata.namespace"))?;
        let name = secret
            .metadata
            .name
            .clone()
            .ok_or(ClusterError::MissingObjectKey(".metadata.name"))?;
        Ok((Api::namespaced(self.client.clone(), namespace), name))
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_secret(&self, secret: &Secret) -> Result<()> {
        let (api, name) = self.api(secret)?;
        match api.create(&PostParams::default(), secret).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(api_err)) if api_err.code == 409 => {
                debug!("Secret {} already exists, leaving it to the update path", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_secret(&self, secret: &Secret) -> Result<()> {
        let (api, name) = self.api(secret)?;
        api.patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(secret),
        )
        .await?;
        Ok(())
    }
}
