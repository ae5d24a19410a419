//! # Connector
//!
//! Resolves the admin URL and credential Secret of a [`Keycloak`] instance and
//! opens a [`KeycloakRestClient`] session.

use super::{AdminCredentials, KeycloakRestClient};
use crate::cluster::{secret_value, SecretStore};
use crate::constants::{ADMIN_PASSWORD_KEY, ADMIN_USERNAME_KEY};
use crate::crd::Keycloak;
use crate::keycloak::{AdminConnector, KeycloakAdmin, KeycloakError, Result};
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// [`AdminConnector`] backed by the REST client
pub struct RestConnector {
    secrets: Arc<dyn SecretStore>,
    timeout: Duration,
}

impl std::fmt::Debug for RestConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestConnector")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RestConnector {
    pub fn new(secrets: Arc<dyn SecretStore>, timeout: Duration) -> Self {
        Self { secrets, timeout }
    }

    async fn credentials(&self, instance: &Keycloak) -> Result<AdminCredentials> {
        let namespace = instance.namespace().unwrap_or_default();
        let name = instance.credential_secret_name();
        let secret = self
            .secrets
            .get_secret(&namespace, &name)
            .await
            .map_err(|e| KeycloakError::Credentials(format!("{namespace}/{name}: {e}")))?
            .ok_or_else(|| {
                KeycloakError::Credentials(format!("secret {namespace}/{name} not found"))
            })?;

        let read = |key: &str| {
            secret_value(&secret, key).ok_or_else(|| {
                KeycloakError::Credentials(format!("secret {namespace}/{name} has no {key}"))
            })
        };
        Ok(AdminCredentials {
            username: read(ADMIN_USERNAME_KEY)?,
            password: read(ADMIN_PASSWORD_KEY)?,
        })
    }
}

#[async_trait]
impl AdminConnector for RestConnector {
    async fn connect(&self, instance: &Keycloak) -> Result<Arc<dyn KeycloakAdmin>> {
        let url = instance.admin_url().ok_or_else(|| {
            KeycloakError::Credentials(format!("keycloak {} has no admin URL", instance.name_any()))
        })?;
        let credentials = self.credentials(instance).await?;
        debug!(keycloak = %instance.name_any(), url, "Connecting to Keycloak");
        let client = KeycloakRestClient::connect(url, &credentials, self.timeout).await?;
        Ok(Arc::new(client))
    }
}
