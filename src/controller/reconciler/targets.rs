//! # Target Resolution
//!
//! Resolves the Keycloak instances (and the realm inside them) a record applies
//! to, always within the record's own namespace:
//!
//! - `KeycloakRealm` selects `Keycloak` instances through `instanceSelector`
//! - `KeycloakClient` / `KeycloakUser` select realms through `realmSelector`,
//!   and each realm contributes the instances it selects
//!
//! An absent selector or a selector matching nothing yields zero targets, which
//! is not an error.

use crate::controller::reconciler::{Reconciler, Result};
use crate::crd::{Keycloak, Selector};
use kube::ResourceExt;
use tracing::debug;

/// One Keycloak instance and the realm to act in
#[derive(Debug, Clone)]
pub struct Target {
    pub keycloak: Keycloak,
    pub realm: String,
}

impl Target {
    /// `<namespace>/<keycloak>:<realm>` for logs
    pub fn label(&self) -> String {
        format!(
            "{}/{}:{}",
            self.keycloak.namespace().unwrap_or_default(),
            self.keycloak.name_any(),
            self.realm
        )
    }
}

pub async fn instances(
    ctx: &Reconciler,
    namespace: &str,
    selector: Option<&Selector>,
) -> Result<Vec<Keycloak>> {
    let Some(selector) = selector else {
        return Ok(Vec::new());
    };
    Ok(ctx.keycloaks.list(namespace, selector).await?)
}

pub async fn realm_targets(
    ctx: &Reconciler,
    namespace: &str,
    realm_selector: Option<&Selector>,
) -> Result<Vec<Target>> {
    let Some(selector) = realm_selector else {
        return Ok(Vec::new());
    };

    let mut targets = Vec::new();
    for realm in ctx.realms.list(namespace, selector).await? {
        let keycloaks = instances(ctx, namespace, realm.spec.instance_selector.as_ref()).await?;
        debug!(
            realm = %realm.name_any(),
            instances = keycloaks.len(),
            "Resolved Keycloak instances for realm"
        );
        targets.extend(keycloaks.into_iter().map(|keycloak| Target {
            keycloak,
            realm: realm.spec.realm.realm.clone(),
        }));
    }
    Ok(targets)
}
