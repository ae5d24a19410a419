//! # Reconciled Kinds
//!
//! Binds each custom resource to its target resolution, reader and planner.
//!
//! A record marked for deletion skips the reader and plans from an empty
//! snapshot, so cleanup never depends on sub-collections that may be gone.

use super::cycle::Reconcilable;
use super::targets::{self, Target};
use super::{Reconciler, Result};
use crate::cluster::RecordStore;
use crate::controller::executor::{self, Backends};
use crate::controller::plan;
use crate::controller::state::{ClientState, RealmState, UserState};
use crate::crd::{KeycloakClient, KeycloakRealm, KeycloakUser, ResourceStatus};
use crate::keycloak::KeycloakAdmin;
use async_trait::async_trait;
use kube::ResourceExt;

#[async_trait]
impl Reconcilable for KeycloakRealm {
    const KIND: &'static str = "KeycloakRealm";

    fn resource_status(&self) -> Option<&ResourceStatus> {
        self.status.as_ref()
    }

    fn store(ctx: &Reconciler) -> &dyn RecordStore<Self> {
        ctx.realms.as_ref()
    }

    async fn targets(&self, ctx: &Reconciler) -> Result<Vec<Target>> {
        let namespace = self.namespace().unwrap_or_default();
        let instances =
            targets::instances(ctx, &namespace, self.spec.instance_selector.as_ref()).await?;
        Ok(instances
            .into_iter()
            .map(|keycloak| Target {
                keycloak,
                realm: self.spec.realm.realm.clone(),
            })
            .collect())
    }

    async fn sync(&self, ctx: &Reconciler, target: &Target, admin: &dyn KeycloakAdmin) -> Result<()> {
        let state = if plan::deletion_requested(self) {
            RealmState::default()
        } else {
            RealmState::read(admin, &target.realm).await?
        };
        let actions = plan::realm::plan(self, &state);
        executor::run(&actions, Backends {
            admin,
            secrets: ctx.secrets.as_ref(),
        })
        .await
    }
}

#[async_trait]
impl Reconcilable for KeycloakClient {
    const KIND: &'static str = "KeycloakClient";

    fn resource_status(&self) -> Option<&ResourceStatus> {
        self.status.as_ref()
    }

    fn store(ctx: &Reconciler) -> &dyn RecordStore<Self> {
        ctx.clients.as_ref()
    }

    async fn targets(&self, ctx: &Reconciler) -> Result<Vec<Target>> {
        let namespace = self.namespace().unwrap_or_default();
        targets::realm_targets(ctx, &namespace, self.spec.realm_selector.as_ref()).await
    }

    async fn sync(&self, ctx: &Reconciler, target: &Target, admin: &dyn KeycloakAdmin) -> Result<()> {
        let secrets = ctx.secrets.as_ref();
        let state = if plan::deletion_requested(self) {
            ClientState::deleting(&target.realm)
        } else {
            ClientState::read(admin, secrets, self, &target.realm).await?
        };
        let actions = plan::client::plan(self, &state, &ctx.config.plan_config());
        executor::run(&actions, Backends { admin, secrets }).await
    }
}

#[async_trait]
impl Reconcilable for KeycloakUser {
    const KIND: &'static str = "KeycloakUser";

    fn resource_status(&self) -> Option<&ResourceStatus> {
        self.status.as_ref()
    }

    fn store(ctx: &Reconciler) -> &dyn RecordStore<Self> {
        ctx.users.as_ref()
    }

    async fn targets(&self, ctx: &Reconciler) -> Result<Vec<Target>> {
        let namespace = self.namespace().unwrap_or_default();
        targets::realm_targets(ctx, &namespace, self.spec.realm_selector.as_ref()).await
    }

    async fn sync(&self, ctx: &Reconciler, target: &Target, admin: &dyn KeycloakAdmin) -> Result<()> {
        let secrets = ctx.secrets.as_ref();
        let state = if plan::deletion_requested(self) {
            UserState::deleting(&target.realm)
        } else {
            UserState::read(admin, secrets, self, &target.realm).await?
        };
        let actions = plan::user::plan(self, &state);
        executor::run(&actions, Backends { admin, secrets }).await
    }
}
