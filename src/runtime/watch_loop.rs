//! # Watch Loop
//!
//! One `kube_runtime` controller per reconciled kind, all driven concurrently
//! until SIGTERM/SIGINT.
//!
//! Client and user controllers also watch the Secrets they own, so a deleted or
//! edited client/credential Secret is restored on the next cycle.

use super::error_policy::error_policy;
use crate::constants::{DEFAULT_WATCH_TIMEOUT_SECS, FIELD_MANAGER};
use crate::controller::plan::MANAGED_BY_LABEL;
use crate::controller::reconciler::{reconcile, Reconcilable, Reconciler};
use crate::crd::{KeycloakClient, KeycloakRealm, KeycloakUser};
use crate::observability::server::ServerState;
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use kube_runtime::controller::Controller;
use kube_runtime::watcher;
use serde::de::DeserializeOwned;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, error, info};

fn api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

fn watcher_config() -> watcher::Config {
    watcher::Config::default().timeout(DEFAULT_WATCH_TIMEOUT_SECS)
}

/// Run the controller of kind `K` until shutdown
///
/// With `owns_secrets`, changes to operator-owned Secrets requeue their owner.
async fn run_controller<K>(client: Client, reconciler: Arc<Reconciler>, owns_secrets: bool)
where
    K: Reconcilable + Resource<Scope = NamespaceResourceScope> + DeserializeOwned,
{
    let namespace = reconciler.config.watch_namespace.clone();
    let mut controller = Controller::new(api::<K>(&client, namespace.as_deref()), watcher_config());
    if owns_secrets {
        let managed = format!("{MANAGED_BY_LABEL}={FIELD_MANAGER}");
        controller = controller.owns(
            api::<Secret>(&client, namespace.as_deref()),
            watcher_config().labels(&managed),
        );
    }

    info!("Starting {} controller", K::KIND);
    controller
        .shutdown_on_signal()
        .run(reconcile::<K>, error_policy::<K>, reconciler)
        .for_each(|result| {
            match result {
                Ok((object, action)) => {
                    debug!(?action, "{} {} reconciliation completed", K::KIND, object.name);
                }
                Err(e) => error!(error = ?e, "{} reconciliation error", K::KIND),
            }
            std::future::ready(())
        })
        .await;
    info!("{} controller stopped", K::KIND);
}

/// Drive the realm, client and user controllers
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<()> {
    info!(
        namespace = reconciler.config.watch_namespace.as_deref().unwrap_or("<all>"),
        "Watching KeycloakRealm, KeycloakClient and KeycloakUser resources"
    );

    tokio::join!(
        run_controller::<KeycloakRealm>(client.clone(), reconciler.clone(), false),
        run_controller::<KeycloakClient>(client.clone(), reconciler.clone(), true),
        run_controller::<KeycloakUser>(client, reconciler, true),
    );

    server_state.is_ready.store(false, Ordering::Relaxed);
    info!("All controllers stopped, shutting down");
    Ok(())
}
