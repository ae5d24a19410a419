//! # Initialization
//!
//! Operator start-up: rustls crypto provider, tracing, metrics, the probe
//! server, the Kubernetes client and the shared reconciler context.

use crate::cluster::{KubeEventSink, KubeRecordStore, KubeSecretStore, SecretStore};
use crate::config::{load_config, ServerConfig};
use crate::constants::FIELD_MANAGER;
use crate::controller::reconciler::Reconciler;
use crate::crd::{Keycloak, KeycloakClient, KeycloakRealm, KeycloakUser};
use crate::keycloak::RestConnector;
use crate::observability;
use crate::observability::server::{start_server, ServerState};
use anyhow::{Context, Result};
use kube::Client;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Everything the watch loop needs
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Reconciler context shared by every controller
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("reconciler", &self.reconciler)
            .field("server_state", &self.server_state)
            .finish_non_exhaustive()
    }
}

/// Initialize the operator runtime
///
/// - rustls crypto provider setup
/// - tracing subscriber
/// - metrics registration and HTTP server startup
/// - Kubernetes client and reconciler context
pub async fn initialize() -> Result<InitializationResult> {
    // rustls 0.23 needs a process-wide provider before the first TLS connection
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keycloak_operator=info".into()),
        )
        .init();

    info!("Starting Keycloak operator v{}", env!("CARGO_PKG_VERSION"));

    let (controller_config, server_config) = load_config();
    info!(
        requeue_after_secs = controller_config.requeue_after_secs,
        watch_namespace = ?controller_config.watch_namespace,
        finalizer = %controller_config.finalizer_name,
        "Loaded controller configuration"
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = server_state.clone();
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let secrets: Arc<dyn SecretStore> = Arc::new(KubeSecretStore::new(client.clone()));
    let reconciler = Arc::new(Reconciler {
        keycloaks: Arc::new(KubeRecordStore::<Keycloak>::new(client.clone())),
        realms: Arc::new(KubeRecordStore::<KeycloakRealm>::new(client.clone())),
        clients: Arc::new(KubeRecordStore::<KeycloakClient>::new(client.clone())),
        users: Arc::new(KubeRecordStore::<KeycloakUser>::new(client.clone())),
        secrets: secrets.clone(),
        events: Arc::new(KubeEventSink::new(client.clone(), FIELD_MANAGER)),
        connector: Arc::new(RestConnector::new(
            secrets,
            controller_config.request_timeout(),
        )),
        config: controller_config,
    });

    info!("Operator initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = config.startup_timeout();
    let poll_interval = config.poll_interval();
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}
