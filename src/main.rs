//! # Keycloak Operator
//!
//! Watches `KeycloakRealm`, `KeycloakClient` and `KeycloakUser` resources and
//! converges the selected Keycloak instances with them.

use anyhow::Result;
use keycloak_operator::runtime::{initialize, run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;

    run_watch_loop(
        init_result.client,
        init_result.reconciler,
        init_result.server_state,
    )
    .await
}
