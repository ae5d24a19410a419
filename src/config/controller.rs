//! # Reconciler Configuration
//!
//! Settings that shape every reconcile cycle: retry delay, remote timeouts,
//! the cleanup finalizer and the roles the planner must never delete.

use super::env_var_or_default;
use crate::constants::*;
use crate::controller::plan::PlanConfig;
use std::time::Duration;

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Fixed delay before a failed cycle is re-run
    pub requeue_after_secs: u64,
    /// Timeout applied to each Keycloak admin API request
    pub keycloak_request_timeout_secs: u64,
    /// Finalizer name used as the cleanup guard
    pub finalizer_name: String,
    /// Namespace to watch (all namespaces when `None`)
    pub watch_namespace: Option<String>,
    /// Client roles excluded from deletion while authorization services are enabled
    pub protected_client_roles: Vec<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            requeue_after_secs: DEFAULT_REQUEUE_AFTER_SECS,
            keycloak_request_timeout_secs: DEFAULT_KEYCLOAK_REQUEST_TIMEOUT_SECS,
            finalizer_name: DEFAULT_FINALIZER_NAME.to_string(),
            watch_namespace: None,
            protected_client_roles: parse_list(DEFAULT_PROTECTED_CLIENT_ROLES),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            requeue_after_secs: env_var_or_default("REQUEUE_AFTER_SECS", DEFAULT_REQUEUE_AFTER_SECS),
            keycloak_request_timeout_secs: env_var_or_default(
                "KEYCLOAK_REQUEST_TIMEOUT_SECS",
                DEFAULT_KEYCLOAK_REQUEST_TIMEOUT_SECS,
            ),
            finalizer_name: env_var_or_default(
                "FINALIZER_NAME",
                DEFAULT_FINALIZER_NAME.to_string(),
            ),
            watch_namespace: std::env::var("WATCH_NAMESPACE")
                .ok()
                .filter(|ns| !ns.trim().is_empty()),
            protected_client_roles: parse_list(&env_var_or_default(
                "PROTECTED_CLIENT_ROLES",
                DEFAULT_PROTECTED_CLIENT_ROLES.to_string(),
            )),
        }
    }

    pub fn requeue_after(&self) -> Duration {
        Duration::from_secs(self.requeue_after_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.keycloak_request_timeout_secs)
    }

    /// Planner view of the configuration
    pub fn plan_config(&self) -> PlanConfig {
        PlanConfig {
            protected_client_roles: self.protected_client_roles.clone(),
        }
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
