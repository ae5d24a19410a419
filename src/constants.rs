//! # Constants
//!
//! Default values shared by the controller configuration and runtime.

/// Fixed delay before a failed reconcile cycle is retried (seconds)
pub const DEFAULT_REQUEUE_AFTER_SECS: u64 = 5;

/// Request-level timeout applied to every Keycloak admin API call (seconds)
pub const DEFAULT_KEYCLOAK_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Finalizer placed on records that have live Keycloak side effects
pub const DEFAULT_FINALIZER_NAME: &str = "keycloak.org/cleanup";

/// Client roles that Keycloak provisions itself when authorization services are enabled
pub const DEFAULT_PROTECTED_CLIENT_ROLES: &str = "uma_protection";

/// Field manager used for server-side patches
pub const FIELD_MANAGER: &str = "keycloak-operator";

/// Prefix of the Secret mirroring a client's credentials
pub const CLIENT_SECRET_PREFIX: &str = "keycloak-client-secret-";

/// Prefix of the Secret holding Keycloak admin or user credentials
pub const CREDENTIAL_SECRET_PREFIX: &str = "credential-";

/// Admin credential Secret keys
pub const ADMIN_USERNAME_KEY: &str = "ADMIN_USERNAME";
pub const ADMIN_PASSWORD_KEY: &str = "ADMIN_PASSWORD";

/// Client Secret keys
pub const CLIENT_ID_KEY: &str = "CLIENT_ID";
pub const CLIENT_SECRET_KEY: &str = "CLIENT_SECRET";

/// User credential Secret keys
pub const USER_USERNAME_KEY: &str = "username";
pub const USER_PASSWORD_KEY: &str = "password";

/// Default metrics/probe server port
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Server startup timeout (seconds)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Server readiness poll interval (milliseconds)
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Server-side timeout of each watch request (seconds)
pub const DEFAULT_WATCH_TIMEOUT_SECS: u32 = 290;

/// Master realm and CLI client used to authenticate the admin session
pub const ADMIN_REALM: &str = "master";
pub const ADMIN_CLIENT_ID: &str = "admin-cli";
