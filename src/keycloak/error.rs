//! # Keycloak Errors
//!
//! Typed failures of the admin API. The reconciler surfaces all of them the same
//! way (status `Failing`, fixed-delay retry) but the variants keep "not found",
//! "unauthorized" and "unreachable" apart for logging and for idempotent deletes.

use thiserror::Error;

/// Keycloak admin API error
#[derive(Debug, Error)]
pub enum KeycloakError {
    /// Connection refused, DNS failure or request timeout
    #[error("Keycloak unreachable: {0}")]
    Unreachable(String),
    /// 401/403, or the admin token could not be obtained
    #[error("Keycloak rejected credentials: {0}")]
    Unauthorized(String),
    /// 409: the entity already exists or changed concurrently
    #[error("Keycloak conflict: {0}")]
    Conflict(String),
    /// 404 on a specific entity
    #[error("Keycloak entity not found: {0}")]
    NotFound(String),
    /// Any other non-success status
    #[error("Keycloak API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// Admin URL or credential Secret of the instance is missing or unreadable
    #[error("Keycloak admin credentials unavailable: {0}")]
    Credentials(String),
    /// Response body could not be decoded
    #[error("Failed to decode Keycloak response: {0}")]
    Decode(String),
}

impl KeycloakError {
    /// Classify an HTTP status code returned by Keycloak
    pub fn from_status(status: u16, context: &str, body: &str) -> Self {
        let message = if body.is_empty() {
            context.to_string()
        } else {
            format!("{context}: {body}")
        };
        match status {
            401 | 403 => Self::Unauthorized(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::Api { status, message },
        }
    }
}

impl From<reqwest::Error> for KeycloakError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else if let Some(status) = error.status() {
            Self::from_status(status.as_u16(), "request failed", &error.to_string())
        } else {
            // connect, timeout, body and redirect errors all mean the server is not usable right now
            Self::Unreachable(error.to_string())
        }
    }
}
