//! # Resource Status
//!
//! Status sub-record written back onto realm, client and user resources.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the last reconcile cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum StatusPhase {
    /// Last cycle converged the remote state
    Reconciling,
    /// Last cycle failed; a retry is scheduled
    Failing,
}

impl fmt::Display for StatusPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reconciling => f.write_str("Reconciling"),
            Self::Failing => f.write_str("Failing"),
        }
    }
}

/// Status of a KeycloakRealm, KeycloakClient or KeycloakUser
///
/// Set at the end of every cycle, success or failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    #[serde(default)]
    pub phase: Option<StatusPhase>,
    /// Error text of the last failed cycle, empty on success
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub ready: bool,
}

impl ResourceStatus {
    pub fn reconciled() -> Self {
        Self {
            phase: Some(StatusPhase::Reconciling),
            message: String::new(),
            ready: true,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            phase: Some(StatusPhase::Failing),
            message: message.into(),
            ready: false,
        }
    }
}
