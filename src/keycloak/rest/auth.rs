//! # Admin Authentication
//!
//! Password grant against the master realm's `admin-cli` client.

use crate::constants::{ADMIN_CLIENT_ID, ADMIN_REALM};
use crate::keycloak::{KeycloakError, Result, TokenResponse};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Keycloak admin credentials read from the instance's credential Secret
///
/// Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

pub(super) async fn request_admin_token(
    http: &reqwest::Client,
    base_url: &str,
    credentials: &AdminCredentials,
) -> Result<String> {
    let url = format!("{base_url}/realms/{ADMIN_REALM}/protocol/openid-connect/token");
    let response = http
        .post(url)
        .form(&[
            ("grant_type", "password"),
            ("client_id", ADMIN_CLIENT_ID),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        // Any rejection of the token request is an authentication problem
        return Err(match KeycloakError::from_status(status.as_u16(), "admin token", &body) {
            KeycloakError::Api { status, message } if status == 400 => {
                KeycloakError::Unauthorized(message)
            }
            other => other,
        });
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| KeycloakError::Decode(format!("admin token: {e}")))?;
    Ok(token.access_token)
}
