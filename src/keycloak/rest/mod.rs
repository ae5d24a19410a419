//! # Keycloak REST Client
//!
//! Native REST implementation of [`KeycloakAdmin`] on top of `reqwest` with rustls.
//!
//! A client is built per reconcile invocation: it authenticates once against the
//! master realm and carries the bearer token for the rest of the cycle. No token
//! is cached across cycles.
//!
//! API Reference: https://www.keycloak.org/docs-api/latest/rest-api/index.html

mod auth;
mod connector;

pub use auth::AdminCredentials;
pub use connector::RestConnector;

use super::{
    ClientRepresentation, ClientScopeKind, ClientScopeRepresentation, CredentialRepresentation,
    GroupRepresentation, KeycloakAdmin, KeycloakError, RealmRepresentation, Result,
    RoleRepresentation, ScopeMappingSource, UserRepresentation,
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use urlencoding::encode;

/// Authenticated Keycloak admin client
pub struct KeycloakRestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for KeycloakRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeycloakRestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl KeycloakRestClient {
    /// Authenticate against `base_url` and return a ready-to-use client
    ///
    /// `base_url` is the server root including any context path (e.g. `https://sso.example.com/auth`).
    pub async fn connect(
        base_url: &str,
        credentials: &AdminCredentials,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeycloakError::Unreachable(format!("failed to build HTTP client: {e}")))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        let token = auth::request_admin_token(&http, &base_url, credentials).await?;
        debug!(base_url = %base_url, "Authenticated Keycloak admin session");
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn admin_url(&self, path: &str) -> String {
        format!("{}/admin/realms{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(KeycloakError::from_status(status.as_u16(), context, &body))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, context: &str) -> Result<T> {
        self.get_query(path, &[], context).await
    }

    async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        context: &str,
    ) -> Result<T> {
        let request = self.http.get(self.admin_url(path)).query(query);
        let response = self.send(request, context).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| KeycloakError::Decode(format!("{context}: {e}")))
    }

    async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        context: &str,
    ) -> Result<Option<T>> {
        match self.get_json(path, context).await {
            Ok(value) => Ok(Some(value)),
            Err(KeycloakError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B, context: &str) -> Result<()> {
        self.send(self.http.post(self.admin_url(path)).json(body), context)
            .await
            .map(drop)
    }

    async fn put_json<B: Serialize + ?Sized>(&self, path: &str, body: &B, context: &str) -> Result<()> {
        self.send(self.http.put(self.admin_url(path)).json(body), context)
            .await
            .map(drop)
    }

    async fn put_empty(&self, path: &str, context: &str) -> Result<()> {
        self.send(self.http.put(self.admin_url(path)), context)
            .await
            .map(drop)
    }

    /// DELETE that treats 404 as success
    async fn delete(&self, path: &str, context: &str) -> Result<()> {
        match self.send(self.http.delete(self.admin_url(path)), context).await {
            Ok(_) | Err(KeycloakError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn delete_json<B: Serialize + ?Sized>(&self, path: &str, body: &B, context: &str) -> Result<()> {
        self.send(self.http.delete(self.admin_url(path)).json(body), context)
            .await
            .map(drop)
    }

    async fn client_uuid(&self, realm: &str, client_id: &str) -> Result<Option<String>> {
        Ok(self.get_client(realm, client_id).await?.and_then(|c| c.id))
    }

    async fn user_id(&self, realm: &str, username: &str) -> Result<Option<String>> {
        Ok(self.get_user(realm, username).await?.and_then(|u| u.id))
    }
}

fn scope_mapping_path(realm: &str, client_uuid: &str, source: &ScopeMappingSource) -> String {
    match source {
        ScopeMappingSource::Realm => format!(
            "/{}/clients/{}/scope-mappings/realm",
            encode(realm),
            encode(client_uuid)
        ),
        ScopeMappingSource::Client(source_uuid) => format!(
            "/{}/clients/{}/scope-mappings/clients/{}",
            encode(realm),
            encode(client_uuid),
            encode(source_uuid)
        ),
    }
}

#[async_trait]
impl KeycloakAdmin for KeycloakRestClient {
    async fn ping(&self) -> Result<()> {
        let url = format!("{}/admin/serverinfo", self.base_url);
        self.send(self.http.get(url), "ping").await.map(drop)
    }

    async fn get_realm(&self, realm: &str) -> Result<Option<RealmRepresentation>> {
        self.get_optional(&format!("/{}", encode(realm)), "get realm")
            .await
    }

    async fn create_realm(&self, realm: &RealmRepresentation) -> Result<()> {
        self.post_json("", realm, "create realm").await
    }

    async fn update_realm(&self, realm: &RealmRepresentation) -> Result<()> {
        self.put_json(&format!("/{}", encode(&realm.realm)), realm, "update realm")
            .await
    }

    async fn delete_realm(&self, realm: &str) -> Result<()> {
        self.delete(&format!("/{}", encode(realm)), "delete realm").await
    }

    async fn list_realm_roles(&self, realm: &str) -> Result<Vec<RoleRepresentation>> {
        self.get_json(&format!("/{}/roles", encode(realm)), "list realm roles")
            .await
    }

    async fn get_client(
        &self,
        realm: &str,
        client_id: &str,
    ) -> Result<Option<ClientRepresentation>> {
        let clients: Vec<ClientRepresentation> = self
            .get_query(
                &format!("/{}/clients", encode(realm)),
                &[("clientId", client_id)],
                "get client",
            )
            .await?;
        Ok(clients.into_iter().find(|c| c.client_id == client_id))
    }

    async fn create_client(&self, realm: &str, client: &ClientRepresentation) -> Result<()> {
        self.post_json(&format!("/{}/clients", encode(realm)), client, "create client")
            .await
    }

    async fn update_client(&self, realm: &str, client: &ClientRepresentation) -> Result<()> {
        let id = match &client.id {
            Some(id) => id.clone(),
            None => self
                .client_uuid(realm, &client.client_id)
                .await?
                .ok_or_else(|| KeycloakError::NotFound(format!("client {}", client.client_id)))?,
        };
        self.put_json(
            &format!("/{}/clients/{}", encode(realm), encode(&id)),
            client,
            "update client",
        )
        .await
    }

    async fn delete_client(&self, realm: &str, client_id: &str) -> Result<()> {
        // A missing realm means the client is already gone
        match self.client_uuid(realm, client_id).await {
            Ok(Some(id)) => {
                self.delete(
                    &format!("/{}/clients/{}", encode(realm), encode(&id)),
                    "delete client",
                )
                .await
            }
            Ok(None) | Err(KeycloakError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn get_client_secret(&self, realm: &str, client_uuid: &str) -> Result<Option<String>> {
        let credential: Option<CredentialRepresentation> = self
            .get_optional(
                &format!("/{}/clients/{}/client-secret", encode(realm), encode(client_uuid)),
                "get client secret",
            )
            .await?;
        Ok(credential.and_then(|c| c.value))
    }

    async fn list_client_roles(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> Result<Vec<RoleRepresentation>> {
        self.get_json(
            &format!("/{}/clients/{}/roles", encode(realm), encode(client_uuid)),
            "list client roles",
        )
        .await
    }

    async fn create_client_role(
        &self,
        realm: &str,
        client_uuid: &str,
        role: &RoleRepresentation,
    ) -> Result<()> {
        self.post_json(
            &format!("/{}/clients/{}/roles", encode(realm), encode(client_uuid)),
            role,
            "create client role",
        )
        .await
    }

    async fn update_client_role(
        &self,
        realm: &str,
        client_uuid: &str,
        current_name: &str,
        role: &RoleRepresentation,
    ) -> Result<()> {
        let path = match &role.id {
            Some(id) => format!("/{}/roles-by-id/{}", encode(realm), encode(id)),
            None => format!(
                "/{}/clients/{}/roles/{}",
                encode(realm),
                encode(client_uuid),
                encode(current_name)
            ),
        };
        self.put_json(&path, role, "update client role").await
    }

    async fn delete_client_role(&self, realm: &str, client_uuid: &str, name: &str) -> Result<()> {
        self.delete(
            &format!(
                "/{}/clients/{}/roles/{}",
                encode(realm),
                encode(client_uuid),
                encode(name)
            ),
            "delete client role",
        )
        .await
    }

    async fn list_scope_mappings(
        &self,
        realm: &str,
        client_uuid: &str,
        source: &ScopeMappingSource,
    ) -> Result<Vec<RoleRepresentation>> {
        self.get_json(
            &scope_mapping_path(realm, client_uuid, source),
            "list scope mappings",
        )
        .await
    }

    async fn add_scope_mappings(
        &self,
        realm: &str,
        client_uuid: &str,
        source: &ScopeMappingSource,
        roles: &[RoleRepresentation],
    ) -> Result<()> {
        self.post_json(
            &scope_mapping_path(realm, client_uuid, source),
            roles,
            "add scope mappings",
        )
        .await
    }

    async fn remove_scope_mappings(
        &self,
        realm: &str,
        client_uuid: &str,
        source: &ScopeMappingSource,
        roles: &[RoleRepresentation],
    ) -> Result<()> {
        self.delete_json(
            &scope_mapping_path(realm, client_uuid, source),
            roles,
            "remove scope mappings",
        )
        .await
    }

    async fn list_client_scopes(&self, realm: &str) -> Result<Vec<ClientScopeRepresentation>> {
        self.get_json(&format!("/{}/client-scopes", encode(realm)), "list client scopes")
            .await
    }

    async fn list_assigned_client_scopes(
        &self,
        realm: &str,
        client_uuid: &str,
        kind: ClientScopeKind,
    ) -> Result<Vec<ClientScopeRepresentation>> {
        self.get_json(
            &format!(
                "/{}/clients/{}/{}",
                encode(realm),
                encode(client_uuid),
                kind.path()
            ),
            "list assigned client scopes",
        )
        .await
    }

    async fn assign_client_scope(
        &self,
        realm: &str,
        client_uuid: &str,
        kind: ClientScopeKind,
        scope_id: &str,
    ) -> Result<()> {
        self.put_empty(
            &format!(
                "/{}/clients/{}/{}/{}",
                encode(realm),
                encode(client_uuid),
                kind.path(),
                encode(scope_id)
            ),
            "assign client scope",
        )
        .await
    }

    async fn unassign_client_scope(
        &self,
        realm: &str,
        client_uuid: &str,
        kind: ClientScopeKind,
        scope_id: &str,
    ) -> Result<()> {
        self.delete(
            &format!(
                "/{}/clients/{}/{}/{}",
                encode(realm),
                encode(client_uuid),
                kind.path(),
                encode(scope_id)
            ),
            "unassign client scope",
        )
        .await
    }

    async fn get_user(&self, realm: &str, username: &str) -> Result<Option<UserRepresentation>> {
        let users: Vec<UserRepresentation> = self
            .get_query(
                &format!("/{}/users", encode(realm)),
                &[("username", username), ("exact", "true")],
                "get user",
            )
            .await?;
        // Keycloak stores usernames lower-cased
        Ok(users
            .into_iter()
            .find(|u| u.username.eq_ignore_ascii_case(username)))
    }

    async fn create_user(&self, realm: &str, user: &UserRepresentation) -> Result<()> {
        self.post_json(&format!("/{}/users", encode(realm)), user, "create user")
            .await
    }

    async fn update_user(&self, realm: &str, user: &UserRepresentation) -> Result<()> {
        let id = match &user.id {
            Some(id) => id.clone(),
            None => self
                .user_id(realm, &user.username)
                .await?
                .ok_or_else(|| KeycloakError::NotFound(format!("user {}", user.username)))?,
        };
        self.put_json(
            &format!("/{}/users/{}", encode(realm), encode(&id)),
            user,
            "update user",
        )
        .await
    }

    async fn delete_user(&self, realm: &str, username: &str) -> Result<()> {
        match self.user_id(realm, username).await {
            Ok(Some(id)) => {
                self.delete(
                    &format!("/{}/users/{}", encode(realm), encode(&id)),
                    "delete user",
                )
                .await
            }
            Ok(None) | Err(KeycloakError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn reset_user_password(
        &self,
        realm: &str,
        user_id: &str,
        credential: &CredentialRepresentation,
    ) -> Result<()> {
        self.put_json(
            &format!("/{}/users/{}/reset-password", encode(realm), encode(user_id)),
            credential,
            "reset user password",
        )
        .await
    }

    async fn list_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
    ) -> Result<Vec<RoleRepresentation>> {
        self.get_json(
            &format!("/{}/users/{}/role-mappings/realm", encode(realm), encode(user_id)),
            "list user realm roles",
        )
        .await
    }

    async fn add_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
        roles: &[RoleRepresentation],
    ) -> Result<()> {
        self.post_json(
            &format!("/{}/users/{}/role-mappings/realm", encode(realm), encode(user_id)),
            roles,
            "add user realm roles",
        )
        .await
    }

    async fn remove_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
        roles: &[RoleRepresentation],
    ) -> Result<()> {
        self.delete_json(
            &format!("/{}/users/{}/role-mappings/realm", encode(realm), encode(user_id)),
            roles,
            "remove user realm roles",
        )
        .await
    }

    async fn list_groups(&self, realm: &str) -> Result<Vec<GroupRepresentation>> {
        self.get_json(&format!("/{}/groups", encode(realm)), "list groups")
            .await
    }

    async fn list_user_groups(
        &self,
        realm: &str,
        user_id: &str,
    ) -> Result<Vec<GroupRepresentation>> {
        self.get_json(
            &format!("/{}/users/{}/groups", encode(realm), encode(user_id)),
            "list user groups",
        )
        .await
    }

    async fn add_user_to_group(&self, realm: &str, user_id: &str, group_id: &str) -> Result<()> {
        self.put_empty(
            &format!(
                "/{}/users/{}/groups/{}",
                encode(realm),
                encode(user_id),
                encode(group_id)
            ),
            "add user to group",
        )
        .await
    }

    async fn remove_user_from_group(
        &self,
        realm: &str,
        user_id: &str,
        group_id: &str,
    ) -> Result<()> {
        self.delete(
            &format!(
                "/{}/users/{}/groups/{}",
                encode(realm),
                encode(user_id),
                encode(group_id)
            ),
            "remove user from group",
        )
        .await
    }
}
