//! In-memory backends for exercising plans and reconcile cycles without a
//! cluster or a Keycloak server.

use crate::cluster::{self, secret_value, EventSink, RecordStore, SecretStore};
use crate::config::ControllerConfig;
use crate::controller::plan::deletion_requested;
use crate::controller::reconciler::Reconciler;
use crate::crd::{Keycloak, KeycloakClient, KeycloakRealm, KeycloakUser, ResourceStatus, Selector};
use crate::keycloak::{
    AdminConnector, ClientRepresentation, ClientScopeKind, ClientScopeRepresentation,
    CredentialRepresentation, GroupRepresentation, KeycloakAdmin, KeycloakError,
    RealmRepresentation, Result, RoleRepresentation, ScopeMappingSource, UserRepresentation,
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ObjectReference, Secret};
use kube::runtime::events::EventType;
use kube::{Resource, ResourceExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct FakeRealm {
    representation: RealmRepresentation,
    roles: Vec<RoleRepresentation>,
    client_scopes: Vec<ClientScopeRepresentation>,
    groups: Vec<GroupRepresentation>,
    clients: Vec<FakeClient>,
    users: Vec<FakeUser>,
}

#[derive(Debug)]
struct FakeClient {
    client: ClientRepresentation,
    secret: String,
    roles: Vec<RoleRepresentation>,
    scope_mappings: BTreeMap<String, Vec<RoleRepresentation>>,
    default_scopes: Vec<String>,
    optional_scopes: Vec<String>,
}

impl FakeClient {
    fn scopes_mut(&mut self, kind: ClientScopeKind) -> &mut Vec<String> {
        match kind {
            ClientScopeKind::Default => &mut self.default_scopes,
            ClientScopeKind::Optional => &mut self.optional_scopes,
        }
    }
}

#[derive(Debug)]
struct FakeUser {
    user: UserRepresentation,
    password: Option<CredentialRepresentation>,
    realm_roles: Vec<RoleRepresentation>,
    groups: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    realms: BTreeMap<String, FakeRealm>,
    calls: Vec<String>,
    failures: BTreeSet<String>,
    next_id: u64,
}

fn not_found(what: String) -> KeycloakError {
    KeycloakError::NotFound(what)
}

fn source_key(source: &ScopeMappingSource) -> String {
    match source {
        ScopeMappingSource::Realm => "realm".to_string(),
        ScopeMappingSource::Client(uuid) => uuid.clone(),
    }
}

fn names(roles: &[RoleRepresentation]) -> String {
    roles
        .iter()
        .map(|r| r.name.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn same_role(a: &RoleRepresentation, b: &RoleRepresentation) -> bool {
    match (a.id.as_deref(), b.id.as_deref()) {
        (Some(x), Some(y)) if !x.is_empty() && !y.is_empty() => x == y,
        _ => a.name == b.name,
    }
}

impl State {
    fn check(&self, call: &str) -> Result<()> {
        if self.failures.contains(call) {
            return Err(KeycloakError::Api {
                status: 500,
                message: format!("injected failure on {call}"),
            });
        }
        Ok(())
    }

    fn generate_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn realm(&self, realm: &str) -> Result<&FakeRealm> {
        self.realms
            .get(realm)
            .ok_or_else(|| not_found(format!("realm {realm}")))
    }

    fn realm_mut(&mut self, realm: &str) -> Result<&mut FakeRealm> {
        self.realms
            .get_mut(realm)
            .ok_or_else(|| not_found(format!("realm {realm}")))
    }

    fn client(&self, realm: &str, uuid: &str) -> Result<&FakeClient> {
        self.realm(realm)?
            .clients
            .iter()
            .find(|c| c.client.id.as_deref() == Some(uuid))
            .ok_or_else(|| not_found(format!("client {uuid}")))
    }

    fn client_mut(&mut self, realm: &str, uuid: &str) -> Result<&mut FakeClient> {
        self.realm_mut(realm)?
            .clients
            .iter_mut()
            .find(|c| c.client.id.as_deref() == Some(uuid))
            .ok_or_else(|| not_found(format!("client {uuid}")))
    }

    fn user(&self, realm: &str, id: &str) -> Result<&FakeUser> {
        self.realm(realm)?
            .users
            .iter()
            .find(|u| u.user.id.as_deref() == Some(id))
            .ok_or_else(|| not_found(format!("user {id}")))
    }

    fn user_mut(&mut self, realm: &str, id: &str) -> Result<&mut FakeUser> {
        self.realm_mut(realm)?
            .users
            .iter_mut()
            .find(|u| u.user.id.as_deref() == Some(id))
            .ok_or_else(|| not_found(format!("user {id}")))
    }
}

/// In-memory Keycloak
///
/// Every successful mutating call (and `ping`) is recorded as `<operation>:<key>`.
/// Calls listed with [`FakeKeycloak::fail_on`] fail with a 500 and are not recorded.
#[derive(Debug, Default)]
pub struct FakeKeycloak {
    state: Mutex<State>,
}

impl FakeKeycloak {
    /// A Keycloak holding `realm` with the roles, client scopes and groups a fresh
    /// realm typically has
    pub fn with_realm(realm: &str) -> Self {
        let role = |name: &str| RoleRepresentation {
            id: Some(format!("role-{name}")),
            name: name.to_string(),
            ..Default::default()
        };
        let scope = |name: &str| ClientScopeRepresentation {
            id: Some(format!("scope-{name}")),
            name: name.to_string(),
            protocol: Some("openid-connect".to_string()),
            ..Default::default()
        };
        let seeded = FakeRealm {
            representation: RealmRepresentation {
                id: Some(format!("realm-{realm}")),
                realm: realm.to_string(),
                ..Default::default()
            },
            roles: vec![
                role("offline_access"),
                role("uma_authorization"),
                role(&format!("default-roles-{realm}")),
            ],
            client_scopes: vec![scope("profile"), scope("email"), scope("roles")],
            groups: vec![GroupRepresentation {
                id: Some("group-engineering".to_string()),
                name: "engineering".to_string(),
                path: Some("/engineering".to_string()),
                sub_groups: vec![GroupRepresentation {
                    id: Some("group-platform".to_string()),
                    name: "platform".to_string(),
                    path: Some("/engineering/platform".to_string()),
                    sub_groups: vec![],
                }],
            }],
            ..Default::default()
        };
        let keycloak = Self::default();
        keycloak.lock().realms.insert(realm.to_string(), seeded);
        keycloak
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn read<T>(&self, call: &str, f: impl FnOnce(&State) -> Result<T>) -> Result<T> {
        let state = self.lock();
        state.check(call)?;
        f(&state)
    }

    fn mutate<T>(&self, call: String, f: impl FnOnce(&mut State) -> Result<T>) -> Result<T> {
        let mut state = self.lock();
        state.check(&call)?;
        let value = f(&mut state)?;
        state.calls.push(call);
        Ok(value)
    }

    pub fn fail_on(&self, call: &str) {
        self.lock().failures.insert(call.to_string());
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Recorded calls, clearing the record
    pub fn take_calls(&self) -> Vec<String> {
        std::mem::take(&mut self.lock().calls)
    }

    pub fn add_realm_role(&self, realm: &str, name: &str) {
        let mut state = self.lock();
        if let Some(fake) = state.realms.get_mut(realm) {
            fake.roles.push(RoleRepresentation {
                id: Some(format!("role-{name}")),
                name: name.to_string(),
                ..Default::default()
            });
        }
    }

    pub fn has_realm(&self, realm: &str) -> bool {
        self.lock().realms.contains_key(realm)
    }

    pub fn client(&self, realm: &str, client_id: &str) -> Option<ClientRepresentation> {
        let state = self.lock();
        let fake = state.realms.get(realm)?;
        fake.clients
            .iter()
            .find(|c| c.client.client_id == client_id)
            .map(|c| c.client.clone())
    }

    pub fn client_role_names(&self, realm: &str, client_id: &str) -> Vec<String> {
        let state = self.lock();
        state
            .realms
            .get(realm)
            .and_then(|r| r.clients.iter().find(|c| c.client.client_id == client_id))
            .map(|c| c.roles.iter().map(|r| r.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Password last set for `username`
    pub fn password(&self, realm: &str, username: &str) -> Option<String> {
        let state = self.lock();
        state
            .realms
            .get(realm)?
            .users
            .iter()
            .find(|u| u.user.username == username)
            .and_then(|u| u.password.as_ref())
            .and_then(|c| c.value.clone())
    }

    /// Group paths `username` is a member of
    pub fn user_group_paths(&self, realm: &str, username: &str) -> Vec<String> {
        let state = self.lock();
        let Some(fake) = state.realms.get(realm) else {
            return Vec::new();
        };
        let Some(user) = fake.users.iter().find(|u| u.user.username == username) else {
            return Vec::new();
        };
        GroupRepresentation::flatten(&fake.groups)
            .into_iter()
            .filter(|g| g.id.as_ref().is_some_and(|id| user.groups.contains(id)))
            .filter_map(|g| g.path)
            .collect()
    }
}

#[async_trait]
impl KeycloakAdmin for FakeKeycloak {
    async fn ping(&self) -> Result<()> {
        self.mutate("ping".to_string(), |_| Ok(()))
    }

    async fn get_realm(&self, realm: &str) -> Result<Option<RealmRepresentation>> {
        self.read(&format!("get_realm:{realm}"), |state| {
            Ok(state.realms.get(realm).map(|r| r.representation.clone()))
        })
    }

    async fn create_realm(&self, realm: &RealmRepresentation) -> Result<()> {
        self.mutate(format!("create_realm:{}", realm.realm), |state| {
            if state.realms.contains_key(&realm.realm) {
                return Err(KeycloakError::Conflict(format!("realm {} exists", realm.realm)));
            }
            let id = realm.id.clone().unwrap_or_else(|| state.generate_id("realm"));
            state.realms.insert(
                realm.realm.clone(),
                FakeRealm {
                    representation: RealmRepresentation {
                        id: Some(id),
                        ..realm.clone()
                    },
                    ..Default::default()
                },
            );
            Ok(())
        })
    }

    async fn update_realm(&self, realm: &RealmRepresentation) -> Result<()> {
        self.mutate(format!("update_realm:{}", realm.realm), |state| {
            let fake = state.realm_mut(&realm.realm)?;
            fake.representation = RealmRepresentation {
                id: fake.representation.id.clone(),
                ..realm.clone()
            };
            Ok(())
        })
    }

    async fn delete_realm(&self, realm: &str) -> Result<()> {
        self.mutate(format!("delete_realm:{realm}"), |state| {
            state.realms.remove(realm);
            Ok(())
        })
    }

    async fn list_realm_roles(&self, realm: &str) -> Result<Vec<RoleRepresentation>> {
        self.read(&format!("list_realm_roles:{realm}"), |state| {
            Ok(state.realm(realm)?.roles.clone())
        })
    }

    async fn get_client(
        &self,
        realm: &str,
        client_id: &str,
    ) -> Result<Option<ClientRepresentation>> {
        self.read(&format!("get_client:{client_id}"), |state| {
            Ok(state
                .realm(realm)?
                .clients
                .iter()
                .find(|c| c.client.client_id == client_id)
                .map(|c| c.client.clone()))
        })
    }

    async fn create_client(&self, realm: &str, client: &ClientRepresentation) -> Result<()> {
        self.mutate(format!("create_client:{}", client.client_id), |state| {
            if state
                .realm(realm)?
                .clients
                .iter()
                .any(|c| c.client.client_id == client.client_id)
            {
                return Err(KeycloakError::Conflict(format!(
                    "client {} exists",
                    client.client_id
                )));
            }
            let id = client
                .id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| state.generate_id("client"));
            let secret = client
                .secret
                .clone()
                .unwrap_or_else(|| format!("generated-{id}"));
            state.realm_mut(realm)?.clients.push(FakeClient {
                client: ClientRepresentation {
                    id: Some(id),
                    secret: None,
                    ..client.clone()
                },
                secret,
                roles: Vec::new(),
                scope_mappings: BTreeMap::new(),
                default_scopes: Vec::new(),
                optional_scopes: Vec::new(),
            });
            Ok(())
        })
    }

    async fn update_client(&self, realm: &str, client: &ClientRepresentation) -> Result<()> {
        self.mutate(format!("update_client:{}", client.client_id), |state| {
            let fake = state
                .realm_mut(realm)?
                .clients
                .iter_mut()
                .find(|c| c.client.client_id == client.client_id)
                .ok_or_else(|| not_found(format!("client {}", client.client_id)))?;
            if let Some(secret) = &client.secret {
                fake.secret.clone_from(secret);
            }
            fake.client = ClientRepresentation {
                id: fake.client.id.clone(),
                secret: None,
                ..client.clone()
            };
            Ok(())
        })
    }

    async fn delete_client(&self, realm: &str, client_id: &str) -> Result<()> {
        self.mutate(format!("delete_client:{client_id}"), |state| {
            if let Some(fake) = state.realms.get_mut(realm) {
                fake.clients.retain(|c| c.client.client_id != client_id);
            }
            Ok(())
        })
    }

    async fn get_client_secret(&self, realm: &str, client_uuid: &str) -> Result<Option<String>> {
        self.read(&format!("get_client_secret:{client_uuid}"), |state| {
            Ok(state
                .realm(realm)?
                .clients
                .iter()
                .find(|c| c.client.id.as_deref() == Some(client_uuid))
                .map(|c| c.secret.clone()))
        })
    }

    async fn list_client_roles(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> Result<Vec<RoleRepresentation>> {
        self.read(&format!("list_client_roles:{client_uuid}"), |state| {
            Ok(state.client(realm, client_uuid)?.roles.clone())
        })
    }

    async fn create_client_role(
        &self,
        realm: &str,
        client_uuid: &str,
        role: &RoleRepresentation,
    ) -> Result<()> {
        self.mutate(format!("create_client_role:{}", role.name), |state| {
            let id = role
                .id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| state.generate_id("role"));
            let client = state.client_mut(realm, client_uuid)?;
            if client.roles.iter().any(|r| r.name == role.name) {
                return Err(KeycloakError::Conflict(format!("role {} exists", role.name)));
            }
            client.roles.push(RoleRepresentation {
                id: Some(id),
                ..role.clone()
            });
            Ok(())
        })
    }

    async fn update_client_role(
        &self,
        realm: &str,
        client_uuid: &str,
        current_name: &str,
        role: &RoleRepresentation,
    ) -> Result<()> {
        self.mutate(format!("update_client_role:{current_name}"), |state| {
            let client = state.client_mut(realm, client_uuid)?;
            let existing = client
                .roles
                .iter_mut()
                .find(|r| match role.id.as_deref().filter(|id| !id.is_empty()) {
                    Some(id) => r.id.as_deref() == Some(id),
                    None => r.name == current_name,
                })
                .ok_or_else(|| not_found(format!("role {current_name}")))?;
            *existing = RoleRepresentation {
                id: existing.id.clone(),
                ..role.clone()
            };
            Ok(())
        })
    }

    async fn delete_client_role(&self, realm: &str, client_uuid: &str, name: &str) -> Result<()> {
        self.mutate(format!("delete_client_role:{name}"), |state| {
            state
                .client_mut(realm, client_uuid)?
                .roles
                .retain(|r| r.name != name);
            Ok(())
        })
    }

    async fn list_scope_mappings(
        &self,
        realm: &str,
        client_uuid: &str,
        source: &ScopeMappingSource,
    ) -> Result<Vec<RoleRepresentation>> {
        self.read(&format!("list_scope_mappings:{client_uuid}"), |state| {
            Ok(state
                .client(realm, client_uuid)?
                .scope_mappings
                .get(&source_key(source))
                .cloned()
                .unwrap_or_default())
        })
    }

    async fn add_scope_mappings(
        &self,
        realm: &str,
        client_uuid: &str,
        source: &ScopeMappingSource,
        roles: &[RoleRepresentation],
    ) -> Result<()> {
        self.mutate(format!("add_scope_mappings:{}", names(roles)), |state| {
            let mapped = state
                .client_mut(realm, client_uuid)?
                .scope_mappings
                .entry(source_key(source))
                .or_default();
            for role in roles {
                if !mapped.iter().any(|m| same_role(m, role)) {
                    mapped.push(role.clone());
                }
            }
            Ok(())
        })
    }

    async fn remove_scope_mappings(
        &self,
        realm: &str,
        client_uuid: &str,
        source: &ScopeMappingSource,
        roles: &[RoleRepresentation],
    ) -> Result<()> {
        self.mutate(format!("remove_scope_mappings:{}", names(roles)), |state| {
            if let Some(mapped) = state
                .client_mut(realm, client_uuid)?
                .scope_mappings
                .get_mut(&source_key(source))
            {
                mapped.retain(|m| !roles.iter().any(|r| same_role(m, r)));
            }
            Ok(())
        })
    }

    async fn list_client_scopes(&self, realm: &str) -> Result<Vec<ClientScopeRepresentation>> {
        self.read(&format!("list_client_scopes:{realm}"), |state| {
            Ok(state.realm(realm)?.client_scopes.clone())
        })
    }

    async fn list_assigned_client_scopes(
        &self,
        realm: &str,
        client_uuid: &str,
        kind: ClientScopeKind,
    ) -> Result<Vec<ClientScopeRepresentation>> {
        self.read(&format!("list_assigned_client_scopes:{client_uuid}"), |state| {
            let client = state.client(realm, client_uuid)?;
            let assigned = match kind {
                ClientScopeKind::Default => &client.default_scopes,
                ClientScopeKind::Optional => &client.optional_scopes,
            };
            Ok(state
                .realm(realm)?
                .client_scopes
                .iter()
                .filter(|s| s.id.as_ref().is_some_and(|id| assigned.contains(id)))
                .cloned()
                .collect())
        })
    }

    async fn assign_client_scope(
        &self,
        realm: &str,
        client_uuid: &str,
        kind: ClientScopeKind,
        scope_id: &str,
    ) -> Result<()> {
        self.mutate(format!("assign_client_scope:{scope_id}"), |state| {
            if !state
                .realm(realm)?
                .client_scopes
                .iter()
                .any(|s| s.id.as_deref() == Some(scope_id))
            {
                return Err(not_found(format!("client scope {scope_id}")));
            }
            let assigned = state.client_mut(realm, client_uuid)?.scopes_mut(kind);
            if !assigned.iter().any(|id| id == scope_id) {
                assigned.push(scope_id.to_string());
            }
            Ok(())
        })
    }

    async fn unassign_client_scope(
        &self,
        realm: &str,
        client_uuid: &str,
        kind: ClientScopeKind,
        scope_id: &str,
    ) -> Result<()> {
        self.mutate(format!("unassign_client_scope:{scope_id}"), |state| {
            state
                .client_mut(realm, client_uuid)?
                .scopes_mut(kind)
                .retain(|id| id != scope_id);
            Ok(())
        })
    }

    async fn get_user(&self, realm: &str, username: &str) -> Result<Option<UserRepresentation>> {
        self.read(&format!("get_user:{username}"), |state| {
            Ok(state
                .realm(realm)?
                .users
                .iter()
                .find(|u| u.user.username.eq_ignore_ascii_case(username))
                .map(|u| u.user.clone()))
        })
    }

    async fn create_user(&self, realm: &str, user: &UserRepresentation) -> Result<()> {
        self.mutate(format!("create_user:{}", user.username), |state| {
            if state
                .realm(realm)?
                .users
                .iter()
                .any(|u| u.user.username == user.username)
            {
                return Err(KeycloakError::Conflict(format!("user {} exists", user.username)));
            }
            let id = user
                .id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| state.generate_id("user"));
            state.realm_mut(realm)?.users.push(FakeUser {
                user: UserRepresentation {
                    id: Some(id),
                    ..user.clone()
                },
                password: None,
                realm_roles: Vec::new(),
                groups: Vec::new(),
            });
            Ok(())
        })
    }

    async fn update_user(&self, realm: &str, user: &UserRepresentation) -> Result<()> {
        self.mutate(format!("update_user:{}", user.username), |state| {
            let fake = state
                .realm_mut(realm)?
                .users
                .iter_mut()
                .find(|u| u.user.username == user.username)
                .ok_or_else(|| not_found(format!("user {}", user.username)))?;
            fake.user = UserRepresentation {
                id: fake.user.id.clone(),
                ..user.clone()
            };
            Ok(())
        })
    }

    async fn delete_user(&self, realm: &str, username: &str) -> Result<()> {
        self.mutate(format!("delete_user:{username}"), |state| {
            if let Some(fake) = state.realms.get_mut(realm) {
                fake.users.retain(|u| u.user.username != username);
            }
            Ok(())
        })
    }

    async fn reset_user_password(
        &self,
        realm: &str,
        user_id: &str,
        credential: &CredentialRepresentation,
    ) -> Result<()> {
        self.mutate(format!("reset_user_password:{user_id}"), |state| {
            state.user_mut(realm, user_id)?.password = Some(credential.clone());
            Ok(())
        })
    }

    async fn list_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
    ) -> Result<Vec<RoleRepresentation>> {
        self.read(&format!("list_user_realm_roles:{user_id}"), |state| {
            Ok(state.user(realm, user_id)?.realm_roles.clone())
        })
    }

    async fn add_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
        roles: &[RoleRepresentation],
    ) -> Result<()> {
        self.mutate(format!("add_user_realm_roles:{}", names(roles)), |state| {
            let user = state.user_mut(realm, user_id)?;
            for role in roles {
                if !user.realm_roles.iter().any(|r| same_role(r, role)) {
                    user.realm_roles.push(role.clone());
                }
            }
            Ok(())
        })
    }

    async fn remove_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
        roles: &[RoleRepresentation],
    ) -> Result<()> {
        self.mutate(format!("remove_user_realm_roles:{}", names(roles)), |state| {
            state
                .user_mut(realm, user_id)?
                .realm_roles
                .retain(|r| !roles.iter().any(|role| same_role(r, role)));
            Ok(())
        })
    }

    async fn list_groups(&self, realm: &str) -> Result<Vec<GroupRepresentation>> {
        self.read(&format!("list_groups:{realm}"), |state| {
            Ok(state.realm(realm)?.groups.clone())
        })
    }

    async fn list_user_groups(
        &self,
        realm: &str,
        user_id: &str,
    ) -> Result<Vec<GroupRepresentation>> {
        self.read(&format!("list_user_groups:{user_id}"), |state| {
            let member_of = &state.user(realm, user_id)?.groups;
            Ok(GroupRepresentation::flatten(&state.realm(realm)?.groups)
                .into_iter()
                .filter(|g| g.id.as_ref().is_some_and(|id| member_of.contains(id)))
                .collect())
        })
    }

    async fn add_user_to_group(&self, realm: &str, user_id: &str, group_id: &str) -> Result<()> {
        self.mutate(format!("add_user_to_group:{group_id}"), |state| {
            let exists = GroupRepresentation::flatten(&state.realm(realm)?.groups)
                .iter()
                .any(|g| g.id.as_deref() == Some(group_id));
            if !exists {
                return Err(not_found(format!("group {group_id}")));
            }
            let user = state.user_mut(realm, user_id)?;
            if !user.groups.iter().any(|id| id == group_id) {
                user.groups.push(group_id.to_string());
            }
            Ok(())
        })
    }

    async fn remove_user_from_group(
        &self,
        realm: &str,
        user_id: &str,
        group_id: &str,
    ) -> Result<()> {
        self.mutate(format!("remove_user_from_group:{group_id}"), |state| {
            state
                .user_mut(realm, user_id)?
                .groups
                .retain(|id| id != group_id);
            Ok(())
        })
    }
}

/// Connector handing out in-memory Keycloaks by instance name
#[derive(Debug, Default)]
pub struct FakeConnector {
    instances: Mutex<BTreeMap<String, Arc<FakeKeycloak>>>,
}

impl FakeConnector {
    pub fn register(&self, instance: &str, keycloak: Arc<FakeKeycloak>) {
        self.instances
            .lock()
            .unwrap()
            .insert(instance.to_string(), keycloak);
    }
}

#[async_trait]
impl AdminConnector for FakeConnector {
    async fn connect(&self, instance: &Keycloak) -> Result<Arc<dyn KeycloakAdmin>> {
        let keycloak: Arc<dyn KeycloakAdmin> = self
            .instances
            .lock()
            .unwrap()
            .get(&instance.name_any())
            .cloned()
            .ok_or_else(|| KeycloakError::Unreachable(format!("no route to {}", instance.name_any())))?;
        Ok(keycloak)
    }
}

/// In-memory Secrets keyed by namespace and name
#[derive(Debug, Default)]
pub struct FakeSecrets {
    secrets: Mutex<BTreeMap<(String, String), Secret>>,
}

impl FakeSecrets {
    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn value(&self, namespace: &str, name: &str, key: &str) -> Option<String> {
        self.secret(namespace, name)
            .and_then(|secret| secret_value(&secret, key))
    }

    fn key(secret: &Secret) -> (String, String) {
        (
            secret.metadata.namespace.clone().unwrap_or_default(),
            secret.metadata.name.clone().unwrap_or_default(),
        )
    }
}

#[async_trait]
impl SecretStore for FakeSecrets {
    async fn get_secret(&self, namespace: &str, name: &str) -> cluster::Result<Option<Secret>> {
        Ok(self.secret(namespace, name))
    }

    async fn create_secret(&self, secret: &Secret) -> cluster::Result<()> {
        self.secrets
            .lock()
            .unwrap()
            .entry(Self::key(secret))
            .or_insert_with(|| secret.clone());
        Ok(())
    }

    async fn update_secret(&self, secret: &Secret) -> cluster::Result<()> {
        self.secrets
            .lock()
            .unwrap()
            .insert(Self::key(secret), secret.clone());
        Ok(())
    }
}

/// Records whose status the fake store can write
pub trait StatusRecord {
    fn set_status(&mut self, status: &ResourceStatus);
}

impl StatusRecord for Keycloak {
    fn set_status(&mut self, _status: &ResourceStatus) {}
}

impl StatusRecord for KeycloakRealm {
    fn set_status(&mut self, status: &ResourceStatus) {
        self.status = Some(status.clone());
    }
}

impl StatusRecord for KeycloakClient {
    fn set_status(&mut self, status: &ResourceStatus) {
        self.status = Some(status.clone());
    }
}

impl StatusRecord for KeycloakUser {
    fn set_status(&mut self, status: &ResourceStatus) {
        self.status = Some(status.clone());
    }
}

/// In-memory custom resources
///
/// Like the API server, a record marked for deletion disappears once its last
/// finalizer is removed.
#[derive(Debug)]
pub struct FakeRecords<K> {
    records: Mutex<BTreeMap<(String, String), K>>,
}

impl<K> Default for FakeRecords<K> {
    fn default() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
        }
    }
}

impl<K: Resource + Clone> FakeRecords<K> {
    fn key(record: &K) -> (String, String) {
        (record.namespace().unwrap_or_default(), record.name_any())
    }

    pub fn insert(&self, record: K) {
        self.records
            .lock()
            .unwrap()
            .insert(Self::key(&record), record);
    }

    pub fn record(&self, namespace: &str, name: &str) -> Option<K> {
        self.records
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn update(&self, namespace: &str, name: &str, f: impl FnOnce(&mut K)) {
        if let Some(record) = self
            .records
            .lock()
            .unwrap()
            .get_mut(&(namespace.to_string(), name.to_string()))
        {
            f(record);
        }
    }
}

#[async_trait]
impl<K> RecordStore<K> for FakeRecords<K>
where
    K: Resource + StatusRecord + Clone + Send + Sync + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> cluster::Result<Option<K>> {
        Ok(self.record(namespace, name))
    }

    async fn list(&self, namespace: &str, selector: &Selector) -> cluster::Result<Vec<K>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|((ns, _), record)| ns == namespace && selector.matches(record.labels()))
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn patch_status(&self, record: &K, status: &ResourceStatus) -> cluster::Result<()> {
        let (namespace, name) = Self::key(record);
        self.update(&namespace, &name, |stored| stored.set_status(status));
        Ok(())
    }

    async fn set_finalizers(&self, record: &K, finalizers: Vec<String>) -> cluster::Result<()> {
        let key = Self::key(record);
        let mut records = self.records.lock().unwrap();
        let Some(stored) = records.get_mut(&key) else {
            return Ok(());
        };
        if finalizers.is_empty() && deletion_requested(&*stored) {
            records.remove(&key);
        } else {
            stored.meta_mut().finalizers = Some(finalizers);
        }
        Ok(())
    }
}

/// Captured events as `(reason, message)`
#[derive(Debug, Default)]
pub struct FakeEvents {
    events: Mutex<Vec<(String, String)>>,
}

impl FakeEvents {
    pub fn events(&self) -> Vec<(String, String)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for FakeEvents {
    async fn publish(
        &self,
        _reference: &ObjectReference,
        _type_: EventType,
        reason: &str,
        message: &str,
    ) {
        self.events
            .lock()
            .unwrap()
            .push((reason.to_string(), message.to_string()));
    }
}

/// Every backend of a [`Reconciler`], kept around for assertions
#[derive(Debug, Default)]
pub struct TestContext {
    pub keycloaks: Arc<FakeRecords<Keycloak>>,
    pub realms: Arc<FakeRecords<KeycloakRealm>>,
    pub clients: Arc<FakeRecords<KeycloakClient>>,
    pub users: Arc<FakeRecords<KeycloakUser>>,
    pub secrets: Arc<FakeSecrets>,
    pub events: Arc<FakeEvents>,
    pub connector: Arc<FakeConnector>,
}

impl TestContext {
    pub fn reconciler(&self) -> Arc<Reconciler> {
        Arc::new(Reconciler {
            keycloaks: self.keycloaks.clone(),
            realms: self.realms.clone(),
            clients: self.clients.clone(),
            users: self.users.clone(),
            secrets: self.secrets.clone(),
            events: self.events.clone(),
            connector: self.connector.clone(),
            config: ControllerConfig::default(),
        })
    }
}
