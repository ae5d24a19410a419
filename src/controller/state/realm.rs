//! Realm snapshot.

use crate::controller::reconciler::Result;
use crate::keycloak::{KeycloakAdmin, RealmRepresentation};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RealmState {
    /// `None` when the realm does not exist yet
    pub realm: Option<RealmRepresentation>,
}

impl RealmState {
    pub async fn read(admin: &dyn KeycloakAdmin, realm: &str) -> Result<Self> {
        Ok(Self {
            realm: admin.get_realm(realm).await?,
        })
    }
}
