//! REST adapter for the Keycloak admin API.

use async_trait::async_trait;
use pv_core::{Connector, Credential, Lookup, ProvisionResult};
use urlencoding::encode;

use crate::api::AdminApi;
use crate::auth::AdminTokenSource;
use crate::model::{
    ClientRepresentation, ClientSecret, ClientSpec, RealmRepresentation, RealmSpec,
    RoleRepresentation, RoleSpec, UserRepresentation, UserSpec,
};

/// Admin API client talking to a live server.
pub struct RestAdminApi {
    connector: Connector,
}

impl RestAdminApi {
    /// Connects to `server_url` with the given credential.
    ///
    /// The credential is validated here; the first token is requested with
    /// the first admin call.
    pub fn connect(server_url: &str, credential: &Credential) -> ProvisionResult<Self> {
        let http = reqwest::Client::new();
        let tokens = AdminTokenSource::new(server_url, credential, http.clone())?.shared();
        let connector = Connector::with_client(server_url, tokens, http)?;
        tracing::debug!(
            server = connector.base_url(),
            strategy = credential.strategy(),
            "identity admin connector ready"
        );
        Ok(Self { connector })
    }

    /// Wraps an existing connector.
    pub fn with_connector(connector: Connector) -> Self {
        Self { connector }
    }

    fn realm_path(realm: &str) -> String {
        format!("/admin/realms/{}", encode(realm))
    }

    fn client_path(realm: &str, client_uuid: &str) -> String {
        format!("{}/clients/{}", Self::realm_path(realm), encode(client_uuid))
    }

    fn user_client_mappings_path(realm: &str, user_id: &str, client_uuid: &str) -> String {
        format!(
            "{}/users/{}/role-mappings/clients/{}",
            Self::realm_path(realm),
            encode(user_id),
            encode(client_uuid)
        )
    }
}

#[async_trait]
impl AdminApi for RestAdminApi {
    fn server_url(&self) -> &str {
        self.connector.base_url()
    }

    async fn get_realm(&self, realm: &str) -> ProvisionResult<Lookup<RealmRepresentation>> {
        self.connector.get_optional(&Self::realm_path(realm)).await
    }

    async fn create_realm(&self, spec: &RealmSpec) -> ProvisionResult<()> {
        self.connector.post_json("/admin/realms", spec).await
    }

    async fn find_client(
        &self,
        realm: &str,
        client_id: &str,
    ) -> ProvisionResult<Lookup<ClientRepresentation>> {
        // The search endpoint answers an empty list for an absent client; a
        // 404 here means the realm itself is missing and must surface.
        let clients: Vec<ClientRepresentation> = self
            .connector
            .get(&format!(
                "{}/clients?clientId={}",
                Self::realm_path(realm),
                encode(client_id)
            ))
            .await?;

        Ok(clients
            .into_iter()
            .find(|c| c.client_id == client_id)
            .into())
    }

    async fn create_client(&self, realm: &str, spec: &ClientSpec) -> ProvisionResult<()> {
        let id = self
            .connector
            .post_json_for_location(&format!("{}/clients", Self::realm_path(realm)), spec)
            .await?;
        tracing::debug!(client_id = %spec.client_id, internal_id = ?id, "client registered");
        Ok(())
    }

    async fn client_secret(&self, realm: &str, client_uuid: &str) -> ProvisionResult<ClientSecret> {
        self.connector
            .get(&format!("{}/client-secret", Self::client_path(realm, client_uuid)))
            .await
    }

    async fn get_client_role(
        &self,
        realm: &str,
        client_uuid: &str,
        role: &str,
    ) -> ProvisionResult<Lookup<RoleRepresentation>> {
        self.connector
            .get_optional(&format!(
                "{}/roles/{}",
                Self::client_path(realm, client_uuid),
                encode(role)
            ))
            .await
    }

    async fn list_client_roles(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> ProvisionResult<Vec<RoleRepresentation>> {
        self.connector
            .get(&format!("{}/roles", Self::client_path(realm, client_uuid)))
            .await
    }

    async fn create_client_role(
        &self,
        realm: &str,
        client_uuid: &str,
        spec: &RoleSpec,
    ) -> ProvisionResult<()> {
        self.connector
            .post_json(&format!("{}/roles", Self::client_path(realm, client_uuid)), spec)
            .await
    }

    async fn find_user(
        &self,
        realm: &str,
        username: &str,
    ) -> ProvisionResult<Lookup<UserRepresentation>> {
        let users: Vec<UserRepresentation> = self
            .connector
            .get(&format!(
                "{}/users?username={}&exact=true",
                Self::realm_path(realm),
                encode(username)
            ))
            .await?;

        Ok(users
            .into_iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .into())
    }

    async fn create_user(&self, realm: &str, spec: &UserSpec) -> ProvisionResult<()> {
        self.connector
            .post_json(&format!("{}/users", Self::realm_path(realm)), spec)
            .await
    }

    async fn client_role_mappings(
        &self,
        realm: &str,
        user_id: &str,
        client_uuid: &str,
    ) -> ProvisionResult<Vec<RoleRepresentation>> {
        self.connector
            .get(&Self::user_client_mappings_path(realm, user_id, client_uuid))
            .await
    }

    async fn assign_client_roles(
        &self,
        realm: &str,
        user_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> ProvisionResult<()> {
        self.connector
            .post_json(
                &Self::user_client_mappings_path(realm, user_id, client_uuid),
                roles,
            )
            .await
    }
}
