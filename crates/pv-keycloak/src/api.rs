//! Identity-admin operations consumed by the provisioner.

use async_trait::async_trait;
use pv_core::{Lookup, ProvisionResult};

use crate::model::{
    ClientRepresentation, ClientSecret, ClientSpec, RealmRepresentation, RealmSpec,
    RoleRepresentation, RoleSpec, UserRepresentation, UserSpec,
};

/// The subset of the Keycloak admin API the provisioner uses.
///
/// Lookups return [`Lookup::NotFound`] only for the server's explicit
/// not-found signal. Permission, transport and server errors are `Err`.
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// Base URL of the server, used to derive public endpoint URLs.
    fn server_url(&self) -> &str;

    /// Gets a realm by name.
    async fn get_realm(&self, realm: &str) -> ProvisionResult<Lookup<RealmRepresentation>>;

    /// Creates a realm.
    async fn create_realm(&self, spec: &RealmSpec) -> ProvisionResult<()>;

    /// Finds a client by its client id.
    async fn find_client(
        &self,
        realm: &str,
        client_id: &str,
    ) -> ProvisionResult<Lookup<ClientRepresentation>>;

    /// Creates a client.
    async fn create_client(&self, realm: &str, spec: &ClientSpec) -> ProvisionResult<()>;

    /// Gets the secret of a confidential client.
    async fn client_secret(&self, realm: &str, client_uuid: &str) -> ProvisionResult<ClientSecret>;

    /// Gets a client role by name.
    async fn get_client_role(
        &self,
        realm: &str,
        client_uuid: &str,
        role: &str,
    ) -> ProvisionResult<Lookup<RoleRepresentation>>;

    /// Lists the roles of a client.
    async fn list_client_roles(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> ProvisionResult<Vec<RoleRepresentation>>;

    /// Creates a client role.
    async fn create_client_role(
        &self,
        realm: &str,
        client_uuid: &str,
        spec: &RoleSpec,
    ) -> ProvisionResult<()>;

    /// Finds a user by exact username.
    async fn find_user(&self, realm: &str, username: &str)
        -> ProvisionResult<Lookup<UserRepresentation>>;

    /// Creates a user.
    async fn create_user(&self, realm: &str, spec: &UserSpec) -> ProvisionResult<()>;

    /// Lists the client roles mapped to a user.
    async fn client_role_mappings(
        &self,
        realm: &str,
        user_id: &str,
        client_uuid: &str,
    ) -> ProvisionResult<Vec<RoleRepresentation>>;

    /// Maps client roles to a user.
    async fn assign_client_roles(
        &self,
        realm: &str,
        user_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> ProvisionResult<()>;
}
