//! Keycloak entities as idempotently creatable resources.

use async_trait::async_trait;
use pv_core::{Lookup, ProvisionResult, Resource};

use crate::api::AdminApi;
use crate::model::{
    ClientRepresentation, ClientSpec, RealmRepresentation, RealmSpec, RoleRepresentation,
    RoleSpec, UserRepresentation, UserSpec,
};

/// A realm, unique on the server.
pub struct RealmResource<'a> {
    api: &'a dyn AdminApi,
    spec: RealmSpec,
}

impl<'a> RealmResource<'a> {
    /// Creates the resource.
    pub fn new(api: &'a dyn AdminApi, spec: RealmSpec) -> Self {
        Self { api, spec }
    }
}

#[async_trait]
impl<'a> Resource for RealmResource<'a> {
    type Entity = RealmRepresentation;

    fn kind(&self) -> &'static str {
        "realm"
    }

    fn name(&self) -> &str {
        &self.spec.realm
    }

    async fn lookup(&self) -> ProvisionResult<Lookup<RealmRepresentation>> {
        self.api.get_realm(&self.spec.realm).await
    }

    async fn create(&self) -> ProvisionResult<()> {
        self.api.create_realm(&self.spec).await
    }
}

/// A client, unique within its realm.
pub struct ClientResource<'a> {
    api: &'a dyn AdminApi,
    realm: String,
    spec: ClientSpec,
}

impl<'a> ClientResource<'a> {
    /// Creates the resource.
    pub fn new(api: &'a dyn AdminApi, realm: impl Into<String>, spec: ClientSpec) -> Self {
        Self {
            api,
            realm: realm.into(),
            spec,
        }
    }
}

#[async_trait]
impl<'a> Resource for ClientResource<'a> {
    type Entity = ClientRepresentation;

    fn kind(&self) -> &'static str {
        "client"
    }

    fn name(&self) -> &str {
        &self.spec.client_id
    }

    async fn lookup(&self) -> ProvisionResult<Lookup<ClientRepresentation>> {
        self.api.find_client(&self.realm, &self.spec.client_id).await
    }

    async fn create(&self) -> ProvisionResult<()> {
        self.api.create_client(&self.realm, &self.spec).await
    }
}

/// A role scoped to one client, addressed by the client's internal id.
pub struct ClientRoleResource<'a> {
    api: &'a dyn AdminApi,
    realm: String,
    client_uuid: String,
    spec: RoleSpec,
}

impl<'a> ClientRoleResource<'a> {
    /// Creates the resource. `client_uuid` must belong to a confirmed client.
    pub fn new(
        api: &'a dyn AdminApi,
        realm: impl Into<String>,
        client_uuid: impl Into<String>,
        spec: RoleSpec,
    ) -> Self {
        Self {
            api,
            realm: realm.into(),
            client_uuid: client_uuid.into(),
            spec,
        }
    }
}

#[async_trait]
impl<'a> Resource for ClientRoleResource<'a> {
    type Entity = RoleRepresentation;

    fn kind(&self) -> &'static str {
        "client role"
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    async fn lookup(&self) -> ProvisionResult<Lookup<RoleRepresentation>> {
        self.api
            .get_client_role(&self.realm, &self.client_uuid, &self.spec.name)
            .await
    }

    async fn create(&self) -> ProvisionResult<()> {
        self.api
            .create_client_role(&self.realm, &self.client_uuid, &self.spec)
            .await
    }
}

/// A user, unique by username within its realm.
pub struct UserResource<'a> {
    api: &'a dyn AdminApi,
    realm: String,
    spec: UserSpec,
}

impl<'a> UserResource<'a> {
    /// Creates the resource.
    pub fn new(api: &'a dyn AdminApi, realm: impl Into<String>, spec: UserSpec) -> Self {
        Self {
            api,
            realm: realm.into(),
            spec,
        }
    }
}

#[async_trait]
impl<'a> Resource for UserResource<'a> {
    type Entity = UserRepresentation;

    fn kind(&self) -> &'static str {
        "user"
    }

    fn name(&self) -> &str {
        &self.spec.username
    }

    async fn lookup(&self) -> ProvisionResult<Lookup<UserRepresentation>> {
        self.api.find_user(&self.realm, &self.spec.username).await
    }

    async fn create(&self) -> ProvisionResult<()> {
        self.api.create_user(&self.realm, &self.spec).await
    }
}

/// A client role mapped to a user.
pub struct ClientRoleGrant<'a> {
    api: &'a dyn AdminApi,
    realm: String,
    user_id: String,
    client_uuid: String,
    role: RoleRepresentation,
    label: String,
}

impl<'a> ClientRoleGrant<'a> {
    /// Creates the resource for `user` and an existing client `role`.
    pub fn new(
        api: &'a dyn AdminApi,
        realm: impl Into<String>,
        user: &UserRepresentation,
        client_uuid: impl Into<String>,
        role: RoleRepresentation,
    ) -> Self {
        let label = format!("{} -> {}", user.username, role.name);
        Self {
            api,
            realm: realm.into(),
            user_id: user.id.clone(),
            client_uuid: client_uuid.into(),
            role,
            label,
        }
    }
}

#[async_trait]
impl<'a> Resource for ClientRoleGrant<'a> {
    type Entity = RoleRepresentation;

    fn kind(&self) -> &'static str {
        "role grant"
    }

    fn name(&self) -> &str {
        &self.label
    }

    async fn lookup(&self) -> ProvisionResult<Lookup<RoleRepresentation>> {
        let mapped = self
            .api
            .client_role_mappings(&self.realm, &self.user_id, &self.client_uuid)
            .await?;
        Ok(mapped.into_iter().find(|r| r.name == self.role.name).into())
    }

    async fn create(&self) -> ProvisionResult<()> {
        self.api
            .assign_client_roles(
                &self.realm,
                &self.user_id,
                &self.client_uuid,
                std::slice::from_ref(&self.role),
            )
            .await
    }
}
