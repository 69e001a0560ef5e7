//! In-memory admin API with failure injection, for driver tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use pv_core::{Lookup, ProvisionError, ProvisionResult};

use crate::api::AdminApi;
use crate::model::{
    ClientRepresentation, ClientSecret, ClientSpec, RealmRepresentation, RealmSpec,
    RoleRepresentation, RoleSpec, UserRepresentation, UserSpec,
};

/// Server-side state, comparable between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    pub realms: BTreeMap<String, RealmRepresentation>,
    /// (realm, client id) -> client
    pub clients: BTreeMap<(String, String), ClientRepresentation>,
    /// (client uuid, role name) -> role
    pub roles: BTreeMap<(String, String), RoleRepresentation>,
    /// (realm, username) -> user
    pub users: BTreeMap<(String, String), UserRepresentation>,
    /// (user id, client uuid, role name)
    pub mappings: BTreeSet<(String, String, String)>,
}

#[derive(Default)]
struct Faults {
    realm_lookup: Option<u16>,
    secret_read: Option<u16>,
    role_create: BTreeMap<String, u16>,
}

pub struct InMemoryAdminApi {
    server_url: String,
    state: Mutex<State>,
    creates: Mutex<Vec<String>>,
    faults: Mutex<Faults>,
    next_id: Mutex<u32>,
}

fn api_error(status: u16) -> ProvisionError {
    ProvisionError::Api {
        status,
        message: format!("injected {status}"),
    }
}

impl InMemoryAdminApi {
    pub fn new(server_url: &str) -> Self {
        Self {
            server_url: server_url.to_string(),
            state: Mutex::new(State::default()),
            creates: Mutex::new(Vec::new()),
            faults: Mutex::new(Faults::default()),
            next_id: Mutex::new(0),
        }
    }

    pub fn snapshot(&self) -> State {
        self.state.lock().unwrap().clone()
    }

    pub fn creates(&self) -> Vec<String> {
        self.creates.lock().unwrap().clone()
    }

    pub fn fail_realm_lookups(&self, status: u16) {
        self.faults.lock().unwrap().realm_lookup = Some(status);
    }

    pub fn fail_secret_reads(&self, status: u16) {
        self.faults.lock().unwrap().secret_read = Some(status);
    }

    pub fn fail_role_creation(&self, role: &str, status: u16) {
        self.faults
            .lock()
            .unwrap()
            .role_create
            .insert(role.to_string(), status);
    }

    fn id(&self, prefix: &str) -> String {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        format!("{prefix}-{next}")
    }

    fn log_create(&self, what: String) {
        self.creates.lock().unwrap().push(what);
    }

    fn conflict(kind: &str, name: &str) -> ProvisionError {
        ProvisionError::Api {
            status: 409,
            message: format!("{kind} {name} already exists"),
        }
    }

    fn require_realm(&self, realm: &str) -> ProvisionResult<()> {
        if self.state.lock().unwrap().realms.contains_key(realm) {
            Ok(())
        } else {
            Err(ProvisionError::not_found("realm", realm))
        }
    }
}

#[async_trait]
impl AdminApi for InMemoryAdminApi {
    fn server_url(&self) -> &str {
        &self.server_url
    }

    async fn get_realm(&self, realm: &str) -> ProvisionResult<Lookup<RealmRepresentation>> {
        if let Some(status) = self.faults.lock().unwrap().realm_lookup {
            return Err(api_error(status));
        }
        Ok(self.state.lock().unwrap().realms.get(realm).cloned().into())
    }

    async fn create_realm(&self, spec: &RealmSpec) -> ProvisionResult<()> {
        if self.state.lock().unwrap().realms.contains_key(&spec.realm) {
            return Err(Self::conflict("realm", &spec.realm));
        }
        let realm = RealmRepresentation {
            id: Some(self.id("realm")),
            realm: spec.realm.clone(),
            display_name: spec.display_name.clone(),
            enabled: spec.enabled,
        };
        self.state
            .lock()
            .unwrap()
            .realms
            .insert(spec.realm.clone(), realm);
        self.log_create(format!("realm {}", spec.realm));
        Ok(())
    }

    async fn find_client(
        &self,
        realm: &str,
        client_id: &str,
    ) -> ProvisionResult<Lookup<ClientRepresentation>> {
        self.require_realm(realm)?;
        let key = (realm.to_string(), client_id.to_string());
        Ok(self.state.lock().unwrap().clients.get(&key).cloned().into())
    }

    async fn create_client(&self, realm: &str, spec: &ClientSpec) -> ProvisionResult<()> {
        self.require_realm(realm)?;
        let key = (realm.to_string(), spec.client_id.clone());
        if self.state.lock().unwrap().clients.contains_key(&key) {
            return Err(Self::conflict("client", &spec.client_id));
        }
        let client = ClientRepresentation {
            id: self.id("client"),
            client_id: spec.client_id.clone(),
            name: spec.name.clone(),
            enabled: spec.enabled,
            public_client: spec.public_client,
        };
        self.state.lock().unwrap().clients.insert(key, client);
        self.log_create(format!("client {}", spec.client_id));
        Ok(())
    }

    async fn client_secret(&self, _realm: &str, client_uuid: &str) -> ProvisionResult<ClientSecret> {
        if let Some(status) = self.faults.lock().unwrap().secret_read {
            return Err(api_error(status));
        }
        Ok(ClientSecret {
            kind: Some("secret".to_string()),
            value: Some(format!("secret-of-{client_uuid}")),
        })
    }

    async fn get_client_role(
        &self,
        _realm: &str,
        client_uuid: &str,
        role: &str,
    ) -> ProvisionResult<Lookup<RoleRepresentation>> {
        let key = (client_uuid.to_string(), role.to_string());
        Ok(self.state.lock().unwrap().roles.get(&key).cloned().into())
    }

    async fn list_client_roles(
        &self,
        _realm: &str,
        client_uuid: &str,
    ) -> ProvisionResult<Vec<RoleRepresentation>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .roles
            .iter()
            .filter(|((owner, _), _)| owner == client_uuid)
            .map(|(_, role)| role.clone())
            .collect())
    }

    async fn create_client_role(
        &self,
        _realm: &str,
        client_uuid: &str,
        spec: &RoleSpec,
    ) -> ProvisionResult<()> {
        if let Some(status) = self.faults.lock().unwrap().role_create.get(&spec.name) {
            return Err(api_error(*status));
        }
        let key = (client_uuid.to_string(), spec.name.clone());
        if self.state.lock().unwrap().roles.contains_key(&key) {
            return Err(Self::conflict("role", &spec.name));
        }
        let role = RoleRepresentation {
            id: Some(self.id("role")),
            name: spec.name.clone(),
            description: spec.description.clone(),
            composite: spec.composite,
            client_role: true,
            container_id: Some(client_uuid.to_string()),
        };
        self.state.lock().unwrap().roles.insert(key, role);
        self.log_create(format!("role {}", spec.name));
        Ok(())
    }

    async fn find_user(
        &self,
        realm: &str,
        username: &str,
    ) -> ProvisionResult<Lookup<UserRepresentation>> {
        self.require_realm(realm)?;
        let key = (realm.to_string(), username.to_string());
        Ok(self.state.lock().unwrap().users.get(&key).cloned().into())
    }

    async fn create_user(&self, realm: &str, spec: &UserSpec) -> ProvisionResult<()> {
        self.require_realm(realm)?;
        let key = (realm.to_string(), spec.username.clone());
        if self.state.lock().unwrap().users.contains_key(&key) {
            return Err(Self::conflict("user", &spec.username));
        }
        let user = UserRepresentation {
            id: self.id("user"),
            username: spec.username.clone(),
            email: spec.email.clone(),
            enabled: spec.enabled,
        };
        self.state.lock().unwrap().users.insert(key, user);
        self.log_create(format!("user {}", spec.username));
        Ok(())
    }

    async fn client_role_mappings(
        &self,
        _realm: &str,
        user_id: &str,
        client_uuid: &str,
    ) -> ProvisionResult<Vec<RoleRepresentation>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .mappings
            .iter()
            .filter(|(u, c, _)| u == user_id && c == client_uuid)
            .filter_map(|(_, c, name)| state.roles.get(&(c.clone(), name.clone())).cloned())
            .collect())
    }

    async fn assign_client_roles(
        &self,
        _realm: &str,
        user_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> ProvisionResult<()> {
        let username = {
            let state = self.state.lock().unwrap();
            state
                .users
                .values()
                .find(|u| u.id == user_id)
                .map(|u| u.username.clone())
                .ok_or_else(|| ProvisionError::not_found("user", user_id))?
        };
        for role in roles {
            self.state.lock().unwrap().mappings.insert((
                user_id.to_string(),
                client_uuid.to_string(),
                role.name.clone(),
            ));
            self.log_create(format!("grant {username} {}", role.name));
        }
        Ok(())
    }
}
