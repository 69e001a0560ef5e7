//! Ordered provisioning plan and its driver.
//!
//! The driver runs realm → client → client roles → secret fetch → users →
//! role grants. A child step only runs once its parent is confirmed to
//! exist. Nothing is rolled back: when a step fails, everything created
//! before it stays, and the report says so step by step.

use std::collections::HashMap;

use pv_core::{
    ensure, ensure_each, ensure_each_concurrent, FailurePolicy, Lookup, StepLog, StepStatus,
};

use crate::api::AdminApi;
use crate::model::{
    ClientRepresentation, ClientSpec, RealmSpec, RoleRepresentation, RoleSpec, UserSpec,
};
use crate::report::ProvisionReport;
use crate::resources::{
    ClientResource, ClientRoleGrant, ClientRoleResource, RealmResource, UserResource,
};

/// Default realm name.
pub const DEFAULT_REALM: &str = "calendar";
/// Default client id.
pub const DEFAULT_CLIENT_ID: &str = "calendar-app";
/// Default client roles, in creation order.
pub const DEFAULT_ROLES: [&str; 3] = ["reader", "writer", "owner"];
/// Origins allowed to use the default client.
pub const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:8000"];

/// A user to seed, with the client roles to grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSeed {
    /// User to create.
    pub user: UserSpec,
    /// Client role names to grant, in order.
    pub grants: Vec<String>,
}

impl UserSeed {
    /// The development test user: `testuser` / `testpass`, granted `owner`.
    pub fn test_user() -> Self {
        Self {
            user: UserSpec::new("testuser")
                .with_email("test@example.com")
                .with_password("testpass"),
            grants: vec!["owner".to_string()],
        }
    }
}

/// What to provision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionPlan {
    /// Realm to ensure.
    pub realm: RealmSpec,
    /// Client to ensure inside the realm.
    pub client: ClientSpec,
    /// Client roles to ensure, in order.
    pub roles: Vec<RoleSpec>,
    /// Users to seed after the roles.
    pub users: Vec<UserSeed>,
    /// Behaviour after a sibling step fails.
    pub policy: FailurePolicy,
    /// Ensure client roles concurrently.
    pub concurrent_roles: bool,
}

impl ProvisionPlan {
    /// Creates a plan with no roles or users.
    pub fn new(realm: RealmSpec, client: ClientSpec) -> Self {
        Self {
            realm,
            client,
            roles: Vec::new(),
            users: Vec::new(),
            policy: FailurePolicy::default(),
            concurrent_roles: false,
        }
    }

    /// The calendar application: realm `calendar`, confidential client
    /// `calendar-app`, roles `reader`, `writer` and `owner`.
    pub fn calendar() -> Self {
        Self::for_application(DEFAULT_REALM, DEFAULT_CLIENT_ID, DEFAULT_ROLES)
    }

    /// Builds an application plan with the calendar defaults under other names.
    pub fn for_application<I, S>(realm: &str, client_id: &str, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let display = format!("{} Application", capitalize(realm));
        let client = DEFAULT_ORIGINS.iter().fold(
            ClientSpec::confidential(client_id)
                .with_name(display.clone())
                .with_description(format!("{} application client", capitalize(realm))),
            |spec, origin| spec.with_origin(origin),
        );

        Self::new(RealmSpec::for_application(realm, display), client).with_roles(roles)
    }

    /// Appends client roles described as "<Realm> <role> role".
    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefix = capitalize(&self.realm.realm);
        self.roles.extend(roles.into_iter().map(|name| {
            let name = name.into();
            let description = format!("{prefix} {name} role");
            RoleSpec::client_role(name, Some(description))
        }));
        self
    }

    /// Appends a user to seed.
    #[must_use]
    pub fn with_user(mut self, seed: UserSeed) -> Self {
        self.users.push(seed);
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Ensures client roles concurrently.
    #[must_use]
    pub fn with_concurrent_roles(mut self, concurrent: bool) -> Self {
        self.concurrent_roles = concurrent;
        self
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Executes provisioning plans against an admin API.
pub struct Provisioner<'a> {
    api: &'a dyn AdminApi,
}

impl<'a> Provisioner<'a> {
    /// Creates a provisioner.
    pub fn new(api: &'a dyn AdminApi) -> Self {
        Self { api }
    }

    /// Runs `plan`. Failures are recorded in the report, never returned.
    pub async fn run(&self, plan: &ProvisionPlan) -> ProvisionReport {
        let realm = plan.realm.realm.as_str();
        let mut report = ProvisionReport::new(self.api.server_url(), realm, &plan.client.client_id);
        let log = &mut report.steps;

        tracing::info!(server = self.api.server_url(), realm, "provisioning realm");

        let realm_resource = RealmResource::new(self.api, plan.realm.clone());
        if log
            .record_outcome("realm", realm, ensure(&realm_resource).await)
            .is_none()
        {
            skip_dependents(log, plan, true);
            return report;
        }

        let client_resource = ClientResource::new(self.api, realm, plan.client.clone());
        let client = match log.record_outcome(
            "client",
            &plan.client.client_id,
            ensure(&client_resource).await,
        ) {
            Some(ensured) => {
                report.client_created = ensured.was_created();
                ensured.into_entity()
            }
            None => {
                skip_dependents(log, plan, false);
                return report;
            }
        };
        report.client_internal_id = Some(client.id.clone());

        let role_resources: Vec<ClientRoleResource<'_>> = plan
            .roles
            .iter()
            .map(|spec| ClientRoleResource::new(self.api, realm, &client.id, spec.clone()))
            .collect();
        let ensured_roles = if plan.concurrent_roles {
            ensure_each_concurrent(&role_resources, log).await
        } else {
            ensure_each(&role_resources, plan.policy, log).await
        };
        let ensured_roles: Vec<RoleRepresentation> = ensured_roles
            .into_iter()
            .flatten()
            .map(|r| r.into_entity())
            .collect();
        report.roles = ensured_roles.iter().map(|r| r.name.clone()).collect();
        let mut roles: HashMap<String, RoleRepresentation> = ensured_roles
            .into_iter()
            .map(|role| (role.name.clone(), role))
            .collect();

        if !client.public_client {
            report.client_secret = match self.api.client_secret(realm, &client.id).await {
                Ok(secret) => secret.value,
                Err(err) => {
                    tracing::warn!(client_id = %client.client_id, error = %err, "could not fetch client secret");
                    None
                }
            };
        }

        report.users = self
            .seed_users(realm, &client, &plan.users, plan.policy, &mut roles, log)
            .await;

        report
    }

    /// Seeds users into an existing realm and client, granting their client
    /// roles. Neither the realm nor the client is created.
    pub async fn seed(
        &self,
        realm: &str,
        client_id: &str,
        seeds: &[UserSeed],
        policy: FailurePolicy,
    ) -> ProvisionReport {
        let mut report = ProvisionReport::new(self.api.server_url(), realm, client_id);
        let log = &mut report.steps;

        let failure = match self.api.find_client(realm, client_id).await {
            Ok(Lookup::Found(client)) => {
                log.record("client", client_id, StepStatus::Existing);
                report.client_internal_id = Some(client.id.clone());
                report.users = self
                    .seed_users(realm, &client, seeds, policy, &mut HashMap::new(), log)
                    .await;
                return report;
            }
            Ok(Lookup::NotFound) => format!("client '{client_id}' not found in realm '{realm}'"),
            Err(err) => err.to_string(),
        };

        log.record("client", client_id, StepStatus::Failed(failure));
        for seed in seeds {
            skip_user(log, seed);
        }
        report
    }

    /// Returns the usernames that now exist, in seed order.
    async fn seed_users(
        &self,
        realm: &str,
        client: &ClientRepresentation,
        seeds: &[UserSeed],
        policy: FailurePolicy,
        roles: &mut HashMap<String, RoleRepresentation>,
        log: &mut StepLog,
    ) -> Vec<String> {
        let mut seeded = Vec::with_capacity(seeds.len());
        for seed in seeds {
            if halted(log, policy) {
                skip_user(log, seed);
                continue;
            }

            let user_resource = UserResource::new(self.api, realm, seed.user.clone());
            let Some(user) = log
                .record_outcome("user", &seed.user.username, ensure(&user_resource).await)
                .map(|u| u.into_entity())
            else {
                skip_grants(log, seed);
                continue;
            };
            seeded.push(user.username.clone());

            for role_name in &seed.grants {
                let label = format!("{} -> {}", user.username, role_name);
                if halted(log, policy) {
                    log.skip("role grant", &label);
                    continue;
                }

                let role = match self.resolve_role(realm, &client.id, role_name, roles).await {
                    Ok(role) => role,
                    Err(reason) => {
                        log.record("role grant", &label, StepStatus::Failed(reason));
                        continue;
                    }
                };

                let grant = ClientRoleGrant::new(self.api, realm, &user, &client.id, role);
                log.record_outcome("role grant", &label, ensure(&grant).await);
            }
        }
        seeded
    }

    /// Finds a client role by name, preferring roles this run already ensured.
    async fn resolve_role(
        &self,
        realm: &str,
        client_uuid: &str,
        name: &str,
        known: &mut HashMap<String, RoleRepresentation>,
    ) -> Result<RoleRepresentation, String> {
        if let Some(role) = known.get(name) {
            return Ok(role.clone());
        }
        match self.api.get_client_role(realm, client_uuid, name).await {
            Ok(Lookup::Found(role)) => {
                known.insert(name.to_string(), role.clone());
                Ok(role)
            }
            Ok(Lookup::NotFound) => Err(format!("client role '{name}' does not exist")),
            Err(err) => Err(err.to_string()),
        }
    }
}

fn halted(log: &StepLog, policy: FailurePolicy) -> bool {
    policy == FailurePolicy::FailFast && log.has_failures()
}

fn skip_dependents(log: &mut StepLog, plan: &ProvisionPlan, include_client: bool) {
    if include_client {
        log.skip("client", &plan.client.client_id);
    }
    for role in &plan.roles {
        log.skip("client role", &role.name);
    }
    for seed in &plan.users {
        skip_user(log, seed);
    }
}

fn skip_user(log: &mut StepLog, seed: &UserSeed) {
    log.skip("user", &seed.user.username);
    skip_grants(log, seed);
}

fn skip_grants(log: &mut StepLog, seed: &UserSeed) {
    for role in &seed.grants {
        log.skip("role grant", &format!("{} -> {}", seed.user.username, role));
    }
}
