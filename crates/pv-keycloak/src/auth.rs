//! Admin token acquisition against the Keycloak token endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use pv_core::{request_token, Credential, ProvisionError, ProvisionResult, TokenCache, TokenSource};

/// Realm holding the administrator accounts.
pub const ADMIN_REALM: &str = "master";

/// Public client used for admin password logins.
pub const ADMIN_CLI_CLIENT: &str = "admin-cli";

enum Grant {
    Password { username: String, password: String },
    ClientCredentials { client_id: String, client_secret: String },
}

/// Token source for the admin REST API.
pub struct AdminTokenSource {
    http: reqwest::Client,
    token_url: String,
    grant: Grant,
    cache: TokenCache,
}

impl AdminTokenSource {
    /// Selects the grant for `credential`.
    ///
    /// Admin username/password logs into the master realm through
    /// `admin-cli`. A service principal uses the client credentials grant
    /// in the realm named by its tenant id. Ambient credentials have no
    /// meaning for Keycloak and are rejected.
    pub fn new(
        server_url: &str,
        credential: &Credential,
        http: reqwest::Client,
    ) -> ProvisionResult<Self> {
        let server_url = server_url.trim_end_matches('/');
        let (realm, grant) = match credential {
            Credential::AdminPassword { username, password } => (
                ADMIN_REALM,
                Grant::Password {
                    username: username.clone(),
                    password: password.clone(),
                },
            ),
            Credential::ServicePrincipal {
                tenant_id,
                client_id,
                client_secret,
            } => (
                tenant_id.as_str(),
                Grant::ClientCredentials {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                },
            ),
            Credential::Ambient => {
                return Err(ProvisionError::Config(
                    "the identity admin API needs an admin password or client credentials"
                        .to_string(),
                ))
            }
        };

        Ok(Self {
            http,
            token_url: token_url(server_url, realm),
            grant,
            cache: TokenCache::new(),
        })
    }

    /// Wraps the source for use by a connector.
    pub fn shared(self) -> Arc<dyn TokenSource> {
        Arc::new(self)
    }
}

/// Token endpoint of a realm.
pub fn token_url(server_url: &str, realm: &str) -> String {
    format!(
        "{}/realms/{}/protocol/openid-connect/token",
        server_url.trim_end_matches('/'),
        urlencoding::encode(realm)
    )
}

#[async_trait]
impl TokenSource for AdminTokenSource {
    async fn token(&self) -> ProvisionResult<String> {
        self.cache
            .get_or_fetch(|| async {
                let form: Vec<(&str, &str)> = match &self.grant {
                    Grant::Password { username, password } => vec![
                        ("grant_type", "password"),
                        ("client_id", ADMIN_CLI_CLIENT),
                        ("username", username.as_str()),
                        ("password", password.as_str()),
                    ],
                    Grant::ClientCredentials {
                        client_id,
                        client_secret,
                    } => vec![
                        ("grant_type", "client_credentials"),
                        ("client_id", client_id.as_str()),
                        ("client_secret", client_secret.as_str()),
                    ],
                };
                request_token(&self.http, &self.token_url, &form).await
            })
            .await
    }

    fn describe(&self) -> &'static str {
        match self.grant {
            Grant::Password { .. } => "keycloak-password",
            Grant::ClientCredentials { .. } => "keycloak-client-credentials",
        }
    }
}
