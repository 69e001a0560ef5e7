//! Azure AD token sources for the Key Vault data plane.

use std::env;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pv_core::{
    request_token, Credential, IssuedToken, ProvisionError, ProvisionResult, TokenCache,
    TokenResponse, TokenSource,
};
use serde::Deserialize;
use tokio::sync::Mutex;

/// Azure AD authority.
pub const LOGIN_BASE: &str = "https://login.microsoftonline.com";

/// OAuth2 scope of the Key Vault data plane.
pub const VAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// Resource identifier used by managed identity and the Azure CLI.
pub const VAULT_RESOURCE: &str = "https://vault.azure.net";

const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";
const IMDS_TIMEOUT: Duration = Duration::from_secs(2);

/// Client-credentials grant for an Azure AD application.
pub struct ServicePrincipalTokenSource {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cache: TokenCache,
}

impl ServicePrincipalTokenSource {
    /// Creates a source against the public Azure AD authority.
    pub fn new(
        tenant_id: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            http,
            token_url: format!("{LOGIN_BASE}/{tenant_id}/oauth2/v2.0/token"),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cache: TokenCache::new(),
        }
    }

    /// Points the source at another authority (sovereign clouds, tests).
    #[must_use]
    pub fn with_login_base(mut self, login_base: &str, tenant_id: &str) -> Self {
        self.token_url = format!(
            "{}/{tenant_id}/oauth2/v2.0/token",
            login_base.trim_end_matches('/')
        );
        self
    }
}

#[async_trait]
impl TokenSource for ServicePrincipalTokenSource {
    async fn token(&self) -> ProvisionResult<String> {
        self.cache
            .get_or_fetch(|| async {
                let form = [
                    ("grant_type", "client_credentials"),
                    ("client_id", self.client_id.as_str()),
                    ("client_secret", self.client_secret.as_str()),
                    ("scope", VAULT_SCOPE),
                ];
                request_token(&self.http, &self.token_url, &form).await
            })
            .await
    }

    fn describe(&self) -> &'static str {
        "service-principal"
    }
}

enum IdentityEndpoint {
    Imds(String),
    AppService { endpoint: String, header: String },
}

/// Managed identity of the hosting Azure resource.
///
/// Uses `IDENTITY_ENDPOINT`/`IDENTITY_HEADER` when the host provides them,
/// otherwise the instance metadata service.
pub struct ManagedIdentityTokenSource {
    http: reqwest::Client,
    endpoint: IdentityEndpoint,
    cache: TokenCache,
}

impl ManagedIdentityTokenSource {
    /// Detects the identity endpoint from the environment.
    pub fn from_env(http: reqwest::Client) -> Self {
        let endpoint = match (env::var("IDENTITY_ENDPOINT"), env::var("IDENTITY_HEADER")) {
            (Ok(endpoint), Ok(header)) => IdentityEndpoint::AppService { endpoint, header },
            _ => IdentityEndpoint::Imds(IMDS_ENDPOINT.to_string()),
        };
        Self {
            http,
            endpoint,
            cache: TokenCache::new(),
        }
    }

    /// Uses an instance-metadata-style endpoint at `url`.
    pub fn with_imds_endpoint(url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            endpoint: IdentityEndpoint::Imds(url.into()),
            cache: TokenCache::new(),
        }
    }

    async fn fetch(&self) -> ProvisionResult<IssuedToken> {
        let request = match &self.endpoint {
            IdentityEndpoint::Imds(url) => self
                .http
                .get(url)
                .header("Metadata", "true")
                .query(&[("api-version", IMDS_API_VERSION), ("resource", VAULT_RESOURCE)])
                .timeout(IMDS_TIMEOUT),
            IdentityEndpoint::AppService { endpoint, header } => self
                .http
                .get(endpoint)
                .header("X-IDENTITY-HEADER", header)
                .query(&[
                    ("api-version", APP_SERVICE_API_VERSION),
                    ("resource", VAULT_RESOURCE),
                ]),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProvisionError::Auth {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let payload: TokenResponse = response.json().await?;
        Ok(payload.into())
    }
}

#[async_trait]
impl TokenSource for ManagedIdentityTokenSource {
    async fn token(&self) -> ProvisionResult<String> {
        self.cache.get_or_fetch(|| self.fetch()).await
    }

    fn describe(&self) -> &'static str {
        "managed-identity"
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    #[serde(default, rename = "expires_on")]
    expires_on: Option<i64>,
}

/// Token from a logged-in Azure CLI (`az login`).
#[derive(Default)]
pub struct AzureCliTokenSource {
    cache: TokenCache,
}

impl AzureCliTokenSource {
    /// Creates the source.
    pub fn new() -> Self {
        Self::default()
    }

    fn run_cli() -> ProvisionResult<IssuedToken> {
        let output = Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                VAULT_RESOURCE,
                "--output",
                "json",
            ])
            .output()
            .map_err(|e| ProvisionError::Auth {
                status: 0,
                message: format!("Azure CLI not available: {e}"),
            })?;

        if !output.status.success() {
            return Err(ProvisionError::Auth {
                status: 0,
                message: format!(
                    "az account get-access-token failed: {}. Run 'az login' first.",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let parsed: CliToken = serde_json::from_slice(&output.stdout)?;
        Ok(cli_token_lifetime(parsed, chrono::Utc::now().timestamp()))
    }
}

fn cli_token_lifetime(token: CliToken, now: i64) -> IssuedToken {
    let remaining = token
        .expires_on
        .map_or(pv_core::credential::DEFAULT_TOKEN_TTL_SECS, |exp| {
            u64::try_from(exp - now).unwrap_or(0)
        });
    IssuedToken {
        token: token.access_token,
        expires_in: Duration::from_secs(remaining),
    }
}

#[async_trait]
impl TokenSource for AzureCliTokenSource {
    async fn token(&self) -> ProvisionResult<String> {
        self.cache
            .get_or_fetch(|| async {
                tokio::task::spawn_blocking(Self::run_cli)
                    .await
                    .map_err(|e| ProvisionError::Auth {
                        status: 0,
                        message: format!("Azure CLI task failed: {e}"),
                    })?
            })
            .await
    }

    fn describe(&self) -> &'static str {
        "azure-cli"
    }
}

/// Tries each source in order; the first one to issue a token is kept for
/// the rest of the process.
pub struct DefaultCredentialChain {
    sources: Vec<Arc<dyn TokenSource>>,
    selected: Mutex<Option<usize>>,
}

impl DefaultCredentialChain {
    /// Creates a chain over `sources`.
    pub fn new(sources: Vec<Arc<dyn TokenSource>>) -> Self {
        Self {
            sources,
            selected: Mutex::new(None),
        }
    }

    /// Environment service principal, then managed identity, then Azure CLI.
    ///
    /// The environment step is only included when all of `AZURE_TENANT_ID`,
    /// `AZURE_CLIENT_ID` and `AZURE_CLIENT_SECRET` are set.
    pub fn from_env(http: reqwest::Client) -> Self {
        let mut sources: Vec<Arc<dyn TokenSource>> = Vec::new();
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        if let (Some(tenant), Some(client_id), Some(secret)) = (
            var("AZURE_TENANT_ID"),
            var("AZURE_CLIENT_ID"),
            var("AZURE_CLIENT_SECRET"),
        ) {
            sources.push(Arc::new(ServicePrincipalTokenSource::new(
                &tenant,
                client_id,
                secret,
                http.clone(),
            )));
        }
        sources.push(Arc::new(ManagedIdentityTokenSource::from_env(http)));
        sources.push(Arc::new(AzureCliTokenSource::new()));
        Self::new(sources)
    }
}

#[async_trait]
impl TokenSource for DefaultCredentialChain {
    async fn token(&self) -> ProvisionResult<String> {
        let mut selected = self.selected.lock().await;
        if let Some(index) = *selected {
            return self.sources[index].token().await;
        }

        let mut failures = Vec::new();
        for (index, source) in self.sources.iter().enumerate() {
            match source.token().await {
                Ok(token) => {
                    tracing::debug!(source = source.describe(), "azure credential selected");
                    *selected = Some(index);
                    return Ok(token);
                }
                Err(err) => {
                    tracing::debug!(source = source.describe(), error = %err, "azure credential unavailable");
                    failures.push(format!("{}: {err}", source.describe()));
                }
            }
        }

        Err(ProvisionError::Auth {
            status: 0,
            message: format!("no Azure credential succeeded ({})", failures.join("; ")),
        })
    }

    fn describe(&self) -> &'static str {
        "default-chain"
    }
}

/// Selects the token source for `credential`.
///
/// A service principal is used as-is; ambient credentials go through
/// [`DefaultCredentialChain`]. Admin passwords are not accepted by Azure AD.
pub fn token_source_for(
    credential: &Credential,
    http: reqwest::Client,
) -> ProvisionResult<Arc<dyn TokenSource>> {
    match credential {
        Credential::ServicePrincipal {
            tenant_id,
            client_id,
            client_secret,
        } => Ok(Arc::new(ServicePrincipalTokenSource::new(
            tenant_id,
            client_id.clone(),
            client_secret.clone(),
            http,
        ))),
        Credential::Ambient => Ok(Arc::new(DefaultCredentialChain::from_env(http))),
        Credential::AdminPassword { .. } => Err(ProvisionError::Config(
            "Key Vault needs a service principal or ambient Azure credentials".to_string(),
        )),
    }
}
