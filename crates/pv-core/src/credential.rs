//! Credentials and bearer-token sources.
//!
//! A [`Credential`] is chosen once when a connector is built and never
//! changes afterwards. Adapter crates turn it into a [`TokenSource`] that
//! knows how to obtain bearer tokens for their endpoint.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tokio::sync::Mutex;

use crate::{ProvisionError, ProvisionResult};

/// Upper bound on the refresh margin taken off a token's lifetime.
const EXPIRY_MARGIN_SECS: u64 = 60;

/// Lifetime assumed when a token endpoint omits `expires_in`.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// How a connector authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// OAuth2 client credentials for a registered application.
    ServicePrincipal {
        /// Directory / tenant (or token realm) identifier.
        tenant_id: String,
        /// Application client identifier.
        client_id: String,
        /// Application client secret.
        client_secret: String,
    },
    /// Probe the local environment (env vars, managed identity, CLI session).
    Ambient,
    /// Administrator username and password.
    AdminPassword {
        /// Admin username.
        username: String,
        /// Admin password.
        password: String,
    },
}

impl Credential {
    /// Selects a credential from optional service-principal fields.
    ///
    /// All three present selects [`Credential::ServicePrincipal`], none
    /// selects [`Credential::Ambient`]. A partial set is a configuration
    /// error; it never falls back to ambient credentials.
    pub fn from_service_principal_parts(
        tenant_id: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> ProvisionResult<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let tenant_id = non_empty(tenant_id);
        let client_id = non_empty(client_id);
        let client_secret = non_empty(client_secret);

        match (tenant_id, client_id, client_secret) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => Ok(Self::ServicePrincipal {
                tenant_id,
                client_id,
                client_secret,
            }),
            (None, None, None) => Ok(Self::Ambient),
            (tenant_id, client_id, client_secret) => {
                let missing: Vec<&str> = [
                    ("tenant_id", tenant_id.is_none()),
                    ("client_id", client_id.is_none()),
                    ("client_secret", client_secret.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(ProvisionError::Config(format!(
                    "incomplete service principal credentials, missing: {}",
                    missing.join(", ")
                )))
            }
        }
    }

    /// Creates an admin username/password credential.
    pub fn admin_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::AdminPassword {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Short name of the strategy, safe to log.
    #[must_use]
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::ServicePrincipal { .. } => "service-principal",
            Self::Ambient => "ambient",
            Self::AdminPassword { .. } => "admin-password",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServicePrincipal {
                tenant_id,
                client_id,
                ..
            } => f
                .debug_struct("ServicePrincipal")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .field("client_secret", &"********")
                .finish(),
            Self::Ambient => f.write_str("Ambient"),
            Self::AdminPassword { username, .. } => f
                .debug_struct("AdminPassword")
                .field("username", username)
                .field("password", &"********")
                .finish(),
        }
    }
}

/// Source of bearer tokens for authenticated requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns a currently valid bearer token (without the `Bearer ` prefix).
    async fn token(&self) -> ProvisionResult<String>;

    /// Human-readable name of the source, for logs.
    fn describe(&self) -> &'static str;
}

/// A pre-issued token that never expires.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> ProvisionResult<String> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> &'static str {
        "static"
    }
}

/// Caches one token until shortly before it expires.
#[derive(Default)]
pub struct TokenCache {
    slot: Mutex<Option<(String, Instant)>>,
}

impl TokenCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token, or calls `fetch` and caches its result.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> ProvisionResult<String>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ProvisionResult<IssuedToken>> + Send,
    {
        let mut slot = self.slot.lock().await;
        if let Some((token, expiry)) = slot.as_ref() {
            if Instant::now() < *expiry {
                return Ok(token.clone());
            }
        }

        let issued = fetch().await?;
        let ttl = issued.expires_in.saturating_sub(expiry_margin(issued.expires_in));
        *slot = Some((issued.token.clone(), Instant::now() + ttl));
        Ok(issued.token)
    }
}

/// Refresh margin for a token lifetime: a quarter of it, at most a minute.
///
/// Keycloak's master realm issues 60 second tokens by default.
fn expiry_margin(lifetime: Duration) -> Duration {
    (lifetime / 4).min(Duration::from_secs(EXPIRY_MARGIN_SECS))
}

/// A token returned by a token endpoint.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Access token.
    pub token: String,
    /// Lifetime reported by the issuer.
    pub expires_in: Duration,
}

/// Standard OAuth2 token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Lifetime in seconds; some issuers send it as a string.
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub expires_in: Option<u64>,
}

impl From<TokenResponse> for IssuedToken {
    fn from(response: TokenResponse) -> Self {
        Self {
            token: response.access_token,
            expires_in: Duration::from_secs(response.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS)),
        }
    }
}

fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

/// Posts a form to an OAuth2 token endpoint and parses the token.
pub async fn request_token(
    http: &reqwest::Client,
    url: &str,
    form: &[(&str, &str)],
) -> ProvisionResult<IssuedToken> {
    tracing::debug!(url, "requesting access token");
    let response = http.post(url).form(form).send().await?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ProvisionError::Auth {
            status: status.as_u16(),
            message,
        });
    }

    let payload: TokenResponse = response.json().await?;
    Ok(payload.into())
}
