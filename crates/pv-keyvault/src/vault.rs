//! Key Vault secrets over the data-plane REST API.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pv_core::{Connector, Credential, Ensured, Lookup, ProvisionError, ProvisionResult, Resource, TokenSource};
use serde::{Deserialize, Serialize};
use urlencoding::encode;

use crate::auth::token_source_for;

/// Data-plane API version.
pub const API_VERSION: &str = "7.4";

const DELETE_POLL_ATTEMPTS: u32 = 30;
const DELETE_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nbf: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretBundle {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    attributes: SecretAttributes,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretItem {
    id: String,
    #[serde(default)]
    attributes: SecretAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretListPage {
    #[serde(default)]
    value: Vec<SecretItem>,
    #[serde(default)]
    next_link: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetSecretBody<'a> {
    value: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<&'a str>,
    #[serde(skip_serializing_if = "is_default_attributes")]
    attributes: SecretAttributes,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<String, String>,
}

fn is_default_attributes(attributes: &SecretAttributes) -> bool {
    *attributes == SecretAttributes::default()
}

/// A secret as stored in the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    /// Secret name.
    pub name: String,
    /// Version identifier, when the server reported one.
    pub version: Option<String>,
    /// Secret value, when the response carried one. Reading a disabled
    /// secret fails with 403 instead.
    pub value: Option<String>,
    /// Content type hint.
    pub content_type: Option<String>,
    /// Whether the secret is enabled.
    pub enabled: bool,
    /// Tags.
    pub tags: BTreeMap<String, String>,
}

impl Secret {
    fn from_bundle(name: &str, bundle: SecretBundle) -> Self {
        let version = bundle
            .id
            .as_deref()
            .and_then(|id| id_segments(id).1);
        Self {
            name: name.to_string(),
            version,
            value: bundle.value,
            content_type: bundle.content_type,
            enabled: bundle.attributes.enabled.unwrap_or(true),
            tags: bundle.tags,
        }
    }
}

/// Splits a secret id (`https://{vault}/secrets/{name}/{version}`) into
/// name and optional version.
fn id_segments(id: &str) -> (Option<String>, Option<String>) {
    let path = url::Url::parse(id)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| id.to_string());
    let mut parts = path
        .trim_matches('/')
        .split('/')
        .skip_while(|p| *p != "secrets" && *p != "deletedsecrets")
        .skip(1)
        .map(str::to_string);
    (parts.next(), parts.next())
}

/// Optional properties for [`KeyVault::set`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetSecretOptions {
    /// Content type hint.
    pub content_type: Option<String>,
    /// Enable or disable the new version. Server default is enabled.
    pub enabled: Option<bool>,
    /// Expiry time.
    pub expires_on: Option<DateTime<Utc>>,
    /// Activation time.
    pub not_before: Option<DateTime<Utc>>,
    /// Tags.
    pub tags: BTreeMap<String, String>,
}

/// Azure Key Vault secrets client.
///
/// Absence is reported as `None`/`false`; permission and transport
/// failures are errors.
pub struct KeyVault {
    connector: Connector,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl KeyVault {
    /// Connects to `https://{vault_name}.vault.azure.net`.
    pub fn new(vault_name: &str, credential: &Credential) -> ProvisionResult<Self> {
        if vault_name.is_empty()
            || !vault_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ProvisionError::Config(format!(
                "invalid vault name '{vault_name}'"
            )));
        }

        let http = reqwest::Client::new();
        let tokens = token_source_for(credential, http.clone())?;
        let url = format!("https://{vault_name}.vault.azure.net");
        tracing::debug!(vault = %url, strategy = credential.strategy(), "key vault client ready");
        Ok(Self::from_connector(Connector::with_client(&url, tokens, http)?))
    }

    /// Connects to an explicit vault URL (emulators, private endpoints).
    pub fn with_endpoint(url: &str, tokens: Arc<dyn TokenSource>) -> ProvisionResult<Self> {
        Ok(Self::from_connector(Connector::new(url, tokens)?))
    }

    fn from_connector(connector: Connector) -> Self {
        Self {
            connector,
            poll_attempts: DELETE_POLL_ATTEMPTS,
            poll_interval: DELETE_POLL_INTERVAL,
        }
    }

    /// Overrides how long [`delete`](Self::delete) waits for the deletion
    /// to complete.
    #[must_use]
    pub fn with_delete_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.poll_attempts = attempts.max(1);
        self.poll_interval = interval;
        self
    }

    /// Gets the vault URL.
    pub fn vault_url(&self) -> &str {
        self.connector.base_url()
    }

    fn secret_path(name: &str, version: Option<&str>) -> String {
        match version {
            Some(v) => format!("/secrets/{}/{}?api-version={API_VERSION}", encode(name), encode(v)),
            None => format!("/secrets/{}?api-version={API_VERSION}", encode(name)),
        }
    }

    fn deleted_path(name: &str) -> String {
        format!("/deletedsecrets/{}?api-version={API_VERSION}", encode(name))
    }

    /// Looks a secret up, latest version unless `version` is given.
    pub async fn fetch(&self, name: &str, version: Option<&str>) -> ProvisionResult<Lookup<Secret>> {
        let bundle: Lookup<SecretBundle> = self
            .connector
            .get_optional(&Self::secret_path(name, version))
            .await?;
        Ok(bundle.map(|b| Secret::from_bundle(name, b)))
    }

    /// Gets a secret value, `None` if the secret does not exist.
    pub async fn get(&self, name: &str, version: Option<&str>) -> ProvisionResult<Option<String>> {
        Ok(self.fetch(name, version).await?.found().and_then(|s| s.value))
    }

    /// Gets a secret value, failing with `NotFound` if it does not exist.
    pub async fn get_or_fail(&self, name: &str, version: Option<&str>) -> ProvisionResult<String> {
        self.get(name, version)
            .await?
            .ok_or_else(|| ProvisionError::not_found("secret", name))
    }

    /// Returns whether a secret exists.
    pub async fn exists(&self, name: &str) -> ProvisionResult<bool> {
        Ok(self.fetch(name, None).await?.is_found())
    }

    /// Lists secret names, following every result page.
    pub async fn list_keys(&self, include_disabled: bool) -> ProvisionResult<Vec<String>> {
        let mut names = Vec::new();
        let mut next = Some(format!("/secrets?api-version={API_VERSION}"));

        while let Some(url) = next {
            let page: SecretListPage = self.connector.get(&url).await?;
            names.extend(
                page.value
                    .into_iter()
                    .filter(|item| include_disabled || item.attributes.enabled.unwrap_or(true))
                    .filter_map(|item| id_segments(&item.id).0),
            );
            next = page.next_link.filter(|link| !link.is_empty());
        }

        Ok(names)
    }

    /// Lists secrets with their values. A secret deleted between listing and
    /// reading maps to `None`; a disabled secret's 403 is returned as an error.
    pub async fn list_secrets(
        &self,
        include_disabled: bool,
    ) -> ProvisionResult<BTreeMap<String, Option<String>>> {
        let mut secrets = BTreeMap::new();
        for name in self.list_keys(include_disabled).await? {
            let value = self.get(&name, None).await?;
            secrets.insert(name, value);
        }
        Ok(secrets)
    }

    /// Stores a new version of a secret.
    pub async fn set(&self, name: &str, value: &str, options: &SetSecretOptions) -> ProvisionResult<()> {
        let body = SetSecretBody {
            value,
            content_type: options.content_type.as_deref(),
            attributes: SecretAttributes {
                enabled: options.enabled,
                exp: options.expires_on.map(|t| t.timestamp()),
                nbf: options.not_before.map(|t| t.timestamp()),
            },
            tags: options.tags.clone(),
        };
        self.connector
            .put_json(&Self::secret_path(name, None), &body)
            .await?;
        tracing::info!(secret = name, "secret stored");
        Ok(())
    }

    /// Deletes a secret and waits until the deletion has completed.
    ///
    /// With `purge`, the soft-deleted secret is then removed permanently,
    /// which requires soft delete to be enabled on the vault.
    pub async fn delete(&self, name: &str, purge: bool) -> ProvisionResult<()> {
        if !self
            .connector
            .delete_optional(&Self::secret_path(name, None))
            .await?
            .is_found()
        {
            return Err(ProvisionError::not_found("secret", name));
        }

        self.wait_until_deleted(name).await?;
        tracing::info!(secret = name, "secret deleted");

        if purge {
            self.connector.delete(&Self::deleted_path(name)).await?;
            tracing::info!(secret = name, "deleted secret purged");
        }
        Ok(())
    }

    async fn wait_until_deleted(&self, name: &str) -> ProvisionResult<()> {
        for attempt in 1..=self.poll_attempts {
            let deleted: Lookup<serde_json::Value> =
                self.connector.get_optional(&Self::deleted_path(name)).await?;
            if deleted.is_found() {
                return Ok(());
            }
            tracing::debug!(secret = name, attempt, "waiting for deletion");
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(ProvisionError::Inconsistent(format!(
            "secret '{name}' was not reported deleted after {} attempts",
            self.poll_attempts
        )))
    }

    /// Stores `value` under `name` only if no secret by that name exists.
    /// An existing secret keeps its value.
    pub async fn ensure(&self, name: &str, value: &str) -> ProvisionResult<Ensured<Secret>> {
        pv_core::ensure(&SecretResource::new(self, name, value)).await
    }
}

/// A named secret as an idempotently creatable resource.
pub struct SecretResource<'a> {
    vault: &'a KeyVault,
    name: String,
    value: String,
    options: SetSecretOptions,
}

impl<'a> SecretResource<'a> {
    /// Creates the resource.
    pub fn new(vault: &'a KeyVault, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            vault,
            name: name.into(),
            value: value.into(),
            options: SetSecretOptions::default(),
        }
    }

    /// Sets the properties used when the secret is created.
    #[must_use]
    pub fn with_options(mut self, options: SetSecretOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl<'a> Resource for SecretResource<'a> {
    type Entity = Secret;

    fn kind(&self) -> &'static str {
        "secret"
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self) -> ProvisionResult<Lookup<Secret>> {
        self.vault.fetch(&self.name, None).await
    }

    async fn create(&self) -> ProvisionResult<()> {
        self.vault.set(&self.name, &self.value, &self.options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_secret_ids() {
        assert_eq!(
            id_segments("https://v.vault.azure.net/secrets/db-password/abc123"),
            (Some("db-password".to_string()), Some("abc123".to_string()))
        );
        assert_eq!(
            id_segments("https://v.vault.azure.net/secrets/api-key"),
            (Some("api-key".to_string()), None)
        );
    }

    #[test]
    fn rejects_invalid_vault_names() {
        let err = KeyVault::new("bad name", &Credential::Ambient).err().unwrap();
        assert!(matches!(err, ProvisionError::Config(_)));
    }

    #[test]
    fn admin_password_cannot_open_a_vault() {
        let err = KeyVault::new("my-vault", &Credential::admin_password("a", "b"))
            .err()
            .unwrap();
        assert!(matches!(err, ProvisionError::Config(_)));
    }

    #[test]
    fn vault_url_from_name() {
        let credential = Credential::ServicePrincipal {
            tenant_id: "t".to_string(),
            client_id: "c".to_string(),
            client_secret: "s".to_string(),
        };
        let vault = KeyVault::new("my-vault", &credential).unwrap();
        assert_eq!(vault.vault_url(), "https://my-vault.vault.azure.net");
    }

    #[test]
    fn set_body_omits_unset_properties() {
        let body = SetSecretBody {
            value: "v",
            content_type: None,
            attributes: SecretAttributes::default(),
            tags: BTreeMap::new(),
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), serde_json::json!({ "value": "v" }));
    }

    #[test]
    fn set_body_carries_timestamps() {
        let tags = BTreeMap::from([("env".to_string(), "dev".to_string())]);
        let expires = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let body = SetSecretBody {
            value: "v",
            content_type: Some("text/plain"),
            attributes: SecretAttributes {
                enabled: Some(false),
                exp: Some(expires.timestamp()),
                nbf: None,
            },
            tags,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contentType"], "text/plain");
        assert_eq!(json["attributes"]["enabled"], false);
        assert_eq!(json["attributes"]["exp"], 1_893_456_000_i64);
        assert_eq!(json["tags"]["env"], "dev");
    }
}
