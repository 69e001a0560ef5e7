//! CLI configuration.
//!
//! Settings are resolved once at start-up: command-line flags and their
//! environment variables win over the optional TOML file, which wins over
//! built-in defaults. The resolved [`Settings`] value is passed explicitly
//! to every command and never changes afterwards.

use std::path::{Path, PathBuf};

use pv_core::Credential;
use serde::{Deserialize, Serialize};

use crate::cli::SettingsArgs;
use crate::{CliError, CliResult};

/// Default target host.
pub const DEFAULT_HOST: &str = "localhost";
/// Default environment label.
pub const DEFAULT_ENVIRONMENT: &str = "development";
/// Default Keycloak base URL.
pub const DEFAULT_KEYCLOAK_URL: &str = "http://localhost:8080";
/// Default Keycloak admin user and password.
pub const DEFAULT_KEYCLOAK_ADMIN: &str = "admin";
/// Default Key Vault name.
pub const DEFAULT_VAULT_NAME: &str = "my-vault";

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
    /// YAML format.
    Yaml,
    /// Quiet (minimal output).
    Quiet,
}

/// `[provisioner]` section of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisionerSection {
    /// Target host.
    pub host: Option<String>,
    /// Environment label.
    pub environment: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// Dry-run mode.
    pub dry_run: Option<bool>,
    /// Output format.
    pub output_format: Option<OutputFormat>,
}

/// `[keycloak]` section of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeycloakSection {
    /// Server base URL.
    pub url: Option<String>,
    /// Admin username.
    pub admin: Option<String>,
    /// Admin password.
    pub admin_password: Option<String>,
}

/// `[azure]` section of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AzureSection {
    /// Key Vault name.
    pub keyvault_name: Option<String>,
    /// Explicit Key Vault URL.
    pub keyvault_url: Option<String>,
    /// Tenant id.
    pub tenant_id: Option<String>,
    /// Application (client) id.
    pub client_id: Option<String>,
    /// Client secret.
    pub client_secret: Option<String>,
}

/// Contents of `provisioner.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// General settings.
    pub provisioner: ProvisionerSection,
    /// Keycloak settings.
    pub keycloak: KeycloakSection,
    /// Azure settings.
    pub azure: AzureSection,
}

impl FileConfig {
    /// Gets the default configuration file path.
    pub fn default_path() -> CliResult<PathBuf> {
        let home = dirs_next::home_dir()
            .ok_or_else(|| CliError::Config("could not determine home directory".to_string()))?;
        Ok(home.join(".provisioner").join("provisioner.toml"))
    }

    /// Parses a configuration file.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            CliError::Config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Loads the explicit file, or the default file if it exists.
    ///
    /// Returns the path actually read, if any. An explicit path that does
    /// not exist is an error; a missing default file is not.
    pub fn load(explicit: Option<&Path>) -> CliResult<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "configuration file not found: {}",
                    path.display()
                )));
            }
            return Ok((Self::load_from(path)?, Some(path.to_path_buf())));
        }

        match Self::default_path() {
            Ok(path) if path.exists() => Ok((Self::load_from(&path)?, Some(path))),
            _ => Ok((Self::default(), None)),
        }
    }
}

/// Keycloak connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct KeycloakSettings {
    /// Server base URL.
    pub url: String,
    /// Admin username.
    pub admin: String,
    /// Admin password.
    pub admin_password: String,
}

impl KeycloakSettings {
    /// Admin credential for the master realm.
    pub fn credential(&self) -> Credential {
        Credential::admin_password(self.admin.clone(), self.admin_password.clone())
    }
}

impl std::fmt::Debug for KeycloakSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeycloakSettings")
            .field("url", &self.url)
            .field("admin", &self.admin)
            .field("admin_password", &"********")
            .finish()
    }
}

/// Key Vault connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct AzureSettings {
    /// Vault name.
    pub vault_name: String,
    /// Explicit vault URL; overrides the name-derived URL.
    pub vault_url: Option<String>,
    /// Tenant id.
    pub tenant_id: Option<String>,
    /// Application (client) id.
    pub client_id: Option<String>,
    /// Client secret.
    pub client_secret: Option<String>,
}

impl AzureSettings {
    /// Service principal when all three parts are set, ambient when none
    /// are; a partial set is a configuration error.
    pub fn credential(&self) -> CliResult<Credential> {
        Ok(Credential::from_service_principal_parts(
            self.tenant_id.clone(),
            self.client_id.clone(),
            self.client_secret.clone(),
        )?)
    }
}

impl std::fmt::Debug for AzureSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureSettings")
            .field("vault_name", &self.vault_name)
            .field("vault_url", &self.vault_url)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "********"))
            .finish()
    }
}

/// Resolved, immutable settings.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// Target host.
    pub host: String,
    /// Environment label (e.g. production, staging, development).
    pub environment: String,
    /// API key.
    pub api_key: Option<String>,
    /// Dry-run mode: report what would happen and change nothing.
    pub dry_run: bool,
    /// Output format.
    pub output: OutputFormat,
    /// Keycloak settings.
    pub keycloak: KeycloakSettings,
    /// Key Vault settings.
    pub azure: AzureSettings,
    /// Configuration file that was read, if any.
    pub source: Option<PathBuf>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("environment", &self.environment)
            .field("api_key", &self.api_key.as_ref().map(|_| "********"))
            .field("dry_run", &self.dry_run)
            .field("output", &self.output)
            .field("keycloak", &self.keycloak)
            .field("azure", &self.azure)
            .field("source", &self.source)
            .finish()
    }
}

/// Treats blank values as unset.
fn present(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

fn pick(arg: Option<&String>, file: Option<&String>, default: &str) -> String {
    present(arg)
        .or_else(|| present(file))
        .unwrap_or_else(|| default.to_string())
}

/// Only a case-insensitive `true` enables dry-run mode.
pub fn parse_dry_run(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

impl Settings {
    /// Resolves flags, environment and file into settings.
    pub fn resolve(
        args: &SettingsArgs,
        output: Option<OutputFormat>,
        file: FileConfig,
        source: Option<PathBuf>,
    ) -> Self {
        let p = &file.provisioner;
        let k = &file.keycloak;
        let a = &file.azure;

        Self {
            host: pick(args.host.as_ref(), p.host.as_ref(), DEFAULT_HOST),
            environment: pick(
                args.environment.as_ref(),
                p.environment.as_ref(),
                DEFAULT_ENVIRONMENT,
            ),
            api_key: present(args.api_key.as_ref()).or_else(|| present(p.api_key.as_ref())),
            dry_run: args
                .dry_run
                .as_deref()
                .map(parse_dry_run)
                .or(p.dry_run)
                .unwrap_or(false),
            output: output.or(p.output_format).unwrap_or_default(),
            keycloak: KeycloakSettings {
                url: pick(args.keycloak_url.as_ref(), k.url.as_ref(), DEFAULT_KEYCLOAK_URL),
                admin: pick(
                    args.keycloak_admin.as_ref(),
                    k.admin.as_ref(),
                    DEFAULT_KEYCLOAK_ADMIN,
                ),
                admin_password: pick(
                    args.keycloak_admin_password.as_ref(),
                    k.admin_password.as_ref(),
                    DEFAULT_KEYCLOAK_ADMIN,
                ),
            },
            azure: AzureSettings {
                vault_name: pick(
                    args.vault_name.as_ref(),
                    a.keyvault_name.as_ref(),
                    DEFAULT_VAULT_NAME,
                ),
                vault_url: present(args.vault_url.as_ref())
                    .or_else(|| present(a.keyvault_url.as_ref())),
                tenant_id: present(args.azure_tenant_id.as_ref())
                    .or_else(|| present(a.tenant_id.as_ref())),
                client_id: present(args.azure_client_id.as_ref())
                    .or_else(|| present(a.client_id.as_ref())),
                client_secret: present(args.azure_client_secret.as_ref())
                    .or_else(|| present(a.client_secret.as_ref())),
            },
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn defaults_without_flags_or_file() {
        let settings = Settings::resolve(&SettingsArgs::default(), None, FileConfig::default(), None);
        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.environment, "development");
        assert_eq!(settings.api_key, None);
        assert!(!settings.dry_run);
        assert_eq!(settings.output, OutputFormat::Table);
        assert_eq!(settings.keycloak.url, "http://localhost:8080");
        assert_eq!(settings.keycloak.admin_password, "admin");
        assert_eq!(settings.azure.vault_name, "my-vault");
    }

    #[test]
    fn flags_override_file() {
        let mut file = FileConfig::default();
        file.provisioner.host = s("file-host");
        file.provisioner.environment = s("staging");
        file.keycloak.url = s("http://kc.internal");

        let args = SettingsArgs {
            host: s("flag-host"),
            ..SettingsArgs::default()
        };
        let settings = Settings::resolve(&args, None, file, None);
        assert_eq!(settings.host, "flag-host");
        assert_eq!(settings.environment, "staging");
        assert_eq!(settings.keycloak.url, "http://kc.internal");
    }

    #[test]
    fn blank_values_count_as_unset() {
        let args = SettingsArgs {
            api_key: s("  "),
            host: s(""),
            ..SettingsArgs::default()
        };
        let settings = Settings::resolve(&args, None, FileConfig::default(), None);
        assert_eq!(settings.api_key, None);
        assert_eq!(settings.host, "localhost");
    }

    #[test]
    fn dry_run_accepts_only_true() {
        assert!(parse_dry_run("true"));
        assert!(parse_dry_run("TRUE"));
        assert!(!parse_dry_run("yes"));
        assert!(!parse_dry_run("1"));

        let mut file = FileConfig::default();
        file.provisioner.dry_run = Some(true);
        let args = SettingsArgs {
            dry_run: s("false"),
            ..SettingsArgs::default()
        };
        assert!(!Settings::resolve(&args, None, file.clone(), None).dry_run);
        assert!(Settings::resolve(&SettingsArgs::default(), None, file, None).dry_run);
    }

    #[test]
    fn partial_azure_credentials_are_rejected() {
        let args = SettingsArgs {
            azure_tenant_id: s("tenant"),
            azure_client_id: s("app"),
            ..SettingsArgs::default()
        };
        let settings = Settings::resolve(&args, None, FileConfig::default(), None);
        let err = settings.azure.credential().err().unwrap();
        assert!(err.to_string().contains("client_secret"));
    }

    #[test]
    fn no_azure_credentials_means_ambient() {
        let settings = Settings::resolve(&SettingsArgs::default(), None, FileConfig::default(), None);
        assert_eq!(settings.azure.credential().unwrap(), Credential::Ambient);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let args = SettingsArgs {
            api_key: s("key-123"),
            keycloak_admin_password: s("s3cret"),
            azure_client_secret: s("hunter2"),
            ..SettingsArgs::default()
        };
        let settings = Settings::resolve(&args, None, FileConfig::default(), None);
        let printed = format!("{settings:?}");
        assert!(!printed.contains("s3cret"));
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("key-123"));
    }

    #[test]
    fn loads_file_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[provisioner]
environment = "production"
output_format = "json"

[keycloak]
url = "https://sso.example.com"

[azure]
keyvault_name = "prod-vault"
"#
        )
        .unwrap();

        let (config, source) = FileConfig::load(Some(file.path())).unwrap();
        assert_eq!(source.as_deref(), Some(file.path()));
        let settings = Settings::resolve(&SettingsArgs::default(), None, config, source);
        assert_eq!(settings.environment, "production");
        assert_eq!(settings.output, OutputFormat::Json);
        assert_eq!(settings.keycloak.url, "https://sso.example.com");
        assert_eq!(settings.azure.vault_name, "prod-vault");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[provisioner]\nhots = \"typo\"").unwrap();
        let err = FileConfig::load(Some(file.path())).err().unwrap();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = FileConfig::load(Some(Path::new("/nonexistent/provisioner.toml")))
            .err()
            .unwrap();
        assert!(matches!(err, CliError::Config(_)));
    }
}
