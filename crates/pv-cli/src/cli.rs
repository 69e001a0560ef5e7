//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::OutputFormat;

/// Provisioner - create, update and delete infrastructure resources, and
/// bootstrap Keycloak realms and Key Vault secrets idempotently.
#[derive(Debug, Parser)]
#[command(name = "provisioner")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to ~/.provisioner/provisioner.toml).
    #[arg(short, long, global = true, env = "PROVISIONER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format (overrides config).
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Connection settings.
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Settings that may come from flags, environment variables or the file.
#[derive(Debug, Clone, Default, Args)]
pub struct SettingsArgs {
    /// Target host.
    #[arg(long, global = true, env = "PROVISIONER_HOST")]
    pub host: Option<String>,

    /// Environment label (production, staging, development).
    #[arg(long = "env", global = true, env = "PROVISIONER_ENV")]
    pub environment: Option<String>,

    /// API key for the target host.
    #[arg(long, global = true, env = "PROVISIONER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Report what would happen without changing anything.
    #[arg(
        long,
        global = true,
        env = "PROVISIONER_DRY_RUN",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub dry_run: Option<String>,

    /// Keycloak base URL.
    #[arg(long, global = true, env = "KEYCLOAK_URL")]
    pub keycloak_url: Option<String>,

    /// Keycloak admin username.
    #[arg(long, global = true, env = "KEYCLOAK_ADMIN")]
    pub keycloak_admin: Option<String>,

    /// Keycloak admin password.
    #[arg(long, global = true, env = "KEYCLOAK_ADMIN_PASSWORD", hide_env_values = true)]
    pub keycloak_admin_password: Option<String>,

    /// Azure Key Vault name.
    #[arg(long, global = true, env = "AZURE_KEYVAULT_NAME")]
    pub vault_name: Option<String>,

    /// Azure Key Vault URL (overrides the name).
    #[arg(long, global = true, env = "AZURE_KEYVAULT_URL")]
    pub vault_url: Option<String>,

    /// Azure AD tenant id.
    #[arg(long, global = true, env = "AZURE_TENANT_ID")]
    pub azure_tenant_id: Option<String>,

    /// Azure AD application (client) id.
    #[arg(long, global = true, env = "AZURE_CLIENT_ID")]
    pub azure_client_id: Option<String>,

    /// Azure AD client secret.
    #[arg(long, global = true, env = "AZURE_CLIENT_SECRET", hide_env_values = true)]
    pub azure_client_secret: Option<String>,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the current configuration.
    Config,

    /// Create a new resource.
    #[command(subcommand)]
    Create(CreateCommand),

    /// Update an existing resource.
    #[command(subcommand)]
    Update(UpdateCommand),

    /// Delete a resource.
    #[command(subcommand)]
    Delete(DeleteCommand),

    /// Keycloak realm bootstrap commands.
    #[command(subcommand)]
    Keycloak(KeycloakCommand),

    /// Azure Key Vault secret commands.
    #[command(subcommand)]
    Vault(VaultCommand),
}

/// Server size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ServerSize {
    /// Small instance.
    #[default]
    Small,
    /// Medium instance.
    Medium,
    /// Large instance.
    Large,
}

impl ServerSize {
    /// Lower-case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

/// Database engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DatabaseEngine {
    /// PostgreSQL.
    #[default]
    Postgres,
    /// MySQL.
    Mysql,
    /// Redis.
    Redis,
}

impl DatabaseEngine {
    /// Lower-case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Redis => "redis",
        }
    }
}

/// Skip the confirmation prompt.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct ForceArg {
    /// Skip confirmation.
    #[arg(short, long)]
    pub force: bool,
}

/// Create commands.
#[derive(Debug, Subcommand)]
pub enum CreateCommand {
    /// Create a server.
    Server {
        /// Server name.
        name: String,
        /// Server size.
        #[arg(short, long, value_enum, default_value = "small")]
        size: ServerSize,
        /// Region.
        #[arg(short, long, default_value = "us-east-1")]
        region: String,
        /// Confirmation.
        #[command(flatten)]
        force: ForceArg,
    },
    /// Create a database.
    Database {
        /// Database name.
        name: String,
        /// Database engine.
        #[arg(short, long, value_enum, default_value = "postgres")]
        engine: DatabaseEngine,
        /// Storage in GB.
        #[arg(short, long, default_value_t = 20)]
        storage: u32,
        /// Confirmation.
        #[command(flatten)]
        force: ForceArg,
    },
    /// Create a storage bucket.
    Bucket {
        /// Bucket name.
        name: String,
        /// Make the bucket public.
        #[arg(long, overrides_with = "private")]
        public: bool,
        /// Keep the bucket private (default).
        #[arg(long, overrides_with = "public")]
        private: bool,
        /// Enable versioning (default).
        #[arg(long, overrides_with = "no_versioning")]
        versioning: bool,
        /// Disable versioning.
        #[arg(long, overrides_with = "versioning")]
        no_versioning: bool,
        /// Confirmation.
        #[command(flatten)]
        force: ForceArg,
    },
}

/// Update commands.
#[derive(Debug, Subcommand)]
pub enum UpdateCommand {
    /// Update a server.
    Server {
        /// Server name.
        name: String,
        /// New server size.
        #[arg(short, long, value_enum)]
        size: Option<ServerSize>,
        /// Restart after the update.
        #[arg(long, overrides_with = "no_restart")]
        restart: bool,
        /// Do not restart (default).
        #[arg(long, overrides_with = "restart")]
        no_restart: bool,
        /// Confirmation.
        #[command(flatten)]
        force: ForceArg,
    },
    /// Update a database.
    Database {
        /// Database name.
        name: String,
        /// New storage in GB.
        #[arg(short, long)]
        storage: Option<u32>,
        /// Take a backup first (default).
        #[arg(long, overrides_with = "no_backup")]
        backup: bool,
        /// Skip the backup.
        #[arg(long, overrides_with = "backup")]
        no_backup: bool,
        /// Confirmation.
        #[command(flatten)]
        force: ForceArg,
    },
    /// Update a storage bucket.
    Bucket {
        /// Bucket name.
        name: String,
        /// Make the bucket public.
        #[arg(long, overrides_with = "private")]
        public: bool,
        /// Make the bucket private.
        #[arg(long, overrides_with = "public")]
        private: bool,
        /// Enable versioning.
        #[arg(long, overrides_with = "no_versioning")]
        versioning: bool,
        /// Disable versioning.
        #[arg(long, overrides_with = "versioning")]
        no_versioning: bool,
        /// Confirmation.
        #[command(flatten)]
        force: ForceArg,
    },
}

/// Delete commands.
#[derive(Debug, Subcommand)]
pub enum DeleteCommand {
    /// Delete a server.
    Server {
        /// Server name.
        name: String,
        /// Keep attached volumes (default).
        #[arg(long, overrides_with = "delete_volumes")]
        keep_volumes: bool,
        /// Delete attached volumes.
        #[arg(long, overrides_with = "keep_volumes")]
        delete_volumes: bool,
        /// Confirmation.
        #[command(flatten)]
        force: ForceArg,
    },
    /// Delete a database.
    Database {
        /// Database name.
        name: String,
        /// Take a final snapshot (default).
        #[arg(long, overrides_with = "no_final_snapshot")]
        final_snapshot: bool,
        /// Skip the final snapshot.
        #[arg(long, overrides_with = "final_snapshot")]
        no_final_snapshot: bool,
        /// Confirmation.
        #[command(flatten)]
        force: ForceArg,
    },
    /// Delete a storage bucket.
    Bucket {
        /// Bucket name.
        name: String,
        /// Empty the bucket before deleting it.
        #[arg(long, overrides_with = "fail_if_not_empty")]
        empty_first: bool,
        /// Fail if the bucket is not empty (default).
        #[arg(long, overrides_with = "empty_first")]
        fail_if_not_empty: bool,
        /// Confirmation.
        #[command(flatten)]
        force: ForceArg,
    },
}

/// Keycloak commands.
#[derive(Debug, Subcommand)]
pub enum KeycloakCommand {
    /// Ensure the realm, client, roles and optional test user exist.
    Provision(ProvisionArgs),

    /// Ensure the test user and its role grants exist.
    SeedUser {
        /// Realm name.
        #[arg(long, default_value = pv_keycloak::plan::DEFAULT_REALM)]
        realm: String,
        /// Client identifier.
        #[arg(long, default_value = pv_keycloak::plan::DEFAULT_CLIENT_ID)]
        client_id: String,
        /// Keep going after a failed step.
        #[arg(long)]
        continue_on_error: bool,
    },

    /// List a client's roles.
    Roles {
        /// Realm name.
        #[arg(long, default_value = pv_keycloak::plan::DEFAULT_REALM)]
        realm: String,
        /// Client identifier.
        #[arg(long, default_value = pv_keycloak::plan::DEFAULT_CLIENT_ID)]
        client_id: String,
    },
}

/// Arguments for `keycloak provision`.
#[derive(Debug, Clone, Args)]
pub struct ProvisionArgs {
    /// Realm name.
    #[arg(long, default_value = pv_keycloak::plan::DEFAULT_REALM)]
    pub realm: String,

    /// Client identifier.
    #[arg(long, default_value = pv_keycloak::plan::DEFAULT_CLIENT_ID)]
    pub client_id: String,

    /// Client role to ensure (repeatable; defaults to reader, writer, owner).
    #[arg(long = "role", value_name = "ROLE")]
    pub roles: Vec<String>,

    /// Also ensure the test user with the owner role.
    #[arg(long)]
    pub with_test_user: bool,

    /// Keep going after a failed step.
    #[arg(long)]
    pub continue_on_error: bool,

    /// Create roles concurrently.
    #[arg(long)]
    pub concurrent_roles: bool,
}

/// Vault commands.
#[derive(Debug, Subcommand)]
pub enum VaultCommand {
    /// List secret names.
    List {
        /// Include disabled secrets.
        #[arg(long)]
        include_disabled: bool,
        /// Also read each value.
        #[arg(long)]
        values: bool,
    },
    /// Print a secret value.
    #[command(disable_version_flag = true)]
    Get {
        /// Secret name.
        name: String,
        /// Specific version.
        #[arg(long)]
        version: Option<String>,
    },
    /// Print whether a secret exists.
    Exists {
        /// Secret name.
        name: String,
    },
    /// Set a secret, creating a new version.
    Set {
        /// Secret name.
        name: String,
        /// Secret value (prompted for when omitted).
        value: Option<String>,
        /// Content type.
        #[arg(long)]
        content_type: Option<String>,
        /// Store the version disabled.
        #[arg(long)]
        disabled: bool,
        /// Tag as KEY=VALUE (repeatable).
        #[arg(long = "tag", value_name = "KEY=VALUE")]
        tags: Vec<String>,
        /// Expiry time (RFC 3339).
        #[arg(long)]
        expires: Option<String>,
        /// Activation time (RFC 3339).
        #[arg(long)]
        not_before: Option<String>,
    },
    /// Delete a secret.
    Delete {
        /// Secret name.
        name: String,
        /// Purge after deletion.
        #[arg(long)]
        purge: bool,
        /// Skip confirmation.
        #[arg(short, long)]
        force: bool,
    },
    /// Create a secret only if it does not exist yet.
    Ensure {
        /// Secret name.
        name: String,
        /// Value used when the secret is created.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_dry_run_flag_means_true() {
        let cli = Cli::try_parse_from(["provisioner", "--dry-run", "config"]).unwrap();
        assert_eq!(cli.settings.dry_run.as_deref(), Some("true"));

        let cli = Cli::try_parse_from(["provisioner", "config", "--dry-run=false"]).unwrap();
        assert_eq!(cli.settings.dry_run.as_deref(), Some("false"));
    }

    #[test]
    fn last_visibility_flag_wins() {
        let cli = Cli::try_parse_from([
            "provisioner",
            "create",
            "bucket",
            "assets",
            "--public",
            "--private",
        ])
        .unwrap();
        let Command::Create(CreateCommand::Bucket { public, private, .. }) = cli.command else {
            panic!("expected create bucket");
        };
        assert!(!public);
        assert!(private);
    }

    #[test]
    fn create_server_defaults() {
        let cli = Cli::try_parse_from(["provisioner", "create", "server", "web-01"]).unwrap();
        let Command::Create(CreateCommand::Server { name, size, region, force }) = cli.command
        else {
            panic!("expected create server");
        };
        assert_eq!(name, "web-01");
        assert_eq!(size, ServerSize::Small);
        assert_eq!(region, "us-east-1");
        assert!(!force.force);
    }

    #[test]
    fn provision_roles_are_repeatable() {
        let cli = Cli::try_parse_from([
            "provisioner",
            "keycloak",
            "provision",
            "--role",
            "viewer",
            "--role",
            "admin",
        ])
        .unwrap();
        let Command::Keycloak(KeycloakCommand::Provision(args)) = cli.command else {
            panic!("expected keycloak provision");
        };
        assert_eq!(args.roles, ["viewer", "admin"]);
        assert_eq!(args.realm, "calendar");
    }
}
