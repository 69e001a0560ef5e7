//! Key Vault secret commands.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use colored::Colorize;
use pv_keyvault::{token_source_for, KeyVault, SetSecretOptions};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::VaultCommand;
use crate::config::{OutputFormat, Settings};
use crate::output::{info, output, output_single, success, Prompt};
use crate::{CliError, CliResult};

/// Secret name for display.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct SecretNameDisplay {
    /// Secret name.
    #[tabled(rename = "Name")]
    pub name: String,
}

/// Secret name and value for display.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct SecretDisplay {
    /// Secret name.
    #[tabled(rename = "Name")]
    pub name: String,
    /// Secret value.
    #[tabled(rename = "Value", display_with = "display_value")]
    pub value: Option<String>,
}

fn display_value(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "(unavailable)".to_string())
}

/// Opens the configured vault.
pub fn open_vault(settings: &Settings) -> CliResult<KeyVault> {
    let credential = settings.azure.credential()?;
    let vault = match &settings.azure.vault_url {
        Some(url) => {
            let tokens = token_source_for(&credential, reqwest::Client::new())?;
            KeyVault::with_endpoint(url, tokens)?
        }
        None => KeyVault::new(&settings.azure.vault_name, &credential)?,
    };
    tracing::debug!(vault = vault.vault_url(), "vault selected");
    Ok(vault)
}

/// Runs a vault command.
pub async fn run_vault(
    cmd: VaultCommand,
    settings: &Settings,
    prompt: &dyn Prompt,
) -> CliResult<()> {
    let vault = open_vault(settings)?;
    execute(&vault, cmd, settings, prompt).await
}

/// Runs a vault command against an opened vault.
pub async fn execute(
    vault: &KeyVault,
    cmd: VaultCommand,
    settings: &Settings,
    prompt: &dyn Prompt,
) -> CliResult<()> {
    let format = settings.output;
    match cmd {
        VaultCommand::List {
            include_disabled,
            values,
        } => list_secrets(vault, include_disabled, values, format).await,
        VaultCommand::Get { name, version } => {
            get_secret(vault, &name, version.as_deref(), format).await
        }
        VaultCommand::Exists { name } => {
            let exists = vault.exists(&name).await?;
            match format {
                OutputFormat::Json | OutputFormat::Yaml => output_single(
                    &serde_json::json!({ "name": name, "exists": exists }),
                    format,
                ),
                _ => {
                    println!("{exists}");
                    Ok(())
                }
            }
        }
        VaultCommand::Set {
            name,
            value,
            content_type,
            disabled,
            tags,
            expires,
            not_before,
        } => {
            let options = SetSecretOptions {
                content_type,
                enabled: disabled.then_some(false),
                expires_on: expires.as_deref().map(parse_time).transpose()?,
                not_before: not_before.as_deref().map(parse_time).transpose()?,
                tags: parse_tags(&tags)?,
            };
            if settings.dry_run {
                info(&format!("Would set secret '{name}' in {}", vault.vault_url()));
                println!("{}", "\n🔍 DRY RUN - No changes made".cyan());
                return Ok(());
            }
            let value = match value {
                Some(value) => value,
                None => prompt.password(&format!("Value for '{name}': "))?,
            };
            vault.set(&name, &value, &options).await?;
            success(&format!("Secret '{name}' stored"));
            Ok(())
        }
        VaultCommand::Delete { name, purge, force } => {
            delete_secret(vault, &name, purge, force, settings, prompt).await
        }
        VaultCommand::Ensure { name, value } => {
            if settings.dry_run {
                let state = if vault.exists(&name).await? {
                    "already exists"
                } else {
                    "would be created"
                };
                info(&format!("Secret '{name}' {state}"));
                println!("{}", "\n🔍 DRY RUN - No changes made".cyan());
                return Ok(());
            }
            let outcome = vault.ensure(&name, &value).await?;
            if outcome.was_created() {
                success(&format!("Secret '{name}' created"));
            } else {
                info(&format!("Secret '{name}' already exists; value left unchanged"));
            }
            Ok(())
        }
    }
}

async fn list_secrets(
    vault: &KeyVault,
    include_disabled: bool,
    values: bool,
    format: OutputFormat,
) -> CliResult<()> {
    if values {
        let secrets: Vec<SecretDisplay> = vault
            .list_secrets(include_disabled)
            .await?
            .into_iter()
            .map(|(name, value)| SecretDisplay { name, value })
            .collect();
        return output(&secrets, format);
    }

    let names = vault.list_keys(include_disabled).await?;
    if format == OutputFormat::Quiet {
        for name in &names {
            println!("{name}");
        }
        return Ok(());
    }
    let rows: Vec<SecretNameDisplay> = names
        .into_iter()
        .map(|name| SecretNameDisplay { name })
        .collect();
    output(&rows, format)
}

async fn get_secret(
    vault: &KeyVault,
    name: &str,
    version: Option<&str>,
    format: OutputFormat,
) -> CliResult<()> {
    let value = vault.get_or_fail(name, version).await?;
    match format {
        OutputFormat::Json | OutputFormat::Yaml => output_single(
            &SecretDisplay {
                name: name.to_string(),
                value: Some(value),
            },
            format,
        ),
        _ => {
            println!("{value}");
            Ok(())
        }
    }
}

async fn delete_secret(
    vault: &KeyVault,
    name: &str,
    purge: bool,
    force: bool,
    settings: &Settings,
    prompt: &dyn Prompt,
) -> CliResult<()> {
    if purge {
        println!("{}", "⚠️  This action is IRREVERSIBLE!".red().bold());
    }
    if !force {
        let question = format!(
            "Delete secret '{name}' from {}{}?",
            vault.vault_url(),
            if purge { " and purge it" } else { "" }
        );
        if !prompt.confirm(&question)? {
            println!("{}", "❌ Operation cancelled.".red());
            return Err(CliError::Cancelled);
        }
    }

    if settings.dry_run {
        println!("{}", "\n🔍 DRY RUN - No changes made".cyan());
        return Ok(());
    }

    vault.delete(name, purge).await?;
    let how = if purge { "deleted and purged" } else { "deleted" };
    success(&format!("Secret '{name}' {how}"));
    Ok(())
}

/// Parses `KEY=VALUE` tags.
pub fn parse_tags(tags: &[String]) -> CliResult<BTreeMap<String, String>> {
    tags.iter()
        .map(|tag| {
            tag.split_once('=')
                .filter(|(key, _)| !key.trim().is_empty())
                .map(|(key, value)| (key.trim().to_string(), value.to_string()))
                .ok_or_else(|| {
                    CliError::InvalidArgument(format!("tag '{tag}' is not KEY=VALUE"))
                })
        })
        .collect()
}

/// Parses an RFC 3339 timestamp.
pub fn parse_time(value: &str) -> CliResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CliError::InvalidArgument(format!("invalid time '{value}': {e}")))
}
