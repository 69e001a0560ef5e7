//! Configuration display.

use colored::Colorize;
use serde::Serialize;

use crate::config::{OutputFormat, Settings};
use crate::output::{environment_label, info, mask, output_single};

/// Settings with every secret masked.
#[derive(Debug, Serialize)]
struct ConfigView<'a> {
    host: &'a str,
    environment: &'a str,
    api_key: &'static str,
    dry_run: bool,
    keycloak_url: &'a str,
    keycloak_admin: &'a str,
    keycloak_admin_password: &'static str,
    vault_name: &'a str,
    vault_url: Option<&'a str>,
    azure_tenant_id: Option<&'a str>,
    azure_client_id: Option<&'a str>,
    azure_client_secret: &'static str,
}

impl<'a> ConfigView<'a> {
    fn new(settings: &'a Settings) -> Self {
        Self {
            host: &settings.host,
            environment: &settings.environment,
            api_key: mask(settings.api_key.as_deref()),
            dry_run: settings.dry_run,
            keycloak_url: &settings.keycloak.url,
            keycloak_admin: &settings.keycloak.admin,
            keycloak_admin_password: mask(Some(settings.keycloak.admin_password.as_str())),
            vault_name: &settings.azure.vault_name,
            vault_url: settings.azure.vault_url.as_deref(),
            azure_tenant_id: settings.azure.tenant_id.as_deref(),
            azure_client_id: settings.azure.client_id.as_deref(),
            azure_client_secret: mask(settings.azure.client_secret.as_deref()),
        }
    }
}

/// Prints the environment block shown before every resource change.
pub fn display_config(settings: &Settings) {
    println!("{}", "\n📋 Environment Configuration:".cyan().bold());
    println!("   Host:        {}", settings.host);
    println!("   Environment: {}", environment_label(&settings.environment));
    let api_key = mask(settings.api_key.as_deref());
    if settings.api_key.is_some() {
        println!("   API Key:     {api_key}");
    } else {
        println!("   API Key:     {}", api_key.red());
    }
    println!("   Dry Run:     {}", settings.dry_run);
    println!();
}

/// Shows the resolved configuration.
pub fn run_config(settings: &Settings) -> crate::CliResult<()> {
    if settings.output != OutputFormat::Table {
        return output_single(&ConfigView::new(settings), settings.output);
    }

    match &settings.source {
        Some(path) => info(&format!("Configuration file: {}", path.display())),
        None => info("Configuration file: none (using flags, environment and defaults)"),
    }
    display_config(settings);

    let view = ConfigView::new(settings);
    println!("{}", "🔑 Keycloak:".cyan().bold());
    println!("   URL:         {}", view.keycloak_url);
    println!("   Admin:       {}", view.keycloak_admin);
    println!("   Password:    {}", view.keycloak_admin_password);
    println!();
    println!("{}", "🔐 Azure Key Vault:".cyan().bold());
    println!("   Vault:       {}", view.vault_url.unwrap_or(view.vault_name));
    println!("   Tenant:      {}", view.azure_tenant_id.unwrap_or("NOT SET"));
    println!("   Client:      {}", view.azure_client_id.unwrap_or("NOT SET"));
    println!("   Secret:      {}", view.azure_client_secret);
    Ok(())
}
