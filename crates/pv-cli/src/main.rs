//! # provisioner
//!
//! Provision resources, Keycloak realms and Key Vault secrets.

#![forbid(unsafe_code)]

use clap::Parser;
use pv_cli::{
    cli::{Cli, Command},
    commands::{run_config, run_keycloak, run_resource, run_vault, ResourceRequest, SimulatedBackend},
    config::FileConfig,
    output::{error, StdinPrompt},
    CliResult, Settings,
};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> CliResult<()> {
    let (file, source) = FileConfig::load(cli.config.as_deref())?;
    let settings = Settings::resolve(&cli.settings, cli.output, file, source);
    tracing::debug!(
        host = %settings.host,
        environment = %settings.environment,
        dry_run = settings.dry_run,
        "settings resolved"
    );

    let prompt = StdinPrompt;
    let backend = SimulatedBackend;

    match cli.command {
        Command::Config => run_config(&settings),
        Command::Create(cmd) => run_resource(&ResourceRequest::from(cmd), &settings, &backend, &prompt),
        Command::Update(cmd) => run_resource(&ResourceRequest::from(cmd), &settings, &backend, &prompt),
        Command::Delete(cmd) => run_resource(&ResourceRequest::from(cmd), &settings, &backend, &prompt),
        Command::Keycloak(cmd) => run_keycloak(cmd, &settings).await,
        Command::Vault(cmd) => run_vault(cmd, &settings, &prompt).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        // A declined prompt has already said so.
        if !e.is_cancelled() {
            error(&e.to_string());
        }
        std::process::exit(1);
    }
}
