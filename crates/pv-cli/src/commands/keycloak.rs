//! Keycloak bootstrap commands.

use pv_core::{FailurePolicy, Lookup, Outcome, ProvisionError, StepLog};
use pv_keycloak::plan::DEFAULT_ROLES;
use pv_keycloak::{AdminApi, ProvisionPlan, ProvisionReport, Provisioner, RestAdminApi, UserSeed};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{KeycloakCommand, ProvisionArgs};
use crate::config::{OutputFormat, Settings};
use crate::output::{info, output, output_single, success, warning};
use crate::{CliError, CliResult};

/// One step for display.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct StepDisplay {
    /// Entity kind.
    #[tabled(rename = "Kind")]
    pub kind: String,
    /// Entity name.
    #[tabled(rename = "Name")]
    pub name: String,
    /// Outcome.
    #[tabled(rename = "Status")]
    pub status: String,
}

impl StepDisplay {
    fn rows(steps: &StepLog) -> Vec<Self> {
        steps
            .records()
            .iter()
            .map(|r| Self {
                kind: r.kind.clone(),
                name: r.name.clone(),
                status: r.status.to_string(),
            })
            .collect()
    }
}

/// Role for display.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct RoleDisplay {
    /// Role name.
    #[tabled(rename = "Name")]
    pub name: String,
    /// Description.
    #[tabled(rename = "Description")]
    pub description: String,
}

/// Runs a keycloak command.
pub async fn run_keycloak(cmd: KeycloakCommand, settings: &Settings) -> CliResult<()> {
    if let KeycloakCommand::Provision(args) = &cmd {
        if settings.dry_run {
            print_plan(&build_plan(args), settings);
            return Ok(());
        }
    }

    let api = RestAdminApi::connect(&settings.keycloak.url, &settings.keycloak.credential())?;

    match cmd {
        KeycloakCommand::Provision(args) => provision(&api, &build_plan(&args), settings.output).await,
        KeycloakCommand::SeedUser {
            realm,
            client_id,
            continue_on_error,
        } => {
            if settings.dry_run {
                info(&format!(
                    "Would ensure user 'testuser' in realm '{realm}' with client '{client_id}' role 'owner'"
                ));
                println!("\n🔍 DRY RUN - No changes made");
                return Ok(());
            }
            seed_user(&api, &realm, &client_id, policy(continue_on_error), settings.output).await
        }
        KeycloakCommand::Roles { realm, client_id } => {
            list_roles(&api, &realm, &client_id, settings.output).await
        }
    }
}

const fn policy(continue_on_error: bool) -> FailurePolicy {
    if continue_on_error {
        FailurePolicy::Continue
    } else {
        FailurePolicy::FailFast
    }
}

/// Builds the provisioning plan from command-line arguments.
pub fn build_plan(args: &ProvisionArgs) -> ProvisionPlan {
    let roles: Vec<String> = if args.roles.is_empty() {
        DEFAULT_ROLES.iter().map(|r| (*r).to_string()).collect()
    } else {
        args.roles.clone()
    };

    let mut plan = ProvisionPlan::for_application(&args.realm, &args.client_id, roles)
        .with_policy(policy(args.continue_on_error))
        .with_concurrent_roles(args.concurrent_roles);
    if args.with_test_user {
        plan = plan.with_user(UserSeed::test_user());
    }
    plan
}

fn print_plan(plan: &ProvisionPlan, settings: &Settings) {
    info(&format!("Keycloak: {}", settings.keycloak.url));
    println!("Would ensure:");
    println!("   realm  {}", plan.realm.realm);
    println!("   client {}", plan.client.client_id);
    for role in &plan.roles {
        println!("   role   {}", role.name);
    }
    for seed in &plan.users {
        println!("   user   {}", seed.user.username);
        for grant in &seed.grants {
            println!("   grant  {} -> {grant}", seed.user.username);
        }
    }
    println!("\n🔍 DRY RUN - No changes made");
}

fn finish(report: &ProvisionReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Table => {
            output(&StepDisplay::rows(&report.steps), format)?;
            println!();
            print!("{}", report.render());
        }
        OutputFormat::Json | OutputFormat::Yaml => output_single(report, format)?,
        OutputFormat::Quiet => {}
    }

    let failed = report.steps.count(Outcome::Failed);
    if failed > 0 {
        return Err(CliError::Incomplete { failed });
    }
    if report.client_secret.is_none() && report.client_internal_id.is_some() {
        warning("client secret could not be read");
    }
    Ok(())
}

/// Ensures everything in `plan` exists and prints the report.
pub async fn provision(
    api: &dyn AdminApi,
    plan: &ProvisionPlan,
    format: OutputFormat,
) -> CliResult<()> {
    tracing::info!(
        realm = %plan.realm.realm,
        client = %plan.client.client_id,
        roles = plan.roles.len(),
        "provisioning"
    );
    let report = Provisioner::new(api).run(plan).await;
    finish(&report, format)?;
    if format == OutputFormat::Table {
        success(&format!("Realm '{}' is ready", plan.realm.realm));
    }
    Ok(())
}

/// Ensures the test user and its grants in an existing realm and client.
pub async fn seed_user(
    api: &dyn AdminApi,
    realm: &str,
    client_id: &str,
    policy: FailurePolicy,
    format: OutputFormat,
) -> CliResult<()> {
    let report = Provisioner::new(api)
        .seed(realm, client_id, &[UserSeed::test_user()], policy)
        .await;
    match format {
        OutputFormat::Table => output(&StepDisplay::rows(&report.steps), format)?,
        OutputFormat::Json | OutputFormat::Yaml => output_single(&report.steps, format)?,
        OutputFormat::Quiet => {}
    }

    let failed = report.steps.count(Outcome::Failed);
    if failed > 0 {
        return Err(CliError::Incomplete { failed });
    }
    if format == OutputFormat::Table {
        success(&format!("Test user ready in realm '{realm}'"));
    }
    Ok(())
}

/// Lists the roles of a client.
pub async fn list_roles(
    api: &dyn AdminApi,
    realm: &str,
    client_id: &str,
    format: OutputFormat,
) -> CliResult<()> {
    let client = match api.find_client(realm, client_id).await? {
        Lookup::Found(client) => client,
        Lookup::NotFound => return Err(ProvisionError::not_found("client", client_id).into()),
    };

    let roles: Vec<RoleDisplay> = api
        .list_client_roles(realm, &client.id)
        .await?
        .into_iter()
        .map(|r| RoleDisplay {
            name: r.name,
            description: r.description.unwrap_or_default(),
        })
        .collect();

    if format == OutputFormat::Quiet {
        for role in &roles {
            println!("{}", role.name);
        }
        return Ok(());
    }
    output(&roles, format)
}
