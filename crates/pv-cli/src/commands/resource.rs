//! Create, update and delete commands for servers, databases and buckets.
//!
//! Every change follows the same flow: show the configuration and the
//! change details, warn when the change is irreversible, ask for
//! confirmation unless forced, then either stop (dry run) or hand the
//! request to a [`ResourceBackend`].

use std::fmt;

use colored::Colorize;

use crate::cli::{CreateCommand, DeleteCommand, UpdateCommand};
use crate::commands::config::display_config;
use crate::config::Settings;
use crate::output::{environment_label, Prompt};
use crate::{CliError, CliResult};

/// Kind of simulated resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Compute instance.
    Server,
    /// Database instance.
    Database,
    /// Storage bucket.
    Bucket,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Server => "server",
            Self::Database => "database",
            Self::Bucket => "bucket",
        })
    }
}

/// Change applied to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create a new resource.
    Create,
    /// Modify an existing resource.
    Update,
    /// Remove a resource.
    Delete,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
        }
    }

    fn details_heading(self) -> &'static str {
        match self {
            Self::Create => "📦 Resource Details:",
            Self::Update => "📦 Update Details:",
            Self::Delete => "📦 Deletion Details:",
        }
    }

    /// Deletion cannot be undone.
    pub const fn is_irreversible(self) -> bool {
        matches!(self, Self::Delete)
    }
}

fn yes_no(value: bool) -> String {
    let label = if value { "yes" } else { "no" };
    label.to_string()
}

fn visibility(public: bool) -> String {
    let label = if public { "public" } else { "private" };
    label.to_string()
}

fn enabled(on: bool) -> String {
    let label = if on { "enabled" } else { "disabled" };
    label.to_string()
}

/// Resolves a `--flag/--no-flag` pair; neither given is `None`.
fn toggle(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// A requested change with its display details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    /// What to change.
    pub action: Action,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource name.
    pub name: String,
    /// Option labels and values, in display order.
    pub details: Vec<(&'static str, String)>,
    /// Skip the confirmation prompt.
    pub force: bool,
}

impl ResourceRequest {
    fn new(action: Action, kind: ResourceKind, name: String, force: bool) -> Self {
        Self {
            action,
            kind,
            name,
            details: Vec::new(),
            force,
        }
    }

    fn detail(mut self, label: &'static str, value: String) -> Self {
        self.details.push((label, value));
        self
    }

    fn detail_if(self, label: &'static str, value: Option<String>) -> Self {
        match value {
            Some(value) => self.detail(label, value),
            None => self,
        }
    }

    /// Detail lines with values aligned after the longest label.
    pub fn detail_lines(&self) -> Vec<String> {
        let width = self
            .details
            .iter()
            .map(|(label, _)| label.len() + 1)
            .max()
            .unwrap_or(0);
        self.details
            .iter()
            .map(|(label, value)| format!("   {:<width$} {value}", format!("{label}:")))
            .collect()
    }
}

impl From<CreateCommand> for ResourceRequest {
    fn from(cmd: CreateCommand) -> Self {
        match cmd {
            CreateCommand::Server {
                name,
                size,
                region,
                force,
            } => Self::new(Action::Create, ResourceKind::Server, name, force.force)
                .detail("Size", size.as_str().to_string())
                .detail("Region", region),
            CreateCommand::Database {
                name,
                engine,
                storage,
                force,
            } => Self::new(Action::Create, ResourceKind::Database, name, force.force)
                .detail("Engine", engine.as_str().to_string())
                .detail("Storage", format!("{storage} GB")),
            CreateCommand::Bucket {
                name,
                public,
                private,
                versioning,
                no_versioning,
                force,
            } => Self::new(Action::Create, ResourceKind::Bucket, name, force.force)
                .detail("Visibility", visibility(toggle(public, private).unwrap_or(false)))
                .detail(
                    "Versioning",
                    enabled(toggle(versioning, no_versioning).unwrap_or(true)),
                ),
        }
    }
}

impl From<UpdateCommand> for ResourceRequest {
    fn from(cmd: UpdateCommand) -> Self {
        match cmd {
            UpdateCommand::Server {
                name,
                size,
                restart,
                no_restart,
                force,
            } => Self::new(Action::Update, ResourceKind::Server, name, force.force)
                .detail_if("New Size", size.map(|s| s.as_str().to_string()))
                .detail("Restart", yes_no(toggle(restart, no_restart).unwrap_or(false))),
            UpdateCommand::Database {
                name,
                storage,
                backup,
                no_backup,
                force,
            } => Self::new(Action::Update, ResourceKind::Database, name, force.force)
                .detail_if("New Storage", storage.map(|gb| format!("{gb} GB")))
                .detail("Backup", yes_no(toggle(backup, no_backup).unwrap_or(true))),
            UpdateCommand::Bucket {
                name,
                public,
                private,
                versioning,
                no_versioning,
                force,
            } => Self::new(Action::Update, ResourceKind::Bucket, name, force.force)
                .detail_if("Visibility", toggle(public, private).map(visibility))
                .detail_if("Versioning", toggle(versioning, no_versioning).map(enabled)),
        }
    }
}

impl From<DeleteCommand> for ResourceRequest {
    fn from(cmd: DeleteCommand) -> Self {
        match cmd {
            DeleteCommand::Server {
                name,
                keep_volumes,
                delete_volumes,
                force,
            } => Self::new(Action::Delete, ResourceKind::Server, name, force.force).detail(
                "Keep Volumes",
                yes_no(toggle(keep_volumes, delete_volumes).unwrap_or(true)),
            ),
            DeleteCommand::Database {
                name,
                final_snapshot,
                no_final_snapshot,
                force,
            } => Self::new(Action::Delete, ResourceKind::Database, name, force.force).detail(
                "Final Snapshot",
                yes_no(toggle(final_snapshot, no_final_snapshot).unwrap_or(true)),
            ),
            DeleteCommand::Bucket {
                name,
                empty_first,
                fail_if_not_empty,
                force,
            } => Self::new(Action::Delete, ResourceKind::Bucket, name, force.force).detail(
                "Empty First",
                yes_no(toggle(empty_first, fail_if_not_empty).unwrap_or(false)),
            ),
        }
    }
}

/// Applies confirmed resource changes.
pub trait ResourceBackend {
    /// Performs the change.
    fn apply(&self, request: &ResourceRequest, settings: &Settings) -> CliResult<()>;
}

/// Backend that only logs the change; no real API is called.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedBackend;

impl ResourceBackend for SimulatedBackend {
    fn apply(&self, request: &ResourceRequest, settings: &Settings) -> CliResult<()> {
        tracing::info!(
            action = request.action.verb(),
            kind = %request.kind,
            name = %request.name,
            host = %settings.host,
            environment = %settings.environment,
            "simulated resource change"
        );
        Ok(())
    }
}

fn confirm_action(
    request: &ResourceRequest,
    settings: &Settings,
    prompt: &dyn Prompt,
) -> CliResult<bool> {
    if request.force {
        return Ok(true);
    }

    println!("{}", "⚠️  WARNING".yellow().bold());
    println!(
        "You are about to {} the following resource:",
        request.action.verb().to_uppercase().red().bold()
    );
    println!("   Type:        {}", request.kind);
    println!("   Name:        {}", request.name);
    println!("   Environment: {}", environment_label(&settings.environment));
    println!("   Host:        {}", settings.host);
    println!();

    prompt.confirm(&"Are you sure you want to make these changes?".yellow().to_string())
}

/// Runs one resource change end to end.
///
/// A declined confirmation returns [`CliError::Cancelled`] without calling
/// the backend; so does nothing in dry-run mode, which still succeeds.
pub fn run_resource(
    request: &ResourceRequest,
    settings: &Settings,
    backend: &dyn ResourceBackend,
    prompt: &dyn Prompt,
) -> CliResult<()> {
    display_config(settings);

    println!("{}", request.action.details_heading());
    for line in request.detail_lines() {
        println!("{line}");
    }
    println!();

    if request.action.is_irreversible() {
        println!("{}", "⚠️  This action is IRREVERSIBLE!".red().bold());
        println!();
    }

    if !confirm_action(request, settings, prompt)? {
        println!("{}", "❌ Operation cancelled.".red());
        return Err(CliError::Cancelled);
    }

    if settings.dry_run {
        println!("{}", "\n🔍 DRY RUN - No changes made".cyan());
        return Ok(());
    }

    backend.apply(request, settings)?;

    let (icon, place) = match request.action {
        Action::Create => ("✅", "Provisioned on"),
        Action::Update => ("✅", "Changes applied on"),
        Action::Delete => ("🗑️ ", "Removed from"),
    };
    println!(
        "{}",
        format!(
            "\n{icon} Successfully {} {} '{}'",
            request.action.past_tense(),
            request.kind,
            request.name
        )
        .green()
        .bold()
    );
    println!("   {place} {} ({})", settings.host, settings.environment);
    Ok(())
}
