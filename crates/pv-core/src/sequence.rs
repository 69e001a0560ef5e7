//! Ordered, non-transactional execution of dependent provisioning steps.
//!
//! Steps already applied are never rolled back when a later step fails;
//! the [`StepLog`] records exactly what happened to each one.

use std::fmt;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::{ensure, Ensured, ProvisionResult, Resource};

/// What to do with the remaining siblings after a step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failure; later steps are recorded as skipped.
    #[default]
    FailFast,
    /// Attempt every step regardless of earlier failures.
    Continue,
}

/// Outcome of a single step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum StepStatus {
    /// The entity was created by this run.
    Created,
    /// The entity already existed.
    Existing,
    /// The step failed.
    Failed(String),
    /// The step was not attempted.
    Skipped,
}

/// Outcome of a step without its failure reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// See [`StepStatus::Created`].
    Created,
    /// See [`StepStatus::Existing`].
    Existing,
    /// See [`StepStatus::Failed`].
    Failed,
    /// See [`StepStatus::Skipped`].
    Skipped,
}

impl StepStatus {
    /// The outcome, dropping any failure reason.
    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::Created => Outcome::Created,
            Self::Existing => Outcome::Existing,
            Self::Failed(_) => Outcome::Failed,
            Self::Skipped => Outcome::Skipped,
        }
    }

    /// Short label for tables and logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Existing => "already exists",
            Self::Failed(_) => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            other => f.write_str(other.label()),
        }
    }
}

/// One recorded step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Entity kind.
    pub kind: String,
    /// Entity name.
    pub name: String,
    /// Outcome.
    #[serde(flatten)]
    pub status: StepStatus,
}

/// Ordered record of every step of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepLog {
    records: Vec<StepRecord>,
}

impl StepLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record.
    pub fn record(&mut self, kind: impl Into<String>, name: impl Into<String>, status: StepStatus) {
        self.records.push(StepRecord {
            kind: kind.into(),
            name: name.into(),
            status,
        });
    }

    /// Appends the outcome of an `ensure` call and returns the entity on success.
    pub fn record_outcome<T>(
        &mut self,
        kind: &str,
        name: &str,
        outcome: ProvisionResult<Ensured<T>>,
    ) -> Option<Ensured<T>> {
        match outcome {
            Ok(ensured) => {
                let status = if ensured.was_created() {
                    StepStatus::Created
                } else {
                    StepStatus::Existing
                };
                self.record(kind, name, status);
                Some(ensured)
            }
            Err(err) => {
                tracing::warn!(kind, name, error = %err, "provisioning step failed");
                self.record(kind, name, StepStatus::Failed(err.to_string()));
                None
            }
        }
    }

    /// Records a step that was not attempted.
    pub fn skip(&mut self, kind: &str, name: &str) {
        self.record(kind, name, StepStatus::Skipped);
    }

    /// Returns the records in execution order.
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Returns whether any step failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.records
            .iter()
            .any(|r| r.status.outcome() == Outcome::Failed)
    }

    /// Counts records with the given outcome.
    #[must_use]
    pub fn count(&self, outcome: Outcome) -> usize {
        self.records
            .iter()
            .filter(|r| r.status.outcome() == outcome)
            .count()
    }
}

/// Ensures each resource in declared order.
///
/// Returns one slot per resource, `None` where the step failed or was skipped.
pub async fn ensure_each<R: Resource>(
    resources: &[R],
    policy: FailurePolicy,
    log: &mut StepLog,
) -> Vec<Option<Ensured<R::Entity>>> {
    let mut results = Vec::with_capacity(resources.len());
    let mut halted = false;

    for resource in resources {
        if halted {
            log.skip(resource.kind(), resource.name());
            results.push(None);
            continue;
        }

        let outcome = log.record_outcome(resource.kind(), resource.name(), ensure(resource).await);
        if outcome.is_none() && policy == FailurePolicy::FailFast {
            halted = true;
        }
        results.push(outcome);
    }

    results
}

/// Ensures sibling resources concurrently.
///
/// Siblings are independent, so every one is attempted; records still
/// appear in declared order.
pub async fn ensure_each_concurrent<R: Resource>(
    resources: &[R],
    log: &mut StepLog,
) -> Vec<Option<Ensured<R::Entity>>> {
    let outcomes = join_all(resources.iter().map(|r| ensure(r))).await;

    resources
        .iter()
        .zip(outcomes)
        .map(|(resource, outcome)| log.record_outcome(resource.kind(), resource.name(), outcome))
        .collect()
}
