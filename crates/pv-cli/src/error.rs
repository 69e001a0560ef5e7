//! CLI error types.

use pv_core::ProvisionError;
use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failure reported by a provisioning library.
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    /// Some provisioning steps failed; details were already printed.
    #[error("{failed} provisioning step(s) failed")]
    Incomplete {
        /// Number of failed steps.
        failed: usize,
    },

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Operation cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

impl CliError {
    /// Returns whether the user declined the operation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Provision(ProvisionError::Cancelled))
    }
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
