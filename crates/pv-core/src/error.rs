//! Provisioning error types.
//!
//! Absence is not an error: probes report it through
//! [`Lookup::NotFound`](crate::Lookup::NotFound). Everything here is a real
//! failure that terminates the current step, except [`ProvisionError::Cancelled`]
//! which callers treat as a control-flow outcome.

use thiserror::Error;

/// Provisioning error type.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Missing or inconsistent configuration, raised before any network call.
    #[error("configuration error: {0}")]
    Config(String),

    /// The token endpoint rejected the credentials.
    #[error("authentication failed: {status} - {message}")]
    Auth {
        /// HTTP status code returned by the token endpoint (0 if none).
        status: u16,
        /// Response body or failure description.
        message: String,
    },

    /// The remote API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// A required entity does not exist.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Entity kind (e.g. "secret", "realm").
        kind: String,
        /// Entity name.
        name: String,
    },

    /// The remote accepted a create but the entity is still not visible.
    #[error("inconsistent remote state: {0}")]
    Inconsistent(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The user declined a confirmation prompt.
    #[error("operation cancelled")]
    Cancelled,
}

impl ProvisionError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Returns the remote HTTP status, if this error carries one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Auth { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns whether the remote reported a duplicate (HTTP 409).
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Api { status: 409, .. })
    }

    /// Returns whether this is a remote 404 that escaped a probe, or a
    /// [`NotFound`](Self::NotFound) from a strict accessor.
    #[must_use]
    pub const fn is_not_found_status(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. } | Self::NotFound { .. })
    }

    /// Returns whether the user cancelled the operation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Provisioning result type.
pub type ProvisionResult<T> = Result<T, ProvisionError>;
