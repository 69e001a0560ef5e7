//! # pv-core
//!
//! Building blocks for idempotent provisioning against remote
//! administrative APIs.
//!
//! This crate provides:
//! - Credential selection and bearer-token sources
//! - An authenticated [`Connector`] bound to one endpoint
//! - Existence probing that keeps "not found" apart from real failures
//! - Idempotent creation ([`ensure`]) and an ordered, non-transactional
//!   sequencer for dependent entities

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod connector;
pub mod credential;
pub mod ensure;
pub mod error;
pub mod lookup;
pub mod sequence;

pub use connector::Connector;
pub use credential::{
    request_token, Credential, IssuedToken, StaticToken, TokenCache, TokenResponse, TokenSource,
};
pub use ensure::{ensure, exists, Resource};
pub use error::{ProvisionError, ProvisionResult};
pub use lookup::{Ensured, Lookup};
pub use sequence::{
    ensure_each, ensure_each_concurrent, FailurePolicy, Outcome, StepLog, StepRecord, StepStatus,
};
