//! # pv-cli
//!
//! The `provisioner` command-line tool.
//!
//! This crate provides:
//! - Confirmed create, update and delete of simulated servers, databases
//!   and buckets, with a dry-run mode
//! - Idempotent Keycloak realm, client, role and test-user bootstrap
//! - Azure Key Vault secret get, list, set, delete and ensure

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::doc_markdown)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use config::Settings;
pub use error::{CliError, CliResult};
