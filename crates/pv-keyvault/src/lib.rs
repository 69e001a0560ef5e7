//! # pv-keyvault
//!
//! Azure Key Vault secrets adapter: named get, list, set, delete and
//! idempotent ensure over the data-plane REST API, authenticated through a
//! service principal or the default Azure credential chain.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod vault;

pub use auth::{
    token_source_for, AzureCliTokenSource, DefaultCredentialChain, ManagedIdentityTokenSource,
    ServicePrincipalTokenSource,
};
pub use vault::{KeyVault, Secret, SecretResource, SetSecretOptions, API_VERSION};
