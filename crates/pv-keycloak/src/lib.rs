//! # pv-keycloak
//!
//! Idempotent provisioning of a Keycloak realm for one application: the
//! realm, a confidential client, its client roles and optional seed users.
//!
//! [`Provisioner::run`] executes a [`ProvisionPlan`] and returns a
//! [`ProvisionReport`]. Running the same plan twice leaves the server in the
//! same state and creates nothing the second time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod auth;
pub mod model;
pub mod plan;
pub mod report;
pub mod resources;
pub mod rest;

#[cfg(test)]
mod memory;

pub use api::AdminApi;
pub use auth::AdminTokenSource;
pub use model::{
    ClientRepresentation, ClientSecret, ClientSpec, RealmRepresentation, RealmSpec,
    RoleRepresentation, RoleSpec, UserRepresentation, UserSpec,
};
pub use plan::{ProvisionPlan, Provisioner, UserSeed};
pub use report::{EndpointUrls, ProvisionReport};
pub use resources::{
    ClientResource, ClientRoleGrant, ClientRoleResource, RealmResource, UserResource,
};
pub use rest::RestAdminApi;
