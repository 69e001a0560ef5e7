//! Command implementations.

pub mod config;
pub mod keycloak;
pub mod resource;
pub mod vault;

pub use config::run_config;
pub use keycloak::run_keycloak;
pub use resource::{run_resource, ResourceBackend, ResourceRequest, SimulatedBackend};
pub use vault::run_vault;
