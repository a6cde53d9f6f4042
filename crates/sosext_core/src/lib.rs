//! Capabilities extension settings and activation registry for an SOS server.
//! This crate is the single source of truth for extension and activation state.

pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod registry;
pub mod repo;
pub mod service;

pub use config::{ConfigError, SettingsConfig};
pub use context::SettingsContext;
pub use db::{DbError, SessionFactory};
pub use error::{SettingsError, SettingsResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::activatable::Activatable;
pub use model::extension::{CapabilitiesExtension, OfferingExtension, StaticCapabilities};
pub use model::key::{ActivationKind, ExtensionKey};
pub use registry::provider::{
    ActivationCheck, CapabilitiesExtensionProvider, ExtensionProvider, OfferingExtensionProvider,
    ProviderSource, StaticProviderSource,
};
pub use registry::repository::{
    CapabilitiesExtensionRepository, OfferingExtensionRepository, ProviderRepository,
};
pub use service::activation_service::ActivationService;
pub use service::capabilities_service::CapabilitiesExtensionService;
pub use service::offering_catalog::{InMemoryOfferingCatalog, OfferingCatalog};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
