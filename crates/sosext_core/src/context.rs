//! Composition root for the settings subsystem.
//!
//! # Responsibility
//! - Build one session factory and the services sharing it.
//! - Construct provider registries wired to the activation service.

use crate::config::SettingsConfig;
use crate::db::SessionFactory;
use crate::error::SettingsResult;
use crate::model::key::ActivationKind;
use crate::registry::provider::{
    ActivationCheck, CapabilitiesExtensionProvider, OfferingExtensionProvider, ProviderSource,
};
use crate::registry::repository::{CapabilitiesExtensionRepository, OfferingExtensionRepository};
use crate::service::activation_service::ActivationService;
use crate::service::capabilities_service::CapabilitiesExtensionService;
use crate::service::offering_catalog::OfferingCatalog;
use log::info;
use std::sync::Arc;

/// Services sharing one settings store.
pub struct SettingsContext {
    config: SettingsConfig,
    sessions: Arc<SessionFactory>,
    activation: Arc<ActivationService>,
    capabilities: Arc<CapabilitiesExtensionService>,
}

impl SettingsContext {
    /// Opens the configured store, or a private in-memory one when
    /// `database.path` is unset.
    pub fn open(config: &SettingsConfig, offerings: Arc<dyn OfferingCatalog>) -> SettingsResult<Self> {
        let sessions = match &config.database.path {
            Some(path) => SessionFactory::open(path)?,
            None => SessionFactory::in_memory()?,
        };
        Ok(Self::with_sessions(config.clone(), Arc::new(sessions), offerings))
    }

    /// In-memory context with the given configuration's defaults.
    pub fn in_memory(
        config: &SettingsConfig,
        offerings: Arc<dyn OfferingCatalog>,
    ) -> SettingsResult<Self> {
        let sessions = Arc::new(SessionFactory::in_memory()?);
        Ok(Self::with_sessions(config.clone(), sessions, offerings))
    }

    fn with_sessions(
        config: SettingsConfig,
        sessions: Arc<SessionFactory>,
        offerings: Arc<dyn OfferingCatalog>,
    ) -> Self {
        let activation = Arc::new(ActivationService::new(
            Arc::clone(&sessions),
            config.activation,
        ));
        let capabilities = Arc::new(CapabilitiesExtensionService::new(
            Arc::clone(&sessions),
            offerings,
        ));
        info!(
            "event=context_open module=context status=ok mode={}",
            sessions.mode()
        );
        Self {
            config,
            sessions,
            activation,
            capabilities,
        }
    }

    pub fn config(&self) -> &SettingsConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionFactory> {
        &self.sessions
    }

    pub fn activation(&self) -> &Arc<ActivationService> {
        &self.activation
    }

    pub fn capabilities(&self) -> &Arc<CapabilitiesExtensionService> {
        &self.capabilities
    }

    /// Registry of capabilities extension providers gated by
    /// `ActivationKind::ExtendedCapabilities`.
    pub fn capabilities_extension_registry(
        &self,
        source: impl ProviderSource<dyn CapabilitiesExtensionProvider> + 'static,
    ) -> SettingsResult<CapabilitiesExtensionRepository> {
        CapabilitiesExtensionRepository::new(
            ActivationKind::ExtendedCapabilities,
            source,
            self.activation_check(),
            self.config.registry.fail_if_empty,
        )
    }

    /// Registry of offering extension providers gated by
    /// `ActivationKind::OfferingExtension`.
    pub fn offering_extension_registry(
        &self,
        source: impl ProviderSource<dyn OfferingExtensionProvider> + 'static,
    ) -> SettingsResult<OfferingExtensionRepository> {
        OfferingExtensionRepository::new(
            ActivationKind::OfferingExtension,
            source,
            self.activation_check(),
            self.config.registry.fail_if_empty,
        )
    }

    fn activation_check(&self) -> Arc<dyn ActivationCheck> {
        Arc::clone(&self.activation) as Arc<dyn ActivationCheck>
    }
}

#[cfg(test)]
mod tests {
    use super::SettingsContext;
    use crate::config::SettingsConfig;
    use crate::error::SettingsError;
    use crate::registry::provider::{CapabilitiesExtensionProvider, StaticProviderSource};
    use crate::service::offering_catalog::InMemoryOfferingCatalog;
    use std::sync::Arc;

    #[test]
    fn in_memory_context_shares_one_store() {
        let context = SettingsContext::in_memory(
            &SettingsConfig::default(),
            Arc::new(InMemoryOfferingCatalog::new()),
        )
        .unwrap();
        assert_eq!(context.sessions().mode(), "memory");

        context
            .capabilities()
            .save_capabilities_extension("inspire", "<i/>")
            .unwrap();
        let stored = context
            .sessions()
            .execute(|tx| {
                tx.query_row("SELECT COUNT(*) FROM capabilities_extensions;", [], |row| {
                    row.get::<_, i64>(0)
                })
            })
            .unwrap();
        assert_eq!(stored, 1);
    }

    #[test]
    fn empty_registry_respects_fail_if_empty() {
        let mut config = SettingsConfig::default();
        config.registry.fail_if_empty = true;
        let context =
            SettingsContext::in_memory(&config, Arc::new(InMemoryOfferingCatalog::new())).unwrap();

        let result = context.capabilities_extension_registry(StaticProviderSource::<
            dyn CapabilitiesExtensionProvider,
        >::new(Vec::new()));
        assert!(matches!(result, Err(SettingsError::Configuration(_))));
    }
}
