//! Administrative facade over capabilities settings.
//!
//! # Responsibility
//! - Serve static capabilities, capabilities extensions and offering
//!   extensions from lazily loaded caches.
//! - Validate inputs and offering existence before touching the store.
//! - Keep each cache coherent with the committed store state.
//!
//! # Invariants
//! - Each category has its own cache and lock.
//! - Failed store operations leave every cache untouched.
//! - Extension values and documents are never logged.

use crate::cache::LazyCache;
use crate::db::SessionFactory;
use crate::error::{SettingsError, SettingsResult};
use crate::model::extension::{
    validate_capabilities_document, validate_identifier, CapabilitiesExtension,
    OfferingExtension, StaticCapabilities,
};
use crate::repo::capabilities_repo::{CapabilitiesRepository, SqliteCapabilitiesRepository};
use crate::service::offering_catalog::OfferingCatalog;
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

type CapabilitiesExtensionMap = BTreeMap<String, CapabilitiesExtension>;
type OfferingExtensionMap = BTreeMap<String, Vec<OfferingExtension>>;

pub struct CapabilitiesExtensionService {
    sessions: Arc<SessionFactory>,
    offerings: Arc<dyn OfferingCatalog>,
    active_static: LazyCache<Option<StaticCapabilities>>,
    capabilities_extensions: LazyCache<CapabilitiesExtensionMap>,
    offering_extensions: LazyCache<OfferingExtensionMap>,
}

impl CapabilitiesExtensionService {
    pub fn new(sessions: Arc<SessionFactory>, offerings: Arc<dyn OfferingCatalog>) -> Self {
        Self {
            sessions,
            offerings,
            active_static: LazyCache::new("active_static_capabilities"),
            capabilities_extensions: LazyCache::new("capabilities_extensions"),
            offering_extensions: LazyCache::new("offering_extensions"),
        }
    }

    // Static capabilities

    /// Identifier of the active static capabilities, if any.
    pub fn active_static_capabilities(&self) -> SettingsResult<Option<String>> {
        Ok(self
            .active_static_snapshot()?
            .as_ref()
            .as_ref()
            .map(|active| active.identifier.clone()))
    }

    /// Document of the active static capabilities, if any.
    pub fn active_static_capabilities_document(&self) -> SettingsResult<Option<String>> {
        Ok(self
            .active_static_snapshot()?
            .as_ref()
            .as_ref()
            .map(|active| active.document.clone()))
    }

    /// Activates `identifier`, or deactivates static capabilities with `None`.
    ///
    /// # Errors
    /// - `NoSuchExtension` when `identifier` is not stored.
    pub fn set_active_static_capabilities(&self, identifier: Option<&str>) -> SettingsResult<()> {
        let result = self.active_static.write_through(
            || {
                self.sessions.try_execute(|tx| {
                    let repo = SqliteCapabilitiesRepository::new(tx);
                    repo.set_active_static_capabilities(identifier)?;
                    repo.active_static_capabilities()
                })
            },
            |cached, active| *cached = active.clone(),
        );
        log_outcome(
            "static_capabilities_activate",
            identifier.unwrap_or("-"),
            result.map(|_| ()),
        )
    }

    pub fn static_capabilities(&self) -> SettingsResult<BTreeMap<String, String>> {
        self.sessions
            .try_execute(|tx| SqliteCapabilitiesRepository::new(tx).static_capabilities())
    }

    pub fn static_capabilities_by_id(&self, identifier: &str) -> SettingsResult<Option<String>> {
        self.sessions.try_execute(|tx| {
            SqliteCapabilitiesRepository::new(tx).static_capabilities_by_id(identifier)
        })
    }

    /// Creates or replaces a static capabilities document.
    ///
    /// Replacing the active document updates what is served immediately.
    pub fn save_static_capabilities(&self, identifier: &str, document: &str) -> SettingsResult<()> {
        validate_identifier(identifier)?;
        validate_capabilities_document(document)?;

        let result = self.active_static.write_through(
            || {
                self.sessions.try_execute(|tx| {
                    SqliteCapabilitiesRepository::new(tx)
                        .save_static_capabilities(identifier, document)
                })
            },
            |cached, _| {
                if let Some(active) = cached.as_mut().filter(|a| a.identifier == identifier) {
                    active.document = document.to_string();
                }
            },
        );
        log_outcome("static_capabilities_save", identifier, result)
    }

    pub fn delete_static_capabilities(&self, identifier: &str) -> SettingsResult<()> {
        let result = self.active_static.write_through(
            || {
                self.sessions.try_execute(|tx| {
                    SqliteCapabilitiesRepository::new(tx).delete_static_capabilities(identifier)
                })
            },
            |cached, _| {
                if cached
                    .as_ref()
                    .is_some_and(|active| active.identifier == identifier)
                {
                    *cached = None;
                }
            },
        );
        log_outcome("static_capabilities_delete", identifier, result)
    }

    // Offering extensions

    /// Every offering extension, grouped by offering.
    pub fn offering_extensions(&self) -> SettingsResult<OfferingExtensionMap> {
        Ok(self.offering_snapshot()?.as_ref().clone())
    }

    /// Enabled offering extensions; offerings without any are omitted.
    pub fn active_offering_extensions(&self) -> SettingsResult<OfferingExtensionMap> {
        Ok(self
            .offering_snapshot()?
            .iter()
            .filter_map(|(offering, extensions)| {
                let active: Vec<_> = extensions
                    .iter()
                    .filter(|extension| extension.is_active())
                    .cloned()
                    .collect();
                (!active.is_empty()).then(|| (offering.clone(), active))
            })
            .collect())
    }

    /// Creates or replaces an offering extension value.
    ///
    /// # Errors
    /// - `NoSuchOffering` when the offering is not currently served.
    pub fn save_offering_extension(
        &self,
        offering: &str,
        identifier: &str,
        value: &str,
    ) -> SettingsResult<()> {
        self.ensure_offering(offering)?;
        validate_identifier(identifier)?;

        let result = self.offering_extensions.write_through(
            || {
                self.sessions.try_execute(|tx| {
                    SqliteCapabilitiesRepository::new(tx)
                        .save_offering_extension(offering, identifier, value)
                })
            },
            |cached, _| {
                let extensions = cached.entry(offering.to_string()).or_default();
                match extensions.iter_mut().find(|e| e.identifier == identifier) {
                    Some(existing) => existing.value = value.to_string(),
                    None => {
                        extensions.push(OfferingExtension {
                            offering: offering.to_string(),
                            identifier: identifier.to_string(),
                            value: value.to_string(),
                            disabled: false,
                        });
                        extensions.sort_by(|a, b| a.identifier.cmp(&b.identifier));
                    }
                }
            },
        );
        log_outcome("offering_extension_save", &target(offering, identifier), result)
    }

    pub fn disable_offering_extension(
        &self,
        offering: &str,
        identifier: &str,
        disabled: bool,
    ) -> SettingsResult<()> {
        self.ensure_offering(offering)?;

        let result = self.offering_extensions.write_through(
            || {
                self.sessions.try_execute(|tx| {
                    SqliteCapabilitiesRepository::new(tx)
                        .set_offering_extension_disabled(offering, identifier, disabled)
                })
            },
            |cached, _| {
                if let Some(existing) = cached
                    .get_mut(offering)
                    .and_then(|list| list.iter_mut().find(|e| e.identifier == identifier))
                {
                    existing.disabled = disabled;
                }
            },
        );
        log_outcome(
            "offering_extension_disable",
            &target(offering, identifier),
            result,
        )
    }

    pub fn delete_offering_extension(&self, offering: &str, identifier: &str) -> SettingsResult<()> {
        self.ensure_offering(offering)?;

        let result = self.offering_extensions.write_through(
            || {
                self.sessions.try_execute(|tx| {
                    SqliteCapabilitiesRepository::new(tx)
                        .delete_offering_extension(offering, identifier)
                })
            },
            |cached, _| {
                if let Some(list) = cached.get_mut(offering) {
                    list.retain(|e| e.identifier != identifier);
                    if list.is_empty() {
                        cached.remove(offering);
                    }
                }
            },
        );
        log_outcome(
            "offering_extension_delete",
            &target(offering, identifier),
            result,
        )
    }

    // Capabilities extensions

    /// Enabled capabilities extensions keyed by identifier.
    pub fn active_capabilities_extensions(&self) -> SettingsResult<CapabilitiesExtensionMap> {
        Ok(self
            .capabilities_snapshot()?
            .iter()
            .filter(|(_, extension)| extension.is_active())
            .map(|(id, extension)| (id.clone(), extension.clone()))
            .collect())
    }

    pub fn all_capabilities_extensions(&self) -> SettingsResult<CapabilitiesExtensionMap> {
        Ok(self.capabilities_snapshot()?.as_ref().clone())
    }

    pub fn save_capabilities_extension(&self, identifier: &str, value: &str) -> SettingsResult<()> {
        validate_identifier(identifier)?;

        let result = self.capabilities_extensions.write_through(
            || {
                self.sessions.try_execute(|tx| {
                    SqliteCapabilitiesRepository::new(tx)
                        .save_capabilities_extension(identifier, value)
                })
            },
            |cached, _| {
                cached
                    .entry(identifier.to_string())
                    .and_modify(|existing| existing.value = value.to_string())
                    .or_insert_with(|| CapabilitiesExtension {
                        identifier: identifier.to_string(),
                        value: value.to_string(),
                        disabled: false,
                    });
            },
        );
        log_outcome("capabilities_extension_save", identifier, result)
    }

    pub fn disable_capabilities_extension(
        &self,
        identifier: &str,
        disabled: bool,
    ) -> SettingsResult<()> {
        let result = self.capabilities_extensions.write_through(
            || {
                self.sessions.try_execute(|tx| {
                    SqliteCapabilitiesRepository::new(tx)
                        .set_capabilities_extension_disabled(identifier, disabled)
                })
            },
            |cached, _| {
                if let Some(existing) = cached.get_mut(identifier) {
                    existing.disabled = disabled;
                }
            },
        );
        log_outcome("capabilities_extension_disable", identifier, result)
    }

    pub fn delete_capabilities_extension(&self, identifier: &str) -> SettingsResult<()> {
        let result = self.capabilities_extensions.write_through(
            || {
                self.sessions.try_execute(|tx| {
                    SqliteCapabilitiesRepository::new(tx).delete_capabilities_extension(identifier)
                })
            },
            |cached, _| {
                cached.remove(identifier);
            },
        );
        log_outcome("capabilities_extension_delete", identifier, result)
    }

    /// Clears all persisted extension state and drops every cache.
    ///
    /// Cache locks are taken in declaration order; single-category writers
    /// only ever hold one of them.
    pub fn reset(&self) -> SettingsResult<()> {
        let result = self.active_static.write_and_invalidate(|| {
            self.capabilities_extensions.write_and_invalidate(|| {
                self.offering_extensions.write_and_invalidate(|| {
                    self.sessions
                        .try_execute(|tx| SqliteCapabilitiesRepository::new(tx).clear_all())
                })
            })
        });
        log_outcome("capabilities_reset", "all", result)
    }

    fn ensure_offering(&self, offering: &str) -> SettingsResult<()> {
        if self.offerings.has_offering(offering) {
            return Ok(());
        }
        warn!(
            "event=offering_check module=capabilities status=rejected offering={}",
            offering
        );
        Err(SettingsError::NoSuchOffering(offering.to_string()))
    }

    fn active_static_snapshot(&self) -> SettingsResult<Arc<Option<StaticCapabilities>>> {
        self.active_static.get_or_load(|| {
            self.sessions
                .try_execute(|tx| SqliteCapabilitiesRepository::new(tx).active_static_capabilities())
        })
    }

    fn capabilities_snapshot(&self) -> SettingsResult<Arc<CapabilitiesExtensionMap>> {
        self.capabilities_extensions.get_or_load(|| {
            self.sessions
                .try_execute(|tx| SqliteCapabilitiesRepository::new(tx).capabilities_extensions())
        })
    }

    fn offering_snapshot(&self) -> SettingsResult<Arc<OfferingExtensionMap>> {
        self.offering_extensions.get_or_load(|| {
            self.sessions
                .try_execute(|tx| SqliteCapabilitiesRepository::new(tx).offering_extensions())
        })
    }
}

fn target(offering: &str, identifier: &str) -> String {
    format!("{offering}/{identifier}")
}

fn log_outcome(event: &str, target: &str, result: SettingsResult<()>) -> SettingsResult<()> {
    match &result {
        Ok(()) => info!(
            "event={} module=capabilities status=ok target={}",
            event, target
        ),
        Err(err) if err.is_domain_error() => warn!(
            "event={} module=capabilities status=rejected target={} error={}",
            event, target, err
        ),
        Err(err) => error!(
            "event={} module=capabilities status=error target={} error={}",
            event, target, err
        ),
    }
    result
}
