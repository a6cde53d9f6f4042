//! Cached activation flags for operations, encodings and extension providers.
//!
//! # Responsibility
//! - Answer "is this key active" per `ActivationKind`, falling back to the
//!   configured default when nothing is persisted.
//! - Persist flag changes and keep the per-kind cache coherent with the store.
//!
//! # Invariants
//! - Every kind has its own cache and lock.
//! - Cache updates happen only after the store transaction committed.

use crate::cache::LazyCache;
use crate::config::ActivationDefaults;
use crate::db::SessionFactory;
use crate::error::{SettingsError, SettingsResult};
use crate::model::activatable::Activatable;
use crate::model::key::{ActivationKind, ExtensionKey};
use crate::registry::provider::ActivationCheck;
use crate::repo::activation_repo::{ActivationRepository, SqliteActivationRepository};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

type FlagMap = BTreeMap<ExtensionKey, bool>;

struct ActivationCaches {
    operation: LazyCache<FlagMap>,
    response_format: LazyCache<FlagMap>,
    procedure_description_format: LazyCache<FlagMap>,
    extended_capabilities: LazyCache<FlagMap>,
    offering_extension: LazyCache<FlagMap>,
}

impl ActivationCaches {
    fn new() -> Self {
        Self {
            operation: LazyCache::new("operation_activations"),
            response_format: LazyCache::new("response_format_activations"),
            procedure_description_format: LazyCache::new(
                "procedure_description_format_activations",
            ),
            extended_capabilities: LazyCache::new("extended_capabilities_activations"),
            offering_extension: LazyCache::new("offering_extension_activations"),
        }
    }

    fn get(&self, kind: ActivationKind) -> &LazyCache<FlagMap> {
        match kind {
            ActivationKind::Operation => &self.operation,
            ActivationKind::ResponseFormat => &self.response_format,
            ActivationKind::ProcedureDescriptionFormat => &self.procedure_description_format,
            ActivationKind::ExtendedCapabilities => &self.extended_capabilities,
            ActivationKind::OfferingExtension => &self.offering_extension,
        }
    }
}

/// Activation facade shared by registries and administrative callers.
pub struct ActivationService {
    sessions: Arc<SessionFactory>,
    defaults: ActivationDefaults,
    caches: ActivationCaches,
}

impl ActivationService {
    pub fn new(sessions: Arc<SessionFactory>, defaults: ActivationDefaults) -> Self {
        Self {
            sessions,
            defaults,
            caches: ActivationCaches::new(),
        }
    }

    pub fn defaults(&self) -> &ActivationDefaults {
        &self.defaults
    }

    /// Returns the persisted flag, or the configured default for `kind`.
    pub fn is_active(&self, kind: ActivationKind, key: &ExtensionKey) -> SettingsResult<bool> {
        self.is_active_or(kind, key, self.defaults.default_for(kind))
    }

    /// Returns the persisted flag, or `default_active` when none is stored.
    pub fn is_active_or(
        &self,
        kind: ActivationKind,
        key: &ExtensionKey,
        default_active: bool,
    ) -> SettingsResult<bool> {
        Ok(self
            .flags(kind)?
            .get(key)
            .copied()
            .unwrap_or(default_active))
    }

    /// Persists one activation flag.
    pub fn set_active(
        &self,
        kind: ActivationKind,
        key: &ExtensionKey,
        active: bool,
    ) -> SettingsResult<()> {
        validate_key(key)?;

        let result = self.caches.get(kind).write_through(
            || {
                self.sessions.try_execute(|tx| {
                    SqliteActivationRepository::new(tx).set_active(kind, key, active)
                })
            },
            |flags, _changed| {
                flags.insert(key.clone(), active);
            },
        );

        match result {
            Ok(changed) => {
                info!(
                    "event=activation_set module=activation status=ok kind={} key={} active={} changed={}",
                    kind, key, active, changed
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=activation_set module=activation status=error kind={} key={} error={}",
                    kind, key, err
                );
                Err(err)
            }
        }
    }

    /// Removes a persisted flag so the default applies again.
    pub fn delete(&self, kind: ActivationKind, key: &ExtensionKey) -> SettingsResult<()> {
        let result = self.caches.get(kind).write_through(
            || {
                self.sessions
                    .try_execute(|tx| SqliteActivationRepository::new(tx).delete(kind, key))
            },
            |flags, _| {
                flags.remove(key);
            },
        );

        match &result {
            Ok(()) => info!(
                "event=activation_delete module=activation status=ok kind={} key={}",
                kind, key
            ),
            Err(err) if err.is_domain_error() => warn!(
                "event=activation_delete module=activation status=rejected kind={} key={} error={}",
                kind, key, err
            ),
            Err(err) => error!(
                "event=activation_delete module=activation status=error kind={} key={} error={}",
                kind, key, err
            ),
        }
        result
    }

    /// Persisted keys of one kind, in key order.
    pub fn keys(&self, kind: ActivationKind) -> SettingsResult<Vec<ExtensionKey>> {
        Ok(self.flags(kind)?.keys().cloned().collect())
    }

    /// Persisted keys of one kind together with their flags.
    pub fn entries(&self, kind: ActivationKind) -> SettingsResult<Vec<Activatable<ExtensionKey>>> {
        Ok(self
            .flags(kind)?
            .iter()
            .map(|(key, active)| Activatable::new(key.clone(), *active))
            .collect())
    }

    /// Drops every persisted flag of every kind.
    pub fn reset(&self) -> SettingsResult<()> {
        for kind in ActivationKind::ALL {
            let removed = self.caches.get(kind).write_and_invalidate(|| {
                self.sessions
                    .try_execute(|tx| SqliteActivationRepository::new(tx).clear(kind))
            })?;
            info!(
                "event=activation_reset module=activation status=ok kind={} removed={}",
                kind, removed
            );
        }
        Ok(())
    }

    fn flags(&self, kind: ActivationKind) -> SettingsResult<Arc<FlagMap>> {
        self.caches.get(kind).get_or_load(|| {
            self.sessions.try_execute(|tx| {
                Ok(SqliteActivationRepository::new(tx)
                    .list(kind)?
                    .into_iter()
                    .map(|entry| {
                        let active = entry.is_active();
                        (entry.into_inner(), active)
                    })
                    .collect())
            })
        })
    }
}

impl ActivationCheck for ActivationService {
    fn is_active(&self, kind: ActivationKind, key: &ExtensionKey) -> SettingsResult<bool> {
        ActivationService::is_active(self, kind, key)
    }
}

fn validate_key(key: &ExtensionKey) -> SettingsResult<()> {
    for field in [key.service(), key.version(), key.discriminator()] {
        if field.trim().is_empty() {
            return Err(SettingsError::InvalidIdentifier(key.to_string()));
        }
    }
    Ok(())
}
