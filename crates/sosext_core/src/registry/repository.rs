//! Keyed provider repository with activation filtering.
//!
//! # Responsibility
//! - Index explicitly registered providers by `ExtensionKey`.
//! - Return only providers that are active right now.
//!
//! # Invariants
//! - The index is rebuilt off to the side and swapped in whole; readers see
//!   either the previous or the new index, never a partial one.
//! - A provider is active only when its key is active under the repository's
//!   `ActivationKind` and, for operation-bound providers, the operation key
//!   `(service, version, operation)` is active under `ActivationKind::Operation`.

use crate::error::{SettingsError, SettingsResult};
use crate::model::activatable::Activatable;
use crate::model::key::{ActivationKind, ExtensionKey};
use crate::registry::provider::{
    ActivationCheck, CapabilitiesExtensionProvider, ExtensionProvider, OfferingExtensionProvider,
    ProviderSource,
};
use log::{error, info, warn};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

pub type CapabilitiesExtensionRepository = ProviderRepository<dyn CapabilitiesExtensionProvider>;
pub type OfferingExtensionRepository = ProviderRepository<dyn OfferingExtensionProvider>;

struct ProviderIndex<P: ?Sized> {
    by_key: BTreeMap<ExtensionKey, Vec<Arc<P>>>,
}

impl<P: ?Sized> ProviderIndex<P> {
    fn empty() -> Self {
        Self {
            by_key: BTreeMap::new(),
        }
    }
}

/// Registry of providers for one activation kind.
pub struct ProviderRepository<P: ?Sized> {
    kind: ActivationKind,
    source: Box<dyn ProviderSource<P>>,
    activation: Arc<dyn ActivationCheck>,
    fail_if_empty: bool,
    index: RwLock<Arc<ProviderIndex<P>>>,
}

impl<P: ?Sized + ExtensionProvider + 'static> ProviderRepository<P> {
    /// Creates the repository and performs the initial load.
    ///
    /// # Errors
    /// - `Configuration` when the source yields no provider and
    ///   `fail_if_empty` is set.
    pub fn new(
        kind: ActivationKind,
        source: impl ProviderSource<P> + 'static,
        activation: Arc<dyn ActivationCheck>,
        fail_if_empty: bool,
    ) -> SettingsResult<Self> {
        let repository = Self {
            kind,
            source: Box::new(source),
            activation,
            fail_if_empty,
            index: RwLock::new(Arc::new(ProviderIndex::empty())),
        };
        repository.load(false)?;
        Ok(repository)
    }

    pub fn kind(&self) -> ActivationKind {
        self.kind
    }

    /// Re-enumerates the source and replaces the index.
    ///
    /// Returns the number of indexed providers. On error the previous index
    /// stays in place.
    pub fn load(&self, force_reload: bool) -> SettingsResult<usize> {
        let providers = self.source.discover(force_reload);
        if providers.is_empty() {
            if self.fail_if_empty {
                error!(
                    "event=registry_load module=registry status=error kind={} error_code=no_providers",
                    self.kind
                );
                return Err(SettingsError::Configuration(format!(
                    "no {} providers registered",
                    self.kind
                )));
            }
            warn!(
                "event=registry_load module=registry status=empty kind={}",
                self.kind
            );
        }

        let count = providers.len();
        let mut by_key: BTreeMap<ExtensionKey, Vec<Arc<P>>> = BTreeMap::new();
        for provider in providers {
            by_key
                .entry(provider.key().clone())
                .or_default()
                .push(provider);
        }
        let key_count = by_key.len();

        *self.index.write() = Arc::new(ProviderIndex { by_key });
        info!(
            "event=registry_load module=registry status=ok kind={} force_reload={} providers={} keys={}",
            self.kind, force_reload, count, key_count
        );
        Ok(count)
    }

    /// Reloads with `force_reload = true`.
    pub fn update(&self) -> SettingsResult<usize> {
        self.load(true)
    }

    /// Active providers registered under `key`.
    pub fn get(&self, key: &ExtensionKey) -> SettingsResult<Vec<Arc<P>>> {
        let index = self.snapshot();
        match index.by_key.get(key) {
            Some(providers) => self.active_providers(key, providers),
            None => Ok(Vec::new()),
        }
    }

    /// Active providers of every key belonging to `(service, version)`.
    pub fn get_for_service(&self, service: &str, version: &str) -> SettingsResult<Vec<Arc<P>>> {
        let index = self.snapshot();
        let start = ExtensionKey::new(service, version, "");
        let mut providers = Vec::new();

        for (key, registered) in index
            .by_key
            .range(start..)
            .take_while(|(key, _)| key.matches_service(service, version))
        {
            providers.extend(self.active_providers(key, registered)?);
        }

        Ok(providers)
    }

    /// Every provider under `key` with its effective activation state.
    pub fn providers_with_state(
        &self,
        key: &ExtensionKey,
    ) -> SettingsResult<Vec<Activatable<Arc<P>>>> {
        let index = self.snapshot();
        let Some(registered) = index.by_key.get(key) else {
            return Ok(Vec::new());
        };

        let key_active = self.is_active(key)?;
        let mut entries = Vec::with_capacity(registered.len());
        for provider in registered {
            let active = key_active && self.operation_active(key, provider.as_ref())?;
            entries.push(Activatable::new(Arc::clone(provider), active));
        }
        Ok(entries)
    }

    /// Activation flag of `key` itself, ignoring related operations.
    pub fn is_active(&self, key: &ExtensionKey) -> SettingsResult<bool> {
        self.activation.is_active(self.kind, key)
    }

    pub fn keys(&self) -> Vec<ExtensionKey> {
        self.snapshot().by_key.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().by_key.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().by_key.is_empty()
    }

    fn snapshot(&self) -> Arc<ProviderIndex<P>> {
        Arc::clone(&self.index.read())
    }

    fn active_providers(
        &self,
        key: &ExtensionKey,
        registered: &[Arc<P>],
    ) -> SettingsResult<Vec<Arc<P>>> {
        if !self.is_active(key)? {
            return Ok(Vec::new());
        }

        let mut active = Vec::with_capacity(registered.len());
        for provider in registered {
            if self.operation_active(key, provider.as_ref())? {
                active.push(Arc::clone(provider));
            }
        }
        Ok(active)
    }

    fn operation_active(&self, key: &ExtensionKey, provider: &P) -> SettingsResult<bool> {
        match provider.related_operation() {
            Some(operation) => self
                .activation
                .is_active(ActivationKind::Operation, &key.with_discriminator(operation)),
            None => Ok(true),
        }
    }
}

impl ProviderRepository<dyn CapabilitiesExtensionProvider> {
    /// Sections of every active provider for one service version.
    pub fn sections(&self, service: &str, version: &str) -> SettingsResult<Vec<String>> {
        Ok(self
            .get_for_service(service, version)?
            .iter()
            .map(|provider| provider.section())
            .collect())
    }
}

impl ProviderRepository<dyn OfferingExtensionProvider> {
    /// Extensions all active providers contribute to one offering.
    pub fn extensions_for(
        &self,
        service: &str,
        version: &str,
        offering: &str,
    ) -> SettingsResult<Vec<String>> {
        Ok(self
            .get_for_service(service, version)?
            .iter()
            .flat_map(|provider| provider.extensions_for(offering))
            .collect())
    }
}
