//! Provider contracts for capabilities and offering extensions.

use crate::error::SettingsResult;
use crate::model::key::{ActivationKind, ExtensionKey};
use std::sync::Arc;

/// Activation lookup consulted by provider repositories.
pub trait ActivationCheck: Send + Sync {
    fn is_active(&self, kind: ActivationKind, key: &ExtensionKey) -> SettingsResult<bool>;
}

/// Common contract of every registered provider.
pub trait ExtensionProvider: Send + Sync {
    /// Registry key `(service, version, domain)` of this provider.
    fn key(&self) -> &ExtensionKey;

    /// Name of the request operation this provider belongs to, if any.
    fn related_operation(&self) -> Option<&str> {
        None
    }

    fn has_related_operation(&self) -> bool {
        self.related_operation().is_some()
    }
}

/// Contributes one section to the capabilities document.
pub trait CapabilitiesExtensionProvider: ExtensionProvider {
    /// Encoded section content.
    fn section(&self) -> String;
}

/// Contributes extensions to individual offerings.
pub trait OfferingExtensionProvider: ExtensionProvider {
    /// Encoded extensions for one offering; empty when none apply.
    fn extensions_for(&self, offering: &str) -> Vec<String>;
}

/// Explicit provider registration used in place of runtime discovery.
pub trait ProviderSource<P: ?Sized>: Send + Sync {
    /// Enumerates providers. `force_reload` asks sources with their own
    /// backing state to re-read it.
    fn discover(&self, force_reload: bool) -> Vec<Arc<P>>;
}

/// Fixed provider list assembled by the host at startup.
pub struct StaticProviderSource<P: ?Sized> {
    providers: Vec<Arc<P>>,
}

impl<P: ?Sized> StaticProviderSource<P> {
    pub fn new(providers: Vec<Arc<P>>) -> Self {
        Self { providers }
    }
}

impl<P: ?Sized + Send + Sync> ProviderSource<P> for StaticProviderSource<P> {
    fn discover(&self, _force_reload: bool) -> Vec<Arc<P>> {
        self.providers.clone()
    }
}

impl<P, F> ProviderSource<P> for F
where
    P: ?Sized,
    F: Fn(bool) -> Vec<Arc<P>> + Send + Sync,
{
    fn discover(&self, force_reload: bool) -> Vec<Arc<P>> {
        self(force_reload)
    }
}
