//! Offering existence checks against the live content cache.

use parking_lot::RwLock;
use std::collections::BTreeSet;

/// Read-only view of the offerings currently served.
pub trait OfferingCatalog: Send + Sync {
    fn has_offering(&self, offering: &str) -> bool;
    fn offerings(&self) -> BTreeSet<String>;
}

/// Offering set kept in memory and refreshed by the host.
#[derive(Debug, Default)]
pub struct InMemoryOfferingCatalog {
    offerings: RwLock<BTreeSet<String>>,
}

impl InMemoryOfferingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offerings<I, S>(offerings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            offerings: RwLock::new(offerings.into_iter().map(Into::into).collect()),
        }
    }

    /// Returns `false` when the offering was already known.
    pub fn insert(&self, offering: impl Into<String>) -> bool {
        self.offerings.write().insert(offering.into())
    }

    pub fn remove(&self, offering: &str) -> bool {
        self.offerings.write().remove(offering)
    }

    pub fn replace_all<I, S>(&self, offerings: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let replacement = offerings.into_iter().map(Into::into).collect();
        *self.offerings.write() = replacement;
    }
}

impl OfferingCatalog for InMemoryOfferingCatalog {
    fn has_offering(&self, offering: &str) -> bool {
        self.offerings.read().contains(offering)
    }

    fn offerings(&self) -> BTreeSet<String> {
        self.offerings.read().clone()
    }
}
