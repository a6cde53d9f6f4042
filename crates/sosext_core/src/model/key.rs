//! Composite lookup keys for registries and the activation store.
//!
//! # Invariants
//! - Keys are immutable after construction.
//! - Equality, hashing and ordering consider `service`, `version` and
//!   `discriminator`, in that order; ordering is plain lexicographic so that
//!   every key of one `(service, version)` pair forms a contiguous range.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Identifies one capability, extension, operation or format.
///
/// The discriminator is an operation name, a domain or an encoding
/// identifier depending on the [`ActivationKind`] the key is used with.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExtensionKey {
    service: String,
    version: String,
    discriminator: String,
}

impl ExtensionKey {
    pub fn new(
        service: impl Into<String>,
        version: impl Into<String>,
        discriminator: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            discriminator: discriminator.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    /// Returns `(service, version)`.
    pub fn service_version(&self) -> (&str, &str) {
        (&self.service, &self.version)
    }

    /// Returns whether this key belongs to the given service and version.
    pub fn matches_service(&self, service: &str, version: &str) -> bool {
        self.service == service && self.version == version
    }

    /// Builds a key for a sibling discriminator of the same service version.
    ///
    /// Used to derive the operation key a provider depends on.
    pub fn with_discriminator(&self, discriminator: impl Into<String>) -> Self {
        Self::new(
            self.service.clone(),
            self.version.clone(),
            discriminator.into(),
        )
    }
}

impl Display for ExtensionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.service, self.version, self.discriminator)
    }
}

/// Persisted activation record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationKind {
    /// Request operations; discriminator is the operation name.
    Operation,
    /// Observation response encodings.
    ResponseFormat,
    /// Procedure description encodings.
    ProcedureDescriptionFormat,
    /// Extended capabilities providers; discriminator is the domain.
    ExtendedCapabilities,
    /// Offering extension providers; discriminator is the domain.
    OfferingExtension,
}

pub const ACTIVATION_KIND_OPERATION: &str = "operation";
pub const ACTIVATION_KIND_RESPONSE_FORMAT: &str = "response_format";
pub const ACTIVATION_KIND_PROCEDURE_DESCRIPTION_FORMAT: &str = "procedure_description_format";
pub const ACTIVATION_KIND_EXTENDED_CAPABILITIES: &str = "extended_capabilities";
pub const ACTIVATION_KIND_OFFERING_EXTENSION: &str = "offering_extension";

impl ActivationKind {
    pub const ALL: [ActivationKind; 5] = [
        Self::Operation,
        Self::ResponseFormat,
        Self::ProcedureDescriptionFormat,
        Self::ExtendedCapabilities,
        Self::OfferingExtension,
    ];

    /// Stable string id used in configuration and CLI arguments.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Operation => ACTIVATION_KIND_OPERATION,
            Self::ResponseFormat => ACTIVATION_KIND_RESPONSE_FORMAT,
            Self::ProcedureDescriptionFormat => ACTIVATION_KIND_PROCEDURE_DESCRIPTION_FORMAT,
            Self::ExtendedCapabilities => ACTIVATION_KIND_EXTENDED_CAPABILITIES,
            Self::OfferingExtension => ACTIVATION_KIND_OFFERING_EXTENSION,
        }
    }

    /// Backing table for this record type.
    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::Operation => "operation_activations",
            Self::ResponseFormat => "response_format_activations",
            Self::ProcedureDescriptionFormat => "procedure_description_format_activations",
            Self::ExtendedCapabilities => "extended_capabilities_activations",
            Self::OfferingExtension => "offering_extension_activations",
        }
    }
}

impl Display for ActivationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses one activation kind from its stable string id.
pub fn parse_activation_kind(value: &str) -> Result<ActivationKind, UnknownActivationKind> {
    let normalized = value.trim();
    ActivationKind::ALL
        .into_iter()
        .find(|kind| kind.as_str() == normalized)
        .ok_or_else(|| UnknownActivationKind(normalized.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownActivationKind(pub String);

impl Display for UnknownActivationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown activation kind: {}", self.0)
    }
}

impl Error for UnknownActivationKind {}

#[cfg(test)]
mod tests {
    use super::{parse_activation_kind, ActivationKind, ExtensionKey, UnknownActivationKind};
    use std::collections::{BTreeSet, HashSet};

    #[test]
    fn equality_and_hash_consider_every_field() {
        let a = ExtensionKey::new("SOS", "2.0.0", "GetObservation");
        let b = ExtensionKey::new("SOS", "2.0.0", "GetObservation");
        let c = ExtensionKey::new("SOS", "1.0.0", "GetObservation");

        let set: HashSet<_> = [a.clone(), b, c.clone()].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));
        assert!(set.contains(&c));
    }

    #[test]
    fn ordering_groups_keys_by_service_version() {
        let keys: BTreeSet<_> = [
            ExtensionKey::new("SOS", "2.0.0", "b"),
            ExtensionKey::new("SOS", "1.0.0", "z"),
            ExtensionKey::new("SOS", "2.0.0", "a"),
        ]
        .into_iter()
        .collect();

        let ordered: Vec<_> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(ordered, vec!["SOS/1.0.0/z", "SOS/2.0.0/a", "SOS/2.0.0/b"]);
    }

    #[test]
    fn with_discriminator_keeps_service_version() {
        let key = ExtensionKey::new("SOS", "2.0.0", "crs");
        let operation = key.with_discriminator("GetCapabilities");
        assert!(operation.matches_service("SOS", "2.0.0"));
        assert_eq!(operation.discriminator(), "GetCapabilities");
    }

    #[test]
    fn parses_all_activation_kinds() {
        for kind in ActivationKind::ALL {
            assert_eq!(parse_activation_kind(kind.as_str()), Ok(kind));
        }
        assert_eq!(
            parse_activation_kind("binding"),
            Err(UnknownActivationKind("binding".to_string()))
        );
    }
}
