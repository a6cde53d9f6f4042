//! Capabilities extension, offering extension and static capabilities records.
//!
//! # Responsibility
//! - Define the persisted record shapes managed by the settings facade.
//! - Validate identifiers and static capabilities documents before writes.
//!
//! # Invariants
//! - Identifiers are non-blank and contain no whitespace.
//! - Static capabilities documents carry a `Capabilities` element, optionally
//!   namespace-prefixed.

use crate::error::{SettingsError, SettingsResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S+$").expect("valid identifier regex"));
static CAPABILITIES_ROOT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(?:[A-Za-z_][\w.\-]*:)?Capabilities[\s/>]").expect("valid capabilities regex")
});

/// Curated capabilities document substituted for the generated one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticCapabilities {
    pub identifier: String,
    pub document: String,
}

/// Global section added to every capabilities document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitiesExtension {
    pub identifier: String,
    pub value: String,
    pub disabled: bool,
}

impl CapabilitiesExtension {
    pub fn is_active(&self) -> bool {
        !self.disabled
    }
}

/// Extension attached to one offering's capabilities entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferingExtension {
    pub offering: String,
    pub identifier: String,
    pub value: String,
    pub disabled: bool,
}

impl OfferingExtension {
    pub fn is_active(&self) -> bool {
        !self.disabled
    }
}

/// Rejects blank identifiers and identifiers containing whitespace.
pub fn validate_identifier(value: &str) -> SettingsResult<()> {
    if IDENTIFIER_RE.is_match(value) {
        Ok(())
    } else {
        Err(SettingsError::InvalidIdentifier(value.to_string()))
    }
}

/// Checks that a document looks like a capabilities document.
pub fn validate_capabilities_document(document: &str) -> SettingsResult<()> {
    if document.trim().is_empty() {
        return Err(SettingsError::InvalidDocument(
            "document must not be empty".to_string(),
        ));
    }
    if !CAPABILITIES_ROOT_RE.is_match(document) {
        return Err(SettingsError::InvalidDocument(
            "document has no Capabilities element".to_string(),
        ));
    }
    Ok(())
}
