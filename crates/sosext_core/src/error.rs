//! Error taxonomy for settings, activation and registry operations.
//!
//! # Invariants
//! - `NoSuchExtension` and `NoSuchOffering` are domain conditions callers are
//!   expected to handle.
//! - `Connectivity` always means the store transaction was rolled back.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SettingsResult<T> = Result<T, SettingsError>;

#[derive(Debug)]
pub enum SettingsError {
    /// Referenced extension, static capabilities or activation key is unknown.
    NoSuchExtension(String),
    /// Referenced offering is absent from the live offering catalog.
    NoSuchOffering(String),
    /// Underlying store or transaction failure.
    Connectivity(DbError),
    /// Registry could not be set up as configured.
    Configuration(String),
    InvalidIdentifier(String),
    InvalidDocument(String),
    /// Persisted row violates a value invariant.
    InvalidData(String),
}

impl SettingsError {
    /// Returns whether this is a checked domain condition rather than a
    /// store or setup failure.
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            Self::NoSuchExtension(_)
                | Self::NoSuchOffering(_)
                | Self::InvalidIdentifier(_)
                | Self::InvalidDocument(_)
        )
    }
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSuchExtension(id) => write!(f, "no such extension: {id}"),
            Self::NoSuchOffering(id) => write!(f, "no such offering: {id}"),
            Self::Connectivity(err) => write!(f, "settings store failure: {err}"),
            Self::Configuration(message) => write!(f, "configuration error: {message}"),
            Self::InvalidIdentifier(value) => write!(f, "invalid identifier: `{value}`"),
            Self::InvalidDocument(message) => {
                write!(f, "invalid static capabilities document: {message}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted settings data: {message}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connectivity(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for SettingsError {
    fn from(value: DbError) -> Self {
        Self::Connectivity(value)
    }
}

impl From<rusqlite::Error> for SettingsError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Connectivity(DbError::Sqlite(value))
    }
}
