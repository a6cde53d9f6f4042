//! Settings subsystem configuration.
//!
//! # Responsibility
//! - Describe storage location, logging, registry and activation defaults.
//! - Parse and validate TOML configuration files.
//!
//! # Invariants
//! - Every section is optional; missing values fall back to `Default`.
//! - Unknown keys are rejected so typos do not silently change behavior.

use crate::logging::{default_log_level, normalize_level};
use crate::model::key::ActivationKind;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub registry: RegistryConfig,
    pub activation: ActivationDefaults,
}

/// Settings database location. No path means a private in-memory database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute log directory; file logging stays off when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Fail registry construction when no provider is registered.
    pub fail_if_empty: bool,
}

/// Activation state assumed for keys without a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActivationDefaults {
    pub operation: bool,
    pub response_format: bool,
    pub procedure_description_format: bool,
    pub extended_capabilities: bool,
    pub offering_extension: bool,
}

impl Default for ActivationDefaults {
    fn default() -> Self {
        Self {
            operation: true,
            response_format: true,
            procedure_description_format: true,
            extended_capabilities: true,
            offering_extension: true,
        }
    }
}

impl ActivationDefaults {
    pub fn default_for(&self, kind: ActivationKind) -> bool {
        match kind {
            ActivationKind::Operation => self.operation,
            ActivationKind::ResponseFormat => self.response_format,
            ActivationKind::ProcedureDescriptionFormat => self.procedure_description_format,
            ActivationKind::ExtendedCapabilities => self.extended_capabilities,
            ActivationKind::OfferingExtension => self.offering_extension,
        }
    }
}

impl SettingsConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(value: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(value).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.logging.level).map_err(ConfigError::Invalid)?;
        if let Some(dir) = &self.logging.dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "logging.dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        if let Some(path) = &self.database.path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "database.path must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, SettingsConfig};
    use crate::model::key::ActivationKind;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn empty_document_yields_defaults() {
        let config = SettingsConfig::from_toml_str("").expect("empty config");
        assert_eq!(config, SettingsConfig::default());
        assert!(config.database.path.is_none());
        assert!(!config.registry.fail_if_empty);
        for kind in ActivationKind::ALL {
            assert!(config.activation.default_for(kind));
        }
    }

    #[test]
    fn parses_all_sections() {
        let config = SettingsConfig::from_toml_str(
            r#"
            [database]
            path = "/var/lib/sos/settings.db"

            [logging]
            level = "WARN"
            dir = "/var/log/sos"

            [registry]
            fail_if_empty = true

            [activation]
            extended_capabilities = false
            "#,
        )
        .expect("full config");

        assert_eq!(
            config.database.path,
            Some(PathBuf::from("/var/lib/sos/settings.db"))
        );
        assert!(config.registry.fail_if_empty);
        assert!(!config
            .activation
            .default_for(ActivationKind::ExtendedCapabilities));
        assert!(config.activation.default_for(ActivationKind::Operation));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        let err = SettingsConfig::from_toml_str("[registry]\nfail_if_emtpy = true\n")
            .expect_err("typo must be rejected");
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = SettingsConfig::from_toml_str("[logging]\nlevel = \"loud\"\n")
            .expect_err("unknown level must be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SettingsConfig::from_toml_str("[logging]\ndir = \"logs\"\n")
            .expect_err("relative log dir must be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[registry]\nfail_if_empty = true").expect("write config");

        let config = SettingsConfig::load(file.path()).expect("load config");
        assert!(config.registry.fail_if_empty);

        let err = SettingsConfig::load("/nonexistent/sosext.toml").expect_err("missing file");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
