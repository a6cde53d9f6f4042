//! CLI definitions for the settings tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sosext_core::model::key::parse_activation_kind;
use sosext_core::ActivationKind;

/// Administer SOS capabilities extensions and activation flags.
#[derive(Parser)]
#[command(name = "sosext")]
#[command(version)]
pub(crate) struct Cli {
    /// Settings database file; overrides `database.path` from the config
    #[arg(long, env = "SOSEXT_DB", global = true)]
    pub db: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "SOSEXT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Offerings currently served, comma separated
    #[arg(
        long = "served-offerings",
        env = "SOSEXT_OFFERINGS",
        value_delimiter = ',',
        global = true
    )]
    pub served_offerings: Vec<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Check core linkage
    Ping,

    /// Static capabilities documents
    Static {
        #[command(subcommand)]
        action: StaticAction,
    },

    /// Capabilities and offering extensions
    Extension {
        #[command(subcommand)]
        action: ExtensionAction,
    },

    /// Activation flags
    Activation {
        #[command(subcommand)]
        action: ActivationAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum StaticAction {
    /// List stored documents and the active identifier
    List,

    /// Store a document read from a file
    Save { identifier: String, file: PathBuf },

    /// Serve the given document instead of the generated one
    Activate { identifier: String },

    /// Serve the generated capabilities again
    Deactivate,

    /// Remove a stored document
    Delete { identifier: String },
}

#[derive(Subcommand)]
pub(crate) enum ExtensionAction {
    /// List extensions
    List {
        /// Only enabled extensions
        #[arg(long)]
        active: bool,

        /// List offering extensions instead of capabilities extensions
        #[arg(long = "per-offering")]
        per_offering: bool,
    },

    /// Store an extension value
    Save {
        identifier: String,
        value: String,

        /// Attach to this offering instead of the whole document
        #[arg(long)]
        offering: Option<String>,
    },

    /// Disable an extension
    Disable {
        identifier: String,
        #[arg(long)]
        offering: Option<String>,
    },

    /// Enable a disabled extension
    Enable {
        identifier: String,
        #[arg(long)]
        offering: Option<String>,
    },

    /// Remove an extension
    Delete {
        identifier: String,
        #[arg(long)]
        offering: Option<String>,
    },
}

#[derive(Subcommand)]
pub(crate) enum ActivationAction {
    /// Effective flag for one key
    Get {
        #[arg(value_parser = parse_kind)]
        kind: ActivationKind,
        service: String,
        version: String,
        name: String,
    },

    /// Persist a flag for one key
    Set {
        #[arg(value_parser = parse_kind)]
        kind: ActivationKind,
        service: String,
        version: String,
        name: String,
        #[arg(action = clap::ArgAction::Set)]
        active: bool,
    },

    /// Persisted flags of one kind
    List {
        #[arg(value_parser = parse_kind)]
        kind: ActivationKind,
    },
}

/// Accepts the stable kind ids, e.g. `operation` or `response_format`.
fn parse_kind(value: &str) -> Result<ActivationKind, String> {
    parse_activation_kind(value).map_err(|err| err.to_string())
}
