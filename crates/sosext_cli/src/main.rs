//! Settings administration entry point.
//!
//! # Responsibility
//! - Open the configured settings store and run one administrative command.
//! - Print results as JSON on stdout and failures on stderr.

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::error;
use serde_json::{json, Value};
use sosext_core::{
    init_logging_from_config, ExtensionKey, InMemoryOfferingCatalog,
    SettingsConfig, SettingsContext,
};

use cli::{ActivationAction, Cli, Commands, ExtensionAction, StaticAction};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=cli_command module=cli status=error error={}", err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<String> {
    if let Commands::Ping = cli.command {
        return Ok(json!({
            "ping": sosext_core::ping(),
            "version": sosext_core::core_version(),
        })
        .to_string());
    }

    let mut config = match &cli.config {
        Some(path) => SettingsConfig::load(path)?,
        None => SettingsConfig::default(),
    };
    if let Some(db) = cli.db {
        config.database.path = Some(db);
    }
    if config.database.path.is_none() {
        return Err("no settings database given; pass --db or set database.path".into());
    }
    init_logging_from_config(&config.logging)?;

    let catalog = Arc::new(InMemoryOfferingCatalog::with_offerings(cli.served_offerings));
    let context = SettingsContext::open(&config, catalog)?;

    let output = match cli.command {
        Commands::Ping => Value::Null,
        Commands::Static { action } => run_static(&context, action)?,
        Commands::Extension { action } => run_extension(&context, action)?,
        Commands::Activation { action } => run_activation(&context, action)?,
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

fn run_static(context: &SettingsContext, action: StaticAction) -> CliResult<Value> {
    let service = context.capabilities();
    match action {
        StaticAction::List => Ok(json!({
            "active": service.active_static_capabilities()?,
            "identifiers": service.static_capabilities()?.keys().collect::<Vec<_>>(),
        })),
        StaticAction::Save { identifier, file } => {
            let document = std::fs::read_to_string(&file)
                .map_err(|err| format!("failed to read `{}`: {err}", file.display()))?;
            service.save_static_capabilities(&identifier, &document)?;
            Ok(json!({ "saved": identifier }))
        }
        StaticAction::Activate { identifier } => {
            service.set_active_static_capabilities(Some(&identifier))?;
            Ok(json!({ "active": identifier }))
        }
        StaticAction::Deactivate => {
            service.set_active_static_capabilities(None)?;
            Ok(json!({ "active": null }))
        }
        StaticAction::Delete { identifier } => {
            service.delete_static_capabilities(&identifier)?;
            Ok(json!({ "deleted": identifier }))
        }
    }
}

fn run_extension(context: &SettingsContext, action: ExtensionAction) -> CliResult<Value> {
    let service = context.capabilities();
    match action {
        ExtensionAction::List {
            active,
            per_offering,
        } => Ok(match (per_offering, active) {
            (true, true) => serde_json::to_value(service.active_offering_extensions()?)?,
            (true, false) => serde_json::to_value(service.offering_extensions()?)?,
            (false, true) => serde_json::to_value(service.active_capabilities_extensions()?)?,
            (false, false) => serde_json::to_value(service.all_capabilities_extensions()?)?,
        }),
        ExtensionAction::Save {
            identifier,
            value,
            offering,
        } => {
            match &offering {
                Some(offering) => service.save_offering_extension(offering, &identifier, &value)?,
                None => service.save_capabilities_extension(&identifier, &value)?,
            }
            Ok(json!({ "saved": identifier, "offering": offering }))
        }
        ExtensionAction::Disable {
            identifier,
            offering,
        } => set_disabled(context, &identifier, offering.as_deref(), true),
        ExtensionAction::Enable {
            identifier,
            offering,
        } => set_disabled(context, &identifier, offering.as_deref(), false),
        ExtensionAction::Delete {
            identifier,
            offering,
        } => {
            match &offering {
                Some(offering) => service.delete_offering_extension(offering, &identifier)?,
                None => service.delete_capabilities_extension(&identifier)?,
            }
            Ok(json!({ "deleted": identifier, "offering": offering }))
        }
    }
}

fn set_disabled(
    context: &SettingsContext,
    identifier: &str,
    offering: Option<&str>,
    disabled: bool,
) -> CliResult<Value> {
    let service = context.capabilities();
    match offering {
        Some(offering) => service.disable_offering_extension(offering, identifier, disabled)?,
        None => service.disable_capabilities_extension(identifier, disabled)?,
    }
    Ok(json!({ "identifier": identifier, "offering": offering, "disabled": disabled }))
}

fn run_activation(context: &SettingsContext, action: ActivationAction) -> CliResult<Value> {
    let activation = context.activation();
    match action {
        ActivationAction::Get {
            kind,
            service,
            version,
            name,
        } => {
            let key = ExtensionKey::new(service, version, name);
            let active = activation.is_active(kind, &key)?;
            Ok(json!({ "kind": kind.as_str(), "key": key, "active": active }))
        }
        ActivationAction::Set {
            kind,
            service,
            version,
            name,
            active,
        } => {
            let key = ExtensionKey::new(service, version, name);
            activation.set_active(kind, &key, active)?;
            Ok(json!({ "kind": kind.as_str(), "key": key, "active": active }))
        }
        ActivationAction::List { kind } => {
            Ok(json!({
                "kind": kind.as_str(),
                "entries": serde_json::to_value(activation.entries(kind)?)?,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::run;
    use crate::cli::Cli;
    use clap::Parser;
    use serde_json::{json, Value};
    use std::path::Path;

    fn run_args(db: &Path, args: &[&str]) -> Result<Value, String> {
        let mut argv = vec![
            "sosext".to_string(),
            "--db".to_string(),
            db.display().to_string(),
            "--served-offerings".to_string(),
            "off1".to_string(),
        ];
        argv.extend(args.iter().map(|arg| arg.to_string()));
        let cli = Cli::try_parse_from(argv).map_err(|err| err.to_string())?;
        let output = run(cli).map_err(|err| err.to_string())?;
        Ok(serde_json::from_str(&output).expect("json output"))
    }

    #[test]
    fn extension_commands_round_trip_through_the_store() {
        let dir = tempfile::tempdir().expect("temp dir");
        let db = dir.path().join("settings.db");

        run_args(&db, &["extension", "save", "inspire", "<i/>"]).expect("save");
        run_args(&db, &["extension", "save", "e1", "<e/>", "--offering", "off1"])
            .expect("save offering extension");
        run_args(&db, &["extension", "disable", "inspire"]).expect("disable");

        let all = run_args(&db, &["extension", "list"]).expect("list");
        assert_eq!(all["inspire"]["disabled"], true);
        assert_eq!(all["inspire"]["value"], "<i/>");
        assert_eq!(
            run_args(&db, &["extension", "list", "--active"]).expect("list active"),
            json!({})
        );

        let per_offering =
            run_args(&db, &["extension", "list", "--active", "--per-offering"]).expect("list");
        assert_eq!(per_offering["off1"][0]["identifier"], "e1");

        let err = run_args(&db, &["extension", "save", "e2", "<e/>", "--offering", "retired"])
            .expect_err("unknown offering");
        assert!(err.contains("no such offering"));
    }

    #[test]
    fn static_and_activation_commands_report_json() {
        let dir = tempfile::tempdir().expect("temp dir");
        let db = dir.path().join("settings.db");
        let document = dir.path().join("caps.xml");
        std::fs::write(&document, "<sos:Capabilities version=\"2.0.0\"/>").expect("write doc");
        let document = document.display().to_string();

        run_args(&db, &["static", "save", "a", &document]).expect("save static");
        run_args(&db, &["static", "activate", "a"]).expect("activate");
        assert_eq!(
            run_args(&db, &["static", "list"]).expect("list"),
            json!({ "active": "a", "identifiers": ["a"] })
        );
        run_args(&db, &["static", "deactivate"]).expect("deactivate");
        assert_eq!(
            run_args(&db, &["static", "list"]).expect("list")["active"],
            Value::Null
        );

        let key = ["SOS", "2.0.0", "GetObservation"];
        let mut set = vec!["activation", "set", "operation"];
        set.extend(key);
        set.push("false");
        run_args(&db, &set).expect("set activation");

        let mut get = vec!["activation", "get", "operation"];
        get.extend(key);
        let flag = run_args(&db, &get).expect("get activation");
        assert_eq!(flag["active"], false);
        assert_eq!(flag["key"]["discriminator"], "GetObservation");

        let listed = run_args(&db, &["activation", "list", "operation"]).expect("list");
        assert_eq!(listed["entries"].as_array().map(Vec::len), Some(1));
    }
}
