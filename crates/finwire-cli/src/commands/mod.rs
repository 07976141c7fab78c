mod ai;
mod chat;
mod enrichments;
mod providers;
mod rate;
mod security_price;
mod settings;

use std::io::Read;
use std::path::Path;

use finwire_core::{Envelope, ProviderSettings};
use finwire_warehouse::{Warehouse, WarehouseConfig, WarehouseError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// What a command produced and whether it should exit non-zero.
pub struct CommandOutcome {
    /// Printed to stdout; `None` when the command wrote its own output.
    pub data: Option<Value>,
    pub failed: bool,
}

impl CommandOutcome {
    pub fn ok(data: Value) -> Self {
        Self {
            data: Some(data),
            failed: false,
        }
    }

    /// Prints the whole envelope; a failed envelope exits with code 3.
    pub fn envelope<T: Serialize>(envelope: &Envelope<T>) -> Result<Self, CliError> {
        Ok(Self {
            data: Some(serde_json::to_value(envelope)?),
            failed: !envelope.is_success(),
        })
    }

    pub fn streamed(failed: bool) -> Self {
        Self { data: None, failed }
    }
}

pub async fn run(cli: &Cli) -> Result<CommandOutcome, CliError> {
    let warehouse = open_warehouse(cli.home.as_deref());
    let settings = load_settings(&warehouse);

    match &cli.command {
        Command::Rate(args) => rate::run(args, &settings).await,
        Command::SecurityPrice(args) => security_price::run(args, &settings).await,
        Command::Providers(args) => providers::run(args, &settings),
        Command::Chat(args) => chat::run(args, &settings).await,
        Command::Categorize(args) => ai::categorize(args, &settings).await,
        Command::DetectMerchants(args) => {
            if args.persist {
                ai::detect_and_persist(args, &settings, &warehouse?).await
            } else {
                ai::detect(args, &settings).await
            }
        }
        Command::Enrichments(args) => enrichments::run(args, &warehouse?),
        Command::Settings(args) => settings::run(args, &warehouse?),
    }
}

fn open_warehouse(home: Option<&Path>) -> Result<Warehouse, WarehouseError> {
    let config = match home {
        Some(home) => WarehouseConfig::at(home),
        None => WarehouseConfig::default(),
    };
    Warehouse::open(config)
}

/// Environment plus the settings store; environment only if the store is unreadable.
fn load_settings(warehouse: &Result<Warehouse, WarehouseError>) -> ProviderSettings {
    let loaded = match warehouse {
        Ok(warehouse) => ProviderSettings::load(warehouse),
        Err(error) => {
            warn!(%error, "warehouse unavailable; using environment settings only");
            return ProviderSettings::from_env();
        }
    };
    loaded.unwrap_or_else(|error| {
        warn!(%error, "settings store unreadable; using environment settings only");
        ProviderSettings::from_env()
    })
}

/// Reads JSON from `path`, or from stdin when `path` is `-`.
fn read_json_input<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&raw)?)
}

/// Parses an optional `YYYY-MM-DD` argument, defaulting to today (UTC).
fn date_or_today(raw: Option<&str>) -> Result<time::Date, CliError> {
    match raw {
        Some(raw) => Ok(finwire_core::parse_date(raw)?),
        None => Ok(time::OffsetDateTime::now_utc().date()),
    }
}
