use finwire_core::settings::SETTING_KEYS;
use finwire_warehouse::Warehouse;
use serde_json::json;

use super::CommandOutcome;
use crate::cli::{SettingsArgs, SettingsCommand};
use crate::error::CliError;

pub fn run(args: &SettingsArgs, warehouse: &Warehouse) -> Result<CommandOutcome, CliError> {
    match &args.command {
        SettingsCommand::Set { key, value } => {
            let key = known_key(key)?;
            warehouse.set_setting(key, value)?;
            Ok(CommandOutcome::ok(json!({ "key": key, "stored": true })))
        }
        SettingsCommand::Get { key } => {
            let key = known_key(key)?;
            let value = warehouse.setting(key)?;
            Ok(CommandOutcome::ok(json!({ "key": key, "value": value })))
        }
    }
}

fn known_key(key: &str) -> Result<&'static str, CliError> {
    let wanted = key.trim().to_ascii_uppercase();
    SETTING_KEYS
        .into_iter()
        .find(|candidate| *candidate == wanted)
        .ok_or_else(|| {
            CliError::Command(format!(
                "unknown setting '{key}', expected one of {}",
                SETTING_KEYS.join(", ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_case_insensitive_and_closed() {
        assert_eq!(known_key("synth_api_key").ok(), Some("SYNTH_API_KEY"));
        assert!(matches!(known_key("HOME"), Err(CliError::Command(_))));
    }
}
