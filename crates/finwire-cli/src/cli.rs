//! CLI argument definitions for finwire.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rate` | Exchange rate between two currencies on a date |
//! | `security-price` | Closing price of a security |
//! | `providers` | Providers available per concept |
//! | `chat` | One chat turn against the configured LLM backend |
//! | `categorize` | AI categorization of a transaction batch |
//! | `detect-merchants` | AI merchant detection, optionally persisted |
//! | `enrichments` | Stored enrichments for an entity |
//! | `settings` | Read and write the settings store |
//!
//! # Examples
//!
//! ```bash
//! finwire rate --from EUR --to USD --date 2025-03-14
//! finwire providers --concept exchange-rates --pretty
//! finwire chat "What did I spend on groceries?" --stream
//! finwire settings set SYNTH_API_KEY sk_live_123
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Provider registry for personal-finance data vendors.
#[derive(Debug, Parser)]
#[command(name = "finwire", author, version, about)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Data directory holding the warehouse (defaults to FINWIRE_HOME or ~/.finwire).
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look up an exchange rate (USD to MXN today by default).
    ///
    ///   finwire rate
    ///   finwire rate --from EUR --to GBP --date 2024-12-31 --provider synth
    Rate(RateArgs),

    /// Fetch a security's closing price.
    SecurityPrice(SecurityPriceArgs),

    /// List available providers and their capabilities.
    Providers(ProvidersArgs),

    /// Send one chat turn to the configured LLM.
    Chat(ChatArgs),

    /// Auto-categorize transactions read from a JSON file.
    ///
    /// The file holds `{"transactions": [...], "user_categories": [...]}`.
    Categorize(BatchInputArgs),

    /// Detect merchants for transactions read from a JSON file.
    ///
    /// The file holds `{"transactions": [...], "user_merchants": [...]}`.
    DetectMerchants(DetectMerchantsArgs),

    /// Show stored enrichments for an entity.
    Enrichments(EnrichmentsArgs),

    /// Read or write the settings store.
    Settings(SettingsArgs),
}

#[derive(Debug, Args)]
pub struct RateArgs {
    #[arg(long)]
    pub from: Option<String>,

    #[arg(long)]
    pub to: Option<String>,

    /// Date as YYYY-MM-DD (defaults to today, UTC).
    #[arg(long)]
    pub date: Option<String>,

    /// Provider name; the highest-priority available provider when omitted.
    #[arg(long)]
    pub provider: Option<String>,
}

#[derive(Debug, Args)]
pub struct SecurityPriceArgs {
    pub symbol: String,

    /// Date as YYYY-MM-DD (defaults to today, UTC).
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub provider: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProvidersArgs {
    /// Restrict to one concept (e.g. exchange_rates, llm).
    #[arg(long)]
    pub concept: Option<String>,
}

#[derive(Debug, Args)]
pub struct ChatArgs {
    pub prompt: String,

    #[arg(long, default_value = "gpt-4.1")]
    pub model: String,

    #[arg(long)]
    pub instructions: Option<String>,

    /// Continue from an earlier response id.
    #[arg(long)]
    pub previous_response_id: Option<String>,

    /// Emit NDJSON events as chunks arrive.
    #[arg(long, default_value_t = false)]
    pub stream: bool,
}

#[derive(Debug, Args)]
pub struct BatchInputArgs {
    /// Path to the JSON input, or `-` for stdin.
    #[arg(long, short)]
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct DetectMerchantsArgs {
    #[command(flatten)]
    pub batch: BatchInputArgs,

    /// Store detected merchants and enrichments in the warehouse.
    #[arg(long, default_value_t = false)]
    pub persist: bool,
}

#[derive(Debug, Args)]
pub struct EnrichmentsArgs {
    pub id: String,

    #[arg(long, default_value = "transaction")]
    pub kind: String,
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Set { key: String, value: String },
    Get { key: String },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_rate_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["finwire", "rate", "--from", "eur", "--pretty"])
            .expect("valid arguments");
        assert!(cli.pretty);
        match cli.command {
            Command::Rate(args) => {
                assert_eq!(args.from.as_deref(), Some("eur"));
                assert_eq!(args.to, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn settings_get_requires_key() {
        assert!(Cli::try_parse_from(["finwire", "settings", "get"]).is_err());
    }
}
