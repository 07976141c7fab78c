use finwire_core::{ExchangeRateLookup, ExchangeRateParams, ProviderSettings};

use super::CommandOutcome;
use crate::cli::RateArgs;
use crate::error::CliError;

/// Always prints a view; a degraded lookup still exits zero.
pub async fn run(args: &RateArgs, settings: &ProviderSettings) -> Result<CommandOutcome, CliError> {
    let params = ExchangeRateParams {
        from: args.from.clone(),
        to: args.to.clone(),
        date: args.date.clone(),
        provider: args.provider.clone(),
    };
    let view = ExchangeRateLookup::new(settings).lookup(&params).await;
    Ok(CommandOutcome::ok(serde_json::to_value(view)?))
}
