use finwire_core::{Concept, ProviderRegistry, ProviderSettings, Symbol};

use super::{date_or_today, CommandOutcome};
use crate::cli::SecurityPriceArgs;
use crate::error::CliError;

pub async fn run(
    args: &SecurityPriceArgs,
    settings: &ProviderSettings,
) -> Result<CommandOutcome, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let date = date_or_today(args.date.as_deref())?;

    let registry = ProviderRegistry::for_concept(Concept::Securities, settings);
    let provider = match args.provider.as_deref() {
        Some(name) => registry.get_provider_by_name(name)?,
        None => registry.first_provider()?,
    };

    let envelope = provider.fetch_security_price(symbol, date).await;
    CommandOutcome::envelope(&envelope)
}
