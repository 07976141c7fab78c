use finwire_core::DataEnrichment;
use finwire_warehouse::Warehouse;

use super::CommandOutcome;
use crate::cli::EnrichmentsArgs;
use crate::error::CliError;

pub fn run(args: &EnrichmentsArgs, warehouse: &Warehouse) -> Result<CommandOutcome, CliError> {
    let enrichments = warehouse
        .enrichments_for(&args.kind, &args.id)?
        .into_iter()
        .map(DataEnrichment::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CommandOutcome::ok(serde_json::to_value(enrichments)?))
}
