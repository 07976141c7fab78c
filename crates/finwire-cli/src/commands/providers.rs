use finwire_core::{Capability, Concept, ProviderRegistry, ProviderSettings};
use serde::Serialize;

use super::CommandOutcome;
use crate::cli::ProvidersArgs;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct ConceptProviders {
    concept: Concept,
    providers: Vec<ProviderRow>,
}

#[derive(Debug, Serialize)]
struct ProviderRow {
    id: &'static str,
    capabilities: Vec<Capability>,
}

pub fn run(args: &ProvidersArgs, settings: &ProviderSettings) -> Result<CommandOutcome, CliError> {
    let concepts = match args.concept.as_deref() {
        Some(name) => vec![name.parse::<Concept>()?],
        None => Concept::ALL.to_vec(),
    };

    let rows = concepts
        .into_iter()
        .map(|concept| {
            let registry = ProviderRegistry::for_concept(concept, settings);
            let providers = registry
                .providers()
                .iter()
                .map(|id| {
                    let provider = registry.get_provider(*id)?;
                    Ok(ProviderRow {
                        id: id.as_str(),
                        capabilities: provider.capabilities().supported(),
                    })
                })
                .collect::<Result<Vec<_>, CliError>>()?;
            Ok(ConceptProviders { concept, providers })
        })
        .collect::<Result<Vec<_>, CliError>>()?;

    Ok(CommandOutcome::ok(serde_json::to_value(rows)?))
}
