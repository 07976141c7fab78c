use finwire_core::{
    Concept, MerchantDetectionJob, ProviderRegistry, ProviderSettings, TransactionInput,
    UserCategory, UserMerchant,
};
use finwire_warehouse::Warehouse;
use serde::Deserialize;

use super::{read_json_input, CommandOutcome};
use crate::cli::{BatchInputArgs, DetectMerchantsArgs};
use crate::error::CliError;

#[derive(Debug, Deserialize)]
struct CategorizeInput {
    transactions: Vec<TransactionInput>,
    #[serde(default)]
    user_categories: Vec<UserCategory>,
}

#[derive(Debug, Deserialize)]
struct DetectInput {
    transactions: Vec<TransactionInput>,
    #[serde(default)]
    user_merchants: Vec<UserMerchant>,
}

pub async fn categorize(
    args: &BatchInputArgs,
    settings: &ProviderSettings,
) -> Result<CommandOutcome, CliError> {
    let input: CategorizeInput = read_json_input(&args.input)?;
    let provider = ProviderRegistry::for_concept(Concept::Llm, settings).first_provider()?;
    let envelope = provider
        .auto_categorize(input.transactions, input.user_categories)
        .await;
    CommandOutcome::envelope(&envelope)
}

pub async fn detect(
    args: &DetectMerchantsArgs,
    settings: &ProviderSettings,
) -> Result<CommandOutcome, CliError> {
    let input: DetectInput = read_json_input(&args.batch.input)?;
    let provider = ProviderRegistry::for_concept(Concept::Llm, settings).first_provider()?;
    let envelope = provider
        .auto_detect_merchants(input.transactions, input.user_merchants)
        .await;
    CommandOutcome::envelope(&envelope)
}

pub async fn detect_and_persist(
    args: &DetectMerchantsArgs,
    settings: &ProviderSettings,
    warehouse: &Warehouse,
) -> Result<CommandOutcome, CliError> {
    let input: DetectInput = read_json_input(&args.batch.input)?;
    let stored = MerchantDetectionJob::new(settings, warehouse)
        .run(input.transactions, input.user_merchants)
        .await?;
    Ok(CommandOutcome::ok(serde_json::to_value(stored)?))
}
