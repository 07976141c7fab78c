//! Persists AI merchant detection results.
//!
//! Each detected business becomes a `ProviderMerchant` with source `ai`
//! (reused when one with the same name exists) and a `merchant_id`
//! enrichment on the transaction, attributed to `ai`.

use finwire_warehouse::{NewEnrichment, NewProviderMerchant, Warehouse};
use serde::Serialize;
use tracing::debug;

use crate::{
    Concept, CoreError, DataEnrichment, EnrichableRef, EnrichmentSource, MerchantSource,
    ProviderError, ProviderId, ProviderMerchant, ProviderRegistry, ProviderSettings,
    TransactionInput, UserMerchant,
};

pub const MERCHANT_ID_ATTRIBUTE: &str = "merchant_id";

/// Outcome for one transaction that had a detectable business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedMerchant {
    pub transaction_id: String,
    pub merchant: ProviderMerchant,
    pub enrichment: DataEnrichment,
}

pub struct MerchantDetectionJob<'w> {
    registry: ProviderRegistry,
    warehouse: &'w Warehouse,
}

impl<'w> MerchantDetectionJob<'w> {
    pub fn new(settings: &ProviderSettings, warehouse: &'w Warehouse) -> Self {
        Self::with_registry(ProviderRegistry::for_concept(Concept::Llm, settings), warehouse)
    }

    pub fn with_registry(registry: ProviderRegistry, warehouse: &'w Warehouse) -> Self {
        Self {
            registry,
            warehouse,
        }
    }

    /// Detects merchants for `transactions` and stores the results.
    ///
    /// Transactions without a detected business are skipped. Nothing is
    /// written when the provider call fails.
    pub async fn run(
        &self,
        transactions: Vec<TransactionInput>,
        user_merchants: Vec<UserMerchant>,
    ) -> Result<Vec<DetectedMerchant>, CoreError> {
        let provider = self.registry.get_provider(ProviderId::OpenAi)?;
        let detected = provider
            .auto_detect_merchants(transactions, user_merchants)
            .await
            .into_result()
            .map_err(ProviderError::from)?;

        let mut stored = Vec::new();
        for result in detected {
            let Some(name) = result.business_name else {
                continue;
            };
            let record = self
                .warehouse
                .find_or_create_provider_merchant(&NewProviderMerchant {
                    name,
                    source: MerchantSource::Ai.as_str().to_owned(),
                    website_url: result.business_url,
                    logo_url: None,
                })?;
            let merchant = ProviderMerchant::try_from(record)?;

            let enrichable = EnrichableRef::transaction(&result.transaction_id);
            let enrichment = self.warehouse.record_enrichment(&NewEnrichment {
                enrichable_type: enrichable.kind,
                enrichable_id: enrichable.id,
                source: EnrichmentSource::Ai.as_str().to_owned(),
                attribute_name: String::from(MERCHANT_ID_ATTRIBUTE),
                value: Some(merchant.id.clone()),
            })?;

            stored.push(DetectedMerchant {
                transaction_id: result.transaction_id,
                merchant,
                enrichment: DataEnrichment::try_from(enrichment)?,
            });
        }

        debug!(stored = stored.len(), "merchant detection persisted");
        Ok(stored)
    }
}
