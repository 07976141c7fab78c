use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use super::send_json;
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider::{respond, Capability, CapabilitySet, Provider, ProviderError, ProviderFuture};
use crate::settings::{PlaidConfig, PlaidRegion};
use crate::{Classification, EnrichmentInput, ProviderId, TransactionEnrichment};

/// Plaid accepts at most this many transactions per enrich call.
const MAX_ENRICH_BATCH: usize = 100;

/// Plaid transaction enrichment for one region.
#[derive(Clone)]
pub struct PlaidAdapter {
    http_client: Arc<dyn HttpClient>,
    region: PlaidRegion,
    config: PlaidConfig,
    base_url: String,
}

impl PlaidAdapter {
    pub fn new(region: PlaidRegion, config: PlaidConfig, http_client: Arc<dyn HttpClient>) -> Self {
        let base_url = config.environment.base_url().to_owned();
        Self {
            http_client,
            region,
            config,
            base_url,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub const fn region(&self) -> PlaidRegion {
        self.region
    }

    async fn enrich(
        &self,
        transactions: Vec<EnrichmentInput>,
    ) -> Result<Vec<TransactionEnrichment>, ProviderError> {
        if transactions.is_empty() {
            return Ok(Vec::new());
        }
        if transactions.len() > MAX_ENRICH_BATCH {
            return Err(ProviderError::batch_limit(format!(
                "Too many transactions to enrich. Max is {MAX_ENRICH_BATCH} per request."
            )));
        }

        let payload = json!({
            "client_id": self.config.client_id,
            "secret": self.config.secret,
            "account_type": "depository",
            "transactions": transactions
                .iter()
                .map(|transaction| {
                    let direction = match transaction.classification {
                        Classification::Expense => "OUTFLOW",
                        Classification::Income => "INFLOW",
                    };
                    json!({
                        "id": transaction.id,
                        "description": transaction.description,
                        "amount": transaction.amount.abs(),
                        "direction": direction,
                        "iso_currency_code": transaction.currency.as_str(),
                    })
                })
                .collect::<Vec<_>>(),
        });
        let request = HttpRequest::post(format!("{}/transactions/enrich", self.base_url))
            .with_json_body(&payload);
        let body: EnrichResponse = send_json(self.http_client.as_ref(), self.id(), request).await?;

        Ok(body
            .enriched_transactions
            .into_iter()
            .map(|enriched| {
                let details = enriched.enrichments;
                TransactionEnrichment {
                    transaction_id: enriched.id,
                    merchant_name: details.merchant_name,
                    website: details.website,
                    logo_url: details.logo_url,
                    category: details
                        .personal_finance_category
                        .map(|category| category.primary),
                }
            })
            .collect())
    }
}

impl Provider for PlaidAdapter {
    fn id(&self) -> ProviderId {
        self.region.provider_id()
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::empty().with(Capability::EnrichTransactions)
    }

    fn enrich_transactions<'a>(
        &'a self,
        transactions: Vec<EnrichmentInput>,
    ) -> ProviderFuture<'a, Vec<TransactionEnrichment>> {
        respond(
            self.id(),
            Capability::EnrichTransactions,
            self.enrich(transactions),
        )
    }
}

#[derive(Debug, Deserialize)]
struct EnrichResponse {
    #[serde(default)]
    enriched_transactions: Vec<EnrichedTransaction>,
}

#[derive(Debug, Deserialize)]
struct EnrichedTransaction {
    id: String,
    enrichments: Enrichments,
}

#[derive(Debug, Deserialize)]
struct Enrichments {
    #[serde(default)]
    merchant_name: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    logo_url: Option<String>,
    #[serde(default)]
    personal_finance_category: Option<PersonalFinanceCategory>,
}

#[derive(Debug, Deserialize)]
struct PersonalFinanceCategory {
    primary: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PlaidEnvironment;
    use crate::test_support::{block_on, RecordingHttpClient};
    use crate::{CurrencyCode, HttpResponse, ProviderErrorKind};

    fn config(environment: PlaidEnvironment) -> PlaidConfig {
        PlaidConfig {
            client_id: String::from("client-1"),
            secret: String::from("secret-1"),
            environment,
        }
    }

    fn input(id: &str) -> EnrichmentInput {
        EnrichmentInput {
            id: id.to_owned(),
            description: String::from("PURCHASE WM SUPERCENTER #1700"),
            amount: -72.1,
            classification: Classification::Expense,
            currency: CurrencyCode::usd(),
        }
    }

    #[test]
    fn enrich_posts_to_environment_host() {
        let client = Arc::new(RecordingHttpClient::responding(HttpResponse::ok_json(
            r#"{"enriched_transactions":[{"id":"t1","enrichments":{"merchant_name":"Walmart","website":"walmart.com","logo_url":null,"personal_finance_category":{"primary":"GENERAL_MERCHANDISE","detailed":"GENERAL_MERCHANDISE_SUPERSTORES"}}}],"request_id":"r"}"#,
        )));
        let adapter = PlaidAdapter::new(
            PlaidRegion::Eu,
            config(PlaidEnvironment::Production),
            client.clone(),
        );

        let enriched = block_on(adapter.enrich_transactions(vec![input("t1")]))
            .into_result()
            .expect("success");
        assert_eq!(enriched[0].merchant_name.as_deref(), Some("Walmart"));
        assert_eq!(enriched[0].category.as_deref(), Some("GENERAL_MERCHANDISE"));
        assert_eq!(adapter.id(), ProviderId::PlaidEu);

        let requests = client.recorded_requests();
        assert_eq!(requests[0].url, "https://production.plaid.com/transactions/enrich");
        let body = requests[0].body_json().expect("json body");
        assert_eq!(body["transactions"][0]["direction"], "OUTFLOW");
        assert_eq!(body["transactions"][0]["amount"], 72.1);
    }

    #[test]
    fn oversized_batch_fails_before_network() {
        let client = Arc::new(RecordingHttpClient::responding(HttpResponse::ok_json("{}")));
        let adapter = PlaidAdapter::new(
            PlaidRegion::Us,
            config(PlaidEnvironment::Sandbox),
            client.clone(),
        );
        let batch = (0..=MAX_ENRICH_BATCH).map(|i| input(&format!("t{i}"))).collect();

        let envelope = block_on(adapter.enrich_transactions(batch));
        assert_eq!(
            envelope.error().map(|error| error.kind),
            Some(ProviderErrorKind::BatchLimit)
        );
        assert_eq!(client.request_count(), 0);
    }
}
