//! Concept-scoped and global provider lookup.
//!
//! Availability is computed once, when the registry is built, from the
//! [`ProviderSettings`] snapshot it receives. Providers whose configuration is
//! missing are simply absent; they are never an error. Reloading settings
//! means building a new registry.
//!
//! ```rust,ignore
//! use finwire_core::{Concept, ProviderRegistry, ProviderSettings};
//!
//! let registry = ProviderRegistry::for_concept(Concept::ExchangeRates, &ProviderSettings::from_env());
//! let provider = registry.get_provider_by_name("synth")?;
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::adapters::{
    ExchangeRateHostAdapter, OpenAiAdapter, PlaidAdapter, StripeAdapter, SynthAdapter,
};
use crate::{
    Concept, HttpClient, PlaidRegion, Provider, ProviderError, ProviderId, ProviderSettings,
    ReqwestHttpClient,
};

pub struct ProviderRegistry {
    scope: Option<Concept>,
    settings: ProviderSettings,
    http_client: Arc<dyn HttpClient>,
    available: Vec<ProviderId>,
}

impl ProviderRegistry {
    /// Registry limited to the providers registered for `concept`.
    pub fn for_concept(concept: Concept, settings: &ProviderSettings) -> Self {
        Self::build(Some(concept), settings)
    }

    /// Parses `name` as a concept first; unknown names fail with a validation error.
    pub fn for_concept_name(name: &str, settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let concept = name.parse::<Concept>()?;
        Ok(Self::for_concept(concept, settings))
    }

    /// Registry over every configured provider regardless of concept.
    pub fn global(settings: &ProviderSettings) -> Self {
        Self::build(None, settings)
    }

    /// Any configured adapter by id, regardless of concept.
    pub fn global_provider(
        id: ProviderId,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn Provider>, ProviderError> {
        Self::global(settings).get_provider(id)
    }

    pub fn global_provider_by_name(
        name: &str,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn Provider>, ProviderError> {
        Self::global(settings).get_provider_by_name(name)
    }

    /// Available providers for `concept` in priority order.
    pub fn resolve(concept: Concept, settings: &ProviderSettings) -> Vec<ProviderId> {
        concept
            .registered_providers()
            .iter()
            .copied()
            .filter(|id| settings.is_configured(*id))
            .collect()
    }

    fn build(scope: Option<Concept>, settings: &ProviderSettings) -> Self {
        let available = match scope {
            Some(concept) => Self::resolve(concept, settings),
            None => ProviderId::ALL
                .into_iter()
                .filter(|id| settings.is_configured(*id))
                .collect(),
        };
        debug!(
            concept = scope.map_or("global", Concept::as_str),
            available = ?available,
            "resolved providers"
        );
        Self {
            scope,
            settings: settings.clone(),
            http_client: Arc::new(ReqwestHttpClient::new()),
            available,
        }
    }

    /// Replaces the transport handed to adapters built by this registry.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = http_client;
        self
    }

    pub const fn concept(&self) -> Option<Concept> {
        self.scope
    }

    pub fn providers(&self) -> &[ProviderId] {
        &self.available
    }

    pub fn get_provider(&self, id: ProviderId) -> Result<Arc<dyn Provider>, ProviderError> {
        if !self.available.contains(&id) {
            return Err(self.not_found(id.as_str()));
        }
        self.construct(id)
            .ok_or_else(|| self.not_found(id.as_str()))
    }

    pub fn get_provider_by_name(&self, name: &str) -> Result<Arc<dyn Provider>, ProviderError> {
        let id = name
            .parse::<ProviderId>()
            .map_err(|_| self.not_found(name))?;
        self.get_provider(id)
    }

    /// Highest-priority available provider.
    pub fn first_provider(&self) -> Result<Arc<dyn Provider>, ProviderError> {
        match self.available.first() {
            Some(id) => self.get_provider(*id),
            None => Err(ProviderError::not_found(match self.scope {
                Some(concept) => format!("No provider configured for concept: {concept}"),
                None => String::from("No provider configured"),
            })),
        }
    }

    pub fn plaid_provider_for_region(
        &self,
        region: PlaidRegion,
    ) -> Result<Arc<dyn Provider>, ProviderError> {
        self.get_provider(region.provider_id())
    }

    fn not_found(&self, name: &str) -> ProviderError {
        ProviderError::not_found(match self.scope {
            Some(concept) => format!("Provider '{name}' not found for concept: {concept}"),
            None => format!("Provider '{name}' not found in registry"),
        })
    }

    fn construct(&self, id: ProviderId) -> Option<Arc<dyn Provider>> {
        let http_client = Arc::clone(&self.http_client);
        let settings = &self.settings;
        let provider: Arc<dyn Provider> = match id {
            ProviderId::ExchangeRateHost => Arc::new(ExchangeRateHostAdapter::new(
                settings.exchange_rate_host_api_key()?,
                http_client,
            )),
            ProviderId::Synth => Arc::new(SynthAdapter::new(settings.synth_api_key()?, http_client)),
            ProviderId::OpenAi => Arc::new(OpenAiAdapter::new(settings.llm_backend()?, http_client)),
            ProviderId::Stripe => {
                let (secret_key, webhook_secret) = settings.stripe_keys()?;
                Arc::new(StripeAdapter::new(secret_key, webhook_secret, http_client))
            }
            ProviderId::PlaidUs | ProviderId::PlaidEu => {
                let region = if id == ProviderId::PlaidUs {
                    PlaidRegion::Us
                } else {
                    PlaidRegion::Eu
                };
                Arc::new(PlaidAdapter::new(
                    region,
                    settings.plaid(region)?.clone(),
                    http_client,
                ))
            }
        };
        Some(provider)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("concept", &self.scope)
            .field("available", &self.available)
            .finish()
    }
}
