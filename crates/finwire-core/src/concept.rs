use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ProviderId, ValidationError};

/// Category of external service that interchangeable vendor adapters fulfil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concept {
    ExchangeRates,
    Securities,
    Llm,
    Payments,
    MerchantEnrichment,
}

impl Concept {
    pub const ALL: [Self; 5] = [
        Self::ExchangeRates,
        Self::Securities,
        Self::Llm,
        Self::Payments,
        Self::MerchantEnrichment,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExchangeRates => "exchange_rates",
            Self::Securities => "securities",
            Self::Llm => "llm",
            Self::Payments => "payments",
            Self::MerchantEnrichment => "merchant_enrichment",
        }
    }

    /// Providers registered for this concept, in priority order.
    pub const fn registered_providers(self) -> &'static [ProviderId] {
        match self {
            Self::ExchangeRates => &[ProviderId::ExchangeRateHost, ProviderId::Synth],
            Self::Securities => &[ProviderId::Synth],
            Self::Llm => &[ProviderId::OpenAi],
            Self::Payments => &[ProviderId::Stripe],
            Self::MerchantEnrichment => {
                &[ProviderId::PlaidUs, ProviderId::PlaidEu, ProviderId::OpenAi]
            }
        }
    }
}

impl Display for Concept {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Concept {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|concept| concept.as_str() == normalized)
            .ok_or_else(|| ValidationError::InvalidConcept {
                value: value.to_owned(),
            })
    }
}
