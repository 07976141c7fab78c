use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical identifiers of every adapter the registry knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    ExchangeRateHost,
    Synth,
    #[serde(rename = "openai")]
    OpenAi,
    Stripe,
    PlaidUs,
    PlaidEu,
}

impl ProviderId {
    pub const ALL: [Self; 6] = [
        Self::ExchangeRateHost,
        Self::Synth,
        Self::OpenAi,
        Self::Stripe,
        Self::PlaidUs,
        Self::PlaidEu,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExchangeRateHost => "exchange_rate_host",
            Self::Synth => "synth",
            Self::OpenAi => "openai",
            Self::Stripe => "stripe",
            Self::PlaidUs => "plaid_us",
            Self::PlaidEu => "plaid_eu",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == normalized)
            .ok_or_else(|| ValidationError::UnknownProvider {
                value: value.to_owned(),
            })
    }
}
