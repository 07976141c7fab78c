use std::fmt::{Display, Formatter};
use std::str::FromStr;

use finwire_warehouse::{EnrichmentRecord, ProviderMerchantRecord};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Who set an enriched attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentSource {
    Rule,
    Plaid,
    ExchangeRateHost,
    Ai,
}

impl EnrichmentSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rule => "rule",
            Self::Plaid => "plaid",
            Self::ExchangeRateHost => "exchange_rate_host",
            Self::Ai => "ai",
        }
    }
}

impl Display for EnrichmentSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrichmentSource {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "rule" => Ok(Self::Rule),
            "plaid" => Ok(Self::Plaid),
            "exchange_rate_host" => Ok(Self::ExchangeRateHost),
            "ai" => Ok(Self::Ai),
            other => Err(ValidationError::InvalidSourceTag {
                field: "enrichment",
                value: other.to_owned(),
            }),
        }
    }
}

/// Vendor (or the AI) a merchant record was discovered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MerchantSource {
    Plaid,
    ExchangeRateHost,
    Ai,
}

impl MerchantSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plaid => "plaid",
            Self::ExchangeRateHost => "exchange_rate_host",
            Self::Ai => "ai",
        }
    }
}

impl Display for MerchantSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MerchantSource {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "plaid" => Ok(Self::Plaid),
            "exchange_rate_host" => Ok(Self::ExchangeRateHost),
            "ai" => Ok(Self::Ai),
            other => Err(ValidationError::InvalidSourceTag {
                field: "merchant",
                value: other.to_owned(),
            }),
        }
    }
}

/// Reference to any entity that can carry enrichments, e.g. `("transaction", "txn_42")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnrichableRef {
    pub kind: String,
    pub id: String,
}

impl EnrichableRef {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn transaction(id: impl Into<String>) -> Self {
        Self::new("transaction", id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEnrichment {
    pub id: String,
    pub enrichable: EnrichableRef,
    pub source: EnrichmentSource,
    pub attribute_name: String,
    pub value: Option<String>,
    pub created_at: String,
}

impl TryFrom<EnrichmentRecord> for DataEnrichment {
    type Error = ValidationError;

    fn try_from(record: EnrichmentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            source: record.source.parse()?,
            id: record.id,
            enrichable: EnrichableRef::new(record.enrichable_type, record.enrichable_id),
            attribute_name: record.attribute_name,
            value: record.value,
            created_at: record.created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMerchant {
    pub id: String,
    pub name: String,
    pub source: MerchantSource,
    pub website_url: Option<String>,
    pub logo_url: Option<String>,
}

impl TryFrom<ProviderMerchantRecord> for ProviderMerchant {
    type Error = ValidationError;

    fn try_from(record: ProviderMerchantRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            source: record.source.parse()?,
            id: record.id,
            name: record.name,
            website_url: record.website_url,
            logo_url: record.logo_url,
        })
    }
}
