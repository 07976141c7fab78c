//! Provider configuration snapshot.
//!
//! [`ProviderSettings`] is built once from a key lookup and handed to the
//! registry, which derives adapter availability from it. Lookups consult the
//! process environment first and then the warehouse settings store; empty
//! values count as absent.
//!
//! | Key | Provider |
//! |-----|----------|
//! | `EXCHANGE_RATE_HOST_API_KEY` | exchange_rate_host |
//! | `SYNTH_API_KEY` | synth |
//! | `OPENAI_ACCESS_TOKEN` | openai (hosted) |
//! | `USE_LM_STUDIO`, `LM_STUDIO_API_BASE_URL`, `LM_STUDIO_MODEL_NAME`, `LM_STUDIO_ACCESS_TOKEN` | openai (self-hosted) |
//! | `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET` | stripe |
//! | `PLAID_CLIENT_ID`, `PLAID_SECRET`, `PLAID_ENV` | plaid_us |
//! | `PLAID_EU_CLIENT_ID`, `PLAID_EU_SECRET`, `PLAID_EU_ENV` | plaid_eu |

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use finwire_warehouse::{Warehouse, WarehouseError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{ProviderId, ValidationError};

pub const DEFAULT_LM_STUDIO_BASE_URL: &str = "http://localhost:1234/v1";
pub const DEFAULT_LM_STUDIO_MODEL: &str = "mistralai/mistral-7b-instruct-v0.3";
pub const DEFAULT_LM_STUDIO_ACCESS_TOKEN: &str = "lm-studio";

/// Every key [`ProviderSettings`] reads.
pub const SETTING_KEYS: [&str; 15] = [
    "EXCHANGE_RATE_HOST_API_KEY",
    "SYNTH_API_KEY",
    "OPENAI_ACCESS_TOKEN",
    "USE_LM_STUDIO",
    "LM_STUDIO_API_BASE_URL",
    "LM_STUDIO_MODEL_NAME",
    "LM_STUDIO_ACCESS_TOKEN",
    "STRIPE_SECRET_KEY",
    "STRIPE_WEBHOOK_SECRET",
    "PLAID_CLIENT_ID",
    "PLAID_SECRET",
    "PLAID_ENV",
    "PLAID_EU_CLIENT_ID",
    "PLAID_EU_SECRET",
    "PLAID_EU_ENV",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaidRegion {
    Us,
    Eu,
}

impl PlaidRegion {
    pub const fn provider_id(self) -> ProviderId {
        match self {
            Self::Us => ProviderId::PlaidUs,
            Self::Eu => ProviderId::PlaidEu,
        }
    }
}

impl FromStr for PlaidRegion {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "us" => Ok(Self::Us),
            "eu" => Ok(Self::Eu),
            _ => Err(ValidationError::InvalidRegion {
                value: value.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaidEnvironment {
    #[default]
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.plaid.com",
            Self::Development => "https://development.plaid.com",
            Self::Production => "https://production.plaid.com",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl Display for PlaidEnvironment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaidEnvironment {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            _ => Err(ValidationError::InvalidPlaidEnvironment {
                value: value.to_owned(),
            }),
        }
    }
}

/// Credentials for one Plaid region.
#[derive(Clone, PartialEq, Eq)]
pub struct PlaidConfig {
    pub client_id: String,
    pub secret: String,
    pub environment: PlaidEnvironment,
}

impl std::fmt::Debug for PlaidConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaidConfig")
            .field("client_id", &self.client_id)
            .field("secret", &"***")
            .field("environment", &self.environment)
            .finish()
    }
}

/// LLM backend selected by configuration.
#[derive(Clone, PartialEq, Eq)]
pub enum LlmBackend {
    /// OpenAI Responses API.
    Hosted { access_token: String },
    /// OpenAI-compatible Chat Completions server such as LM Studio.
    SelfHosted {
        base_url: String,
        model: String,
        access_token: String,
    },
}

impl LlmBackend {
    pub const fn is_self_hosted(&self) -> bool {
        matches!(self, Self::SelfHosted { .. })
    }
}

impl std::fmt::Debug for LlmBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hosted { .. } => f.write_str("Hosted"),
            Self::SelfHosted { base_url, model, .. } => f
                .debug_struct("SelfHosted")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
        }
    }
}

/// Immutable configuration snapshot used to build a registry.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    exchange_rate_host_api_key: Option<String>,
    synth_api_key: Option<String>,
    openai_access_token: Option<String>,
    self_hosted_llm: Option<SelfHostedLlm>,
    stripe: Option<StripeKeys>,
    plaid_us: Option<PlaidConfig>,
    plaid_eu: Option<PlaidConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SelfHostedLlm {
    base_url: String,
    model: String,
    access_token: String,
}

#[derive(Clone, PartialEq, Eq)]
struct StripeKeys {
    secret_key: String,
    webhook_secret: String,
}

impl ProviderSettings {
    /// Settings with no provider configured.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads the process environment only.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the process environment, falling back to the warehouse settings store.
    pub fn load(warehouse: &Warehouse) -> Result<Self, WarehouseError> {
        let mut stored = HashMap::new();
        for key in SETTING_KEYS {
            if let Some(value) = warehouse.setting(key)? {
                stored.insert(key, value);
            }
        }
        Ok(Self::from_lookup(|key| {
            non_empty(std::env::var(key).ok()).or_else(|| stored.get(key).cloned())
        }))
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));

        let self_hosted_llm = get("USE_LM_STUDIO")
            .filter(|flag| flag == "true")
            .map(|_| SelfHostedLlm {
                base_url: get("LM_STUDIO_API_BASE_URL")
                    .unwrap_or_else(|| String::from(DEFAULT_LM_STUDIO_BASE_URL)),
                model: get("LM_STUDIO_MODEL_NAME")
                    .unwrap_or_else(|| String::from(DEFAULT_LM_STUDIO_MODEL)),
                access_token: get("LM_STUDIO_ACCESS_TOKEN")
                    .unwrap_or_else(|| String::from(DEFAULT_LM_STUDIO_ACCESS_TOKEN)),
            });

        let stripe = match (get("STRIPE_SECRET_KEY"), get("STRIPE_WEBHOOK_SECRET")) {
            (Some(secret_key), Some(webhook_secret)) => Some(StripeKeys {
                secret_key,
                webhook_secret,
            }),
            _ => None,
        };

        Self {
            exchange_rate_host_api_key: get("EXCHANGE_RATE_HOST_API_KEY"),
            synth_api_key: get("SYNTH_API_KEY"),
            openai_access_token: get("OPENAI_ACCESS_TOKEN"),
            self_hosted_llm,
            stripe,
            plaid_us: plaid_config(&get, "PLAID_CLIENT_ID", "PLAID_SECRET", "PLAID_ENV"),
            plaid_eu: plaid_config(&get, "PLAID_EU_CLIENT_ID", "PLAID_EU_SECRET", "PLAID_EU_ENV"),
        }
    }

    pub fn with_exchange_rate_host_key(mut self, key: impl Into<String>) -> Self {
        self.exchange_rate_host_api_key = non_empty(Some(key.into()));
        self
    }

    pub fn with_synth_key(mut self, key: impl Into<String>) -> Self {
        self.synth_api_key = non_empty(Some(key.into()));
        self
    }

    pub fn with_openai_token(mut self, token: impl Into<String>) -> Self {
        self.openai_access_token = non_empty(Some(token.into()));
        self
    }

    /// Switches the LLM backend to a self-hosted server using `model` for every call.
    pub fn with_self_hosted_llm(
        mut self,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        self.self_hosted_llm = Some(SelfHostedLlm {
            base_url: base_url.into(),
            model: model.into(),
            access_token: String::from(DEFAULT_LM_STUDIO_ACCESS_TOKEN),
        });
        self
    }

    pub fn with_stripe_keys(
        mut self,
        secret_key: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        self.stripe = Some(StripeKeys {
            secret_key: secret_key.into(),
            webhook_secret: webhook_secret.into(),
        });
        self
    }

    pub fn with_plaid(mut self, region: PlaidRegion, config: PlaidConfig) -> Self {
        match region {
            PlaidRegion::Us => self.plaid_us = Some(config),
            PlaidRegion::Eu => self.plaid_eu = Some(config),
        }
        self
    }

    pub fn exchange_rate_host_api_key(&self) -> Option<&str> {
        self.exchange_rate_host_api_key.as_deref()
    }

    pub fn synth_api_key(&self) -> Option<&str> {
        self.synth_api_key.as_deref()
    }

    /// `(secret_key, webhook_secret)` when both are present.
    pub fn stripe_keys(&self) -> Option<(&str, &str)> {
        self.stripe
            .as_ref()
            .map(|keys| (keys.secret_key.as_str(), keys.webhook_secret.as_str()))
    }

    pub fn plaid(&self, region: PlaidRegion) -> Option<&PlaidConfig> {
        match region {
            PlaidRegion::Us => self.plaid_us.as_ref(),
            PlaidRegion::Eu => self.plaid_eu.as_ref(),
        }
    }

    /// The self-hosted flag wins over a hosted token.
    pub fn llm_backend(&self) -> Option<LlmBackend> {
        if let Some(llm) = &self.self_hosted_llm {
            return Some(LlmBackend::SelfHosted {
                base_url: llm.base_url.clone(),
                model: llm.model.clone(),
                access_token: llm.access_token.clone(),
            });
        }
        self.openai_access_token
            .as_ref()
            .map(|access_token| LlmBackend::Hosted {
                access_token: access_token.clone(),
            })
    }

    pub fn is_configured(&self, provider: ProviderId) -> bool {
        match provider {
            ProviderId::ExchangeRateHost => self.exchange_rate_host_api_key.is_some(),
            ProviderId::Synth => self.synth_api_key.is_some(),
            ProviderId::OpenAi => {
                self.openai_access_token.is_some() || self.self_hosted_llm.is_some()
            }
            ProviderId::Stripe => self.stripe.is_some(),
            ProviderId::PlaidUs => self.plaid_us.is_some(),
            ProviderId::PlaidEu => self.plaid_eu.is_some(),
        }
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let configured: Vec<&str> = ProviderId::ALL
            .into_iter()
            .filter(|id| self.is_configured(*id))
            .map(ProviderId::as_str)
            .collect();
        f.debug_struct("ProviderSettings")
            .field("configured", &configured)
            .field("llm_backend", &self.llm_backend())
            .finish()
    }
}

fn plaid_config(
    get: &impl Fn(&str) -> Option<String>,
    client_id_key: &str,
    secret_key: &str,
    env_key: &str,
) -> Option<PlaidConfig> {
    let client_id = get(client_id_key)?;
    let secret = get(secret_key)?;
    let environment = match get(env_key) {
        None => PlaidEnvironment::default(),
        Some(value) => match value.parse() {
            Ok(environment) => environment,
            Err(error) => {
                warn!(key = env_key, "{error}; plaid region left unconfigured");
                return None;
            }
        },
    };
    Some(PlaidConfig {
        client_id,
        secret,
        environment,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_values_count_as_absent() {
        let settings = ProviderSettings::from_lookup(lookup_from(&[
            ("SYNTH_API_KEY", ""),
            ("EXCHANGE_RATE_HOST_API_KEY", "  "),
        ]));
        assert!(!settings.is_configured(ProviderId::Synth));
        assert!(!settings.is_configured(ProviderId::ExchangeRateHost));
    }

    #[test]
    fn stripe_requires_both_keys() {
        let partial =
            ProviderSettings::from_lookup(lookup_from(&[("STRIPE_SECRET_KEY", "sk_test")]));
        assert!(!partial.is_configured(ProviderId::Stripe));

        let full = ProviderSettings::from_lookup(lookup_from(&[
            ("STRIPE_SECRET_KEY", "sk_test"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_test"),
        ]));
        assert_eq!(full.stripe_keys(), Some(("sk_test", "whsec_test")));
    }

    #[test]
    fn self_hosted_flag_enables_openai_with_defaults() {
        let settings = ProviderSettings::from_lookup(lookup_from(&[("USE_LM_STUDIO", "true")]));
        assert!(settings.is_configured(ProviderId::OpenAi));
        assert_eq!(
            settings.llm_backend(),
            Some(LlmBackend::SelfHosted {
                base_url: String::from(DEFAULT_LM_STUDIO_BASE_URL),
                model: String::from(DEFAULT_LM_STUDIO_MODEL),
                access_token: String::from(DEFAULT_LM_STUDIO_ACCESS_TOKEN),
            })
        );
    }

    #[test]
    fn self_hosted_flag_other_than_true_is_ignored() {
        let settings = ProviderSettings::from_lookup(lookup_from(&[
            ("USE_LM_STUDIO", "yes"),
            ("OPENAI_ACCESS_TOKEN", "sk-live"),
        ]));
        assert_eq!(
            settings.llm_backend(),
            Some(LlmBackend::Hosted {
                access_token: String::from("sk-live")
            })
        );
    }

    #[test]
    fn plaid_regions_are_independent() {
        let settings = ProviderSettings::from_lookup(lookup_from(&[
            ("PLAID_EU_CLIENT_ID", "eu-client"),
            ("PLAID_EU_SECRET", "eu-secret"),
            ("PLAID_EU_ENV", "production"),
        ]));
        assert!(!settings.is_configured(ProviderId::PlaidUs));
        let eu = settings.plaid(PlaidRegion::Eu).expect("eu configured");
        assert_eq!(eu.environment, PlaidEnvironment::Production);
    }

    #[test]
    fn invalid_plaid_environment_leaves_region_unconfigured() {
        let settings = ProviderSettings::from_lookup(lookup_from(&[
            ("PLAID_CLIENT_ID", "client"),
            ("PLAID_SECRET", "secret"),
            ("PLAID_ENV", "staging"),
        ]));
        assert!(!settings.is_configured(ProviderId::PlaidUs));
    }

    #[test]
    fn debug_output_omits_secrets() {
        let settings = ProviderSettings::empty()
            .with_synth_key("synth-secret")
            .with_stripe_keys("sk_secret", "whsec_secret");
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("secret"), "{rendered}");
        assert!(rendered.contains("synth"));
    }

    #[test]
    fn warehouse_values_fill_gaps_left_by_environment() {
        let temp = tempfile::tempdir().expect("tempdir");
        let warehouse = Warehouse::open(finwire_warehouse::WarehouseConfig::at(temp.path()))
            .expect("warehouse");
        warehouse
            .set_setting("FINWIRE_TEST_UNUSED", "x")
            .expect("store");
        warehouse
            .set_setting("PLAID_EU_CLIENT_ID", "stored-client")
            .expect("store");
        warehouse
            .set_setting("PLAID_EU_SECRET", "stored-secret")
            .expect("store");

        let settings = ProviderSettings::load(&warehouse).expect("load");
        assert_eq!(
            settings
                .plaid(PlaidRegion::Eu)
                .map(|config| config.client_id.as_str()),
            Some("stored-client")
        );
    }
}
