//! # Finwire Core
//!
//! Provider registry and vendor adapters for personal-finance data.
//!
//! ## Overview
//!
//! Callers ask a [`ProviderRegistry`] for the adapters that serve a
//! [`Concept`] (exchange rates, securities, llm, payments, merchant
//! enrichment). Which adapters are available depends only on the
//! [`ProviderSettings`] snapshot the registry was built from. Every
//! capability call returns an [`Envelope`], so vendor failures arrive as
//! data instead of `Err`.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Exchange Rate Host, Synth, OpenAI, Stripe, Plaid |
//! | [`domain`] | Validated value types and capability payloads |
//! | [`envelope`] | Result envelope and its error record |
//! | [`exchange_rates`] | Exchange-rate lookup that degrades to a message |
//! | [`http_client`] | Transport abstraction with a `reqwest` implementation |
//! | [`merchant_detection`] | Persists AI-detected merchants |
//! | [`provider`] | Provider trait, capabilities, and adapter errors |
//! | [`registry`] | Concept-scoped and global lookup |
//! | [`settings`] | Configuration snapshot |
//! | [`sse`] | Server-sent event decoding for streamed chat |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use finwire_core::{ExchangeRateLookup, ExchangeRateParams, ProviderSettings};
//!
//! #[tokio::main]
//! async fn main() {
//!     let lookup = ExchangeRateLookup::new(&ProviderSettings::from_env());
//!     let view = lookup.lookup(&ExchangeRateParams::default()).await;
//!     match view.rate {
//!         Some(rate) => println!("1 {} = {rate} {}", view.from, view.to),
//!         None => eprintln!("{}", view.error_message.unwrap_or_default()),
//!     }
//! }
//! ```

pub mod adapters;
pub mod concept;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod exchange_rates;
pub mod http_client;
pub mod merchant_detection;
pub mod provider;
pub mod provider_id;
pub mod registry;
pub mod settings;
pub mod sse;

#[cfg(test)]
mod test_support;

pub use adapters::{
    ExchangeRateHostAdapter, OpenAiAdapter, PlaidAdapter, StripeAdapter, SynthAdapter,
    MAX_BATCH_SIZE, SUPPORTED_HOSTED_MODELS, WEBHOOK_TOLERANCE_SECS,
};
pub use concept::Concept;
pub use domain::*;
pub use envelope::{Envelope, EnvelopeError};
pub use error::{CoreError, ValidationError};
pub use exchange_rates::{ExchangeRateLookup, ExchangeRateParams, ExchangeRateView};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpFuture, HttpMethod, HttpRequest, HttpResponse,
    ReqwestHttpClient,
};
pub use merchant_detection::{DetectedMerchant, MerchantDetectionJob, MERCHANT_ID_ATTRIBUTE};
pub use provider::{
    respond, Capability, CapabilitySet, ChatStreamer, Provider, ProviderError, ProviderErrorKind,
    ProviderFuture,
};
pub use provider_id::ProviderId;
pub use registry::ProviderRegistry;
pub use settings::{LlmBackend, PlaidConfig, PlaidEnvironment, PlaidRegion, ProviderSettings};
