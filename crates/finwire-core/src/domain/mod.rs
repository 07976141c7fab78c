//! # Domain Models
//!
//! Validated value types shared by adapters, consumers, and the CLI.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CurrencyCode`] | ISO 4217 code, uppercase |
//! | [`Symbol`] | Security ticker |
//! | [`ExchangeRate`] | Rate between two currencies on a date |
//! | [`SecurityPrice`] / [`Security`] | Securities data |
//! | [`TransactionInput`] and friends | Payloads for AI categorization and merchant detection |
//! | [`ChatRequest`] / [`ChatResponse`] / [`ChatStreamChunk`] | LLM chat payloads |
//! | [`WebhookEvent`] / [`CheckoutSession`] | Payments payloads |
//! | [`DataEnrichment`] / [`ProviderMerchant`] | Typed views of persisted provenance records |
//!
//! Construction validates invariants; invalid values never reach an adapter.

mod chat;
mod currency;
mod enrichment;
mod models;
mod payments;
mod symbol;
mod transactions;

pub use chat::{
    ChatRequest, ChatResponse, ChatStreamChunk, FunctionDefinition, FunctionResult, ToolCall,
};
pub use currency::{format_date, parse_date, CurrencyCode};
pub use enrichment::{
    DataEnrichment, EnrichableRef, EnrichmentSource, MerchantSource, ProviderMerchant,
};
pub use models::{ExchangeRate, Security, SecurityPrice};
pub use payments::{CheckoutMode, CheckoutRequest, CheckoutSession, WebhookEvent};
pub use symbol::Symbol;
pub use transactions::{
    AutoCategorization, AutoDetectedMerchant, Classification, EnrichmentInput,
    TransactionEnrichment, TransactionInput, UserCategory, UserMerchant,
};
