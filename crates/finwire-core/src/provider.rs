//! Provider trait, capability matrix, and adapter error types.
//!
//! Every vendor adapter implements [`Provider`]. Capability methods return a
//! boxed future resolving to an [`Envelope`]; vendor failures never escape as
//! `Err`. Adapters override only the capabilities they declare in their
//! [`CapabilitySet`], and the default methods fail fast with a `NotFound`
//! envelope naming the capability.
//!
//! | Capability | Payload |
//! |------------|---------|
//! | `fetch_exchange_rate` | [`ExchangeRate`] |
//! | `fetch_security_price` | [`SecurityPrice`] |
//! | `search_securities` | `Vec<`[`Security`]`>` |
//! | `auto_categorize` | `Vec<`[`AutoCategorization`]`>` |
//! | `auto_detect_merchants` | `Vec<`[`AutoDetectedMerchant`]`>` |
//! | `chat_response` | `Option<`[`ChatResponse`]`>` |
//! | `enrich_transactions` | `Vec<`[`TransactionEnrichment`]`>` |
//! | `process_webhook` | [`WebhookEvent`] |
//! | `create_checkout_session` | [`CheckoutSession`] |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use time::Date;
use tracing::warn;

use crate::{
    AutoCategorization, AutoDetectedMerchant, ChatRequest, ChatResponse, ChatStreamChunk,
    CheckoutRequest, CheckoutSession, CurrencyCode, EnrichmentInput, Envelope, EnvelopeError,
    ExchangeRate, HttpError, ProviderId, Security, SecurityPrice, Symbol, TransactionEnrichment,
    TransactionInput, UserCategory, UserMerchant, ValidationError, WebhookEvent,
};

/// Boxed future returned by every capability method.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Envelope<T>> + Send + 'a>>;

/// Per-chunk callback for streamed chat replies.
pub type ChatStreamer<'a> = &'a mut (dyn FnMut(&ChatStreamChunk) + Send);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    FetchExchangeRate,
    FetchSecurityPrice,
    SearchSecurities,
    AutoCategorize,
    AutoDetectMerchants,
    ChatResponse,
    EnrichTransactions,
    ProcessWebhook,
    CreateCheckoutSession,
}

impl Capability {
    pub const ALL: [Self; 9] = [
        Self::FetchExchangeRate,
        Self::FetchSecurityPrice,
        Self::SearchSecurities,
        Self::AutoCategorize,
        Self::AutoDetectMerchants,
        Self::ChatResponse,
        Self::EnrichTransactions,
        Self::ProcessWebhook,
        Self::CreateCheckoutSession,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FetchExchangeRate => "fetch_exchange_rate",
            Self::FetchSecurityPrice => "fetch_security_price",
            Self::SearchSecurities => "search_securities",
            Self::AutoCategorize => "auto_categorize",
            Self::AutoDetectMerchants => "auto_detect_merchants",
            Self::ChatResponse => "chat_response",
            Self::EnrichTransactions => "enrich_transactions",
            Self::ProcessWebhook => "process_webhook",
            Self::CreateCheckoutSession => "create_checkout_session",
        }
    }

    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities an adapter implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u16);

impl CapabilitySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    pub const fn supports(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn supported(self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.supports(*capability))
            .collect()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl Serialize for CapabilitySet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.supported())
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Validation,
    NotFound,
    BatchLimit,
    UnsupportedModel,
    Vendor,
    InvalidRequest,
    Internal,
}

/// Structured provider error, converted to an [`EnvelopeError`] at the capability boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    retryable: bool,
}

impl ProviderError {
    fn new(kind: ProviderErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Validation, message, false)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::NotFound, message, false)
    }

    pub fn unsupported_capability(provider: ProviderId, capability: Capability) -> Self {
        Self::not_found(format!(
            "capability '{capability}' is not supported by provider '{provider}'"
        ))
    }

    pub fn batch_limit(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::BatchLimit, message, false)
    }

    pub fn unsupported_model(model: &str) -> Self {
        Self::new(
            ProviderErrorKind::UnsupportedModel,
            format!("Model {model} not supported by current configuration."),
            false,
        )
    }

    pub fn vendor(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Vendor, message, false)
    }

    /// Vendor failure for a non-2xx HTTP status; 429 and 5xx are retryable.
    pub fn vendor_status(status: u16, message: impl Into<String>) -> Self {
        let retryable = status == 429 || status >= 500;
        Self::new(ProviderErrorKind::Vendor, message, retryable)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message, false)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Internal, message, false)
    }

    /// Prefixes the message, e.g. with the vendor name.
    pub fn with_context(mut self, context: &str) -> Self {
        self.message = format!("{context}: {}", self.message);
        self
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::Validation => "provider.validation",
            ProviderErrorKind::NotFound => "provider.not_found",
            ProviderErrorKind::BatchLimit => "provider.batch_limit",
            ProviderErrorKind::UnsupportedModel => "provider.unsupported_model",
            ProviderErrorKind::Vendor => "provider.vendor",
            ProviderErrorKind::InvalidRequest => "provider.invalid_request",
            ProviderErrorKind::Internal => "provider.internal",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ProviderError {}

impl From<ValidationError> for ProviderError {
    fn from(error: ValidationError) -> Self {
        Self::validation(error.to_string())
    }
}

impl From<HttpError> for ProviderError {
    fn from(error: HttpError) -> Self {
        Self::new(
            ProviderErrorKind::Vendor,
            error.message().to_owned(),
            error.retryable(),
        )
    }
}

/// Lifts an envelope failure back into `Err` for callers that need `?`.
impl From<EnvelopeError> for ProviderError {
    fn from(error: EnvelopeError) -> Self {
        Self::new(error.kind, error.message, error.retryable)
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(error: serde_json::Error) -> Self {
        Self::vendor(format!("failed to parse vendor response: {error}"))
    }
}

/// Runs an adapter call and folds its result into an [`Envelope`].
///
/// Failures are logged at `warn` and tagged with the provider id.
pub fn respond<'a, T, F>(
    provider: ProviderId,
    capability: Capability,
    call: F,
) -> ProviderFuture<'a, T>
where
    T: Send + 'a,
    F: Future<Output = Result<T, ProviderError>> + Send + 'a,
{
    Box::pin(async move {
        match call.await {
            Ok(data) => Envelope::success(data),
            Err(error) => {
                warn!(
                    provider = %provider,
                    capability = %capability,
                    code = error.code(),
                    retryable = error.retryable(),
                    "{}",
                    error.message()
                );
                Envelope::failure(EnvelopeError::from_provider_error(&error, Some(provider)))
            }
        }
    })
}

fn unsupported<'a, T: Send + 'a>(
    provider: ProviderId,
    capability: Capability,
) -> ProviderFuture<'a, T> {
    respond(provider, capability, async move {
        Err(ProviderError::unsupported_capability(provider, capability))
    })
}

/// Vendor adapter contract.
///
/// Implementations must be `Send + Sync`; the registry hands them out as
/// `Arc<dyn Provider>`.
pub trait Provider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn capabilities(&self) -> CapabilitySet;

    fn fetch_exchange_rate<'a>(
        &'a self,
        from: CurrencyCode,
        to: CurrencyCode,
        date: Date,
    ) -> ProviderFuture<'a, ExchangeRate> {
        let _ = (from, to, date);
        unsupported(self.id(), Capability::FetchExchangeRate)
    }

    fn fetch_security_price<'a>(
        &'a self,
        symbol: Symbol,
        date: Date,
    ) -> ProviderFuture<'a, SecurityPrice> {
        let _ = (symbol, date);
        unsupported(self.id(), Capability::FetchSecurityPrice)
    }

    fn search_securities<'a>(&'a self, query: String) -> ProviderFuture<'a, Vec<Security>> {
        let _ = query;
        unsupported(self.id(), Capability::SearchSecurities)
    }

    /// Assigns one of `user_categories` (or none) to each transaction.
    fn auto_categorize<'a>(
        &'a self,
        transactions: Vec<TransactionInput>,
        user_categories: Vec<UserCategory>,
    ) -> ProviderFuture<'a, Vec<AutoCategorization>> {
        let _ = (transactions, user_categories);
        unsupported(self.id(), Capability::AutoCategorize)
    }

    fn auto_detect_merchants<'a>(
        &'a self,
        transactions: Vec<TransactionInput>,
        user_merchants: Vec<UserMerchant>,
    ) -> ProviderFuture<'a, Vec<AutoDetectedMerchant>> {
        let _ = (transactions, user_merchants);
        unsupported(self.id(), Capability::AutoDetectMerchants)
    }

    /// Sends a chat turn. With a streamer, every parsed chunk is forwarded in
    /// arrival order and the final response chunk's payload is returned
    /// (`None` if the stream carried none).
    fn chat_response<'a>(
        &'a self,
        request: ChatRequest,
        streamer: Option<ChatStreamer<'a>>,
    ) -> ProviderFuture<'a, Option<ChatResponse>> {
        let _ = (request, streamer);
        unsupported(self.id(), Capability::ChatResponse)
    }

    fn enrich_transactions<'a>(
        &'a self,
        transactions: Vec<EnrichmentInput>,
    ) -> ProviderFuture<'a, Vec<TransactionEnrichment>> {
        let _ = transactions;
        unsupported(self.id(), Capability::EnrichTransactions)
    }

    fn process_webhook<'a>(
        &'a self,
        payload: String,
        signature_header: String,
    ) -> ProviderFuture<'a, WebhookEvent> {
        let _ = (payload, signature_header);
        unsupported(self.id(), Capability::ProcessWebhook)
    }

    fn create_checkout_session<'a>(
        &'a self,
        request: CheckoutRequest,
    ) -> ProviderFuture<'a, CheckoutSession> {
        let _ = request;
        unsupported(self.id(), Capability::CreateCheckoutSession)
    }
}
