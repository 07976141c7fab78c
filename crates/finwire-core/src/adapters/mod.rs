mod exchange_rate_host;
mod openai;
mod plaid;
mod stripe;
mod synth;

pub use exchange_rate_host::ExchangeRateHostAdapter;
pub use openai::{OpenAiAdapter, MAX_BATCH_SIZE, SUPPORTED_HOSTED_MODELS};
pub use plaid::PlaidAdapter;
pub use stripe::{StripeAdapter, WEBHOOK_TOLERANCE_SECS};
pub use synth::SynthAdapter;

use serde::de::DeserializeOwned;
use serde_json::Value;
use time::Date;

use crate::{CurrencyCode, ExchangeRate, HttpClient, HttpRequest, ProviderError, ProviderId};

/// Sends `request` and decodes a 2xx JSON body.
///
/// Non-2xx statuses become vendor errors carrying the vendor's own message
/// when the body has one.
async fn send_json<T: DeserializeOwned>(
    http_client: &dyn HttpClient,
    provider: ProviderId,
    request: HttpRequest,
) -> Result<T, ProviderError> {
    let response = http_client.execute(request).await.map_err(|error| {
        ProviderError::from(error).with_context(provider.as_str())
    })?;
    if !response.is_success() {
        return Err(status_error(provider, response.status, &response.body));
    }
    serde_json::from_str(&response.body).map_err(|error| {
        ProviderError::vendor(format!("{provider} returned an unreadable body: {error}"))
    })
}

fn status_error(provider: ProviderId, status: u16, body: &str) -> ProviderError {
    let message = vendor_message(body)
        .unwrap_or_else(|| format!("{provider} upstream returned status {status}"));
    ProviderError::vendor_status(status, message)
}

/// Pulls a human-readable message out of common vendor error bodies.
fn vendor_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    [
        "/error/message",
        "/error/info",
        "/error_message",
        "/message",
        "/error",
    ]
    .into_iter()
    .find_map(|pointer| value.pointer(pointer).and_then(Value::as_str))
    .filter(|message| !message.trim().is_empty())
    .map(str::to_owned)
}

/// Rate for converting a currency into itself; no vendor call needed.
fn identity_rate(
    from: &CurrencyCode,
    to: &CurrencyCode,
    date: Date,
) -> Option<Result<ExchangeRate, ProviderError>> {
    (from == to).then(|| {
        ExchangeRate::new(from.clone(), to.clone(), date, 1.0).map_err(ProviderError::from)
    })
}
