use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use time::Date;

use super::{identity_rate, send_json};
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider::{respond, Capability, CapabilitySet, Provider, ProviderError, ProviderFuture};
use crate::{format_date, CurrencyCode, ExchangeRate, ProviderId};

const BASE_URL: &str = "https://api.exchangerate.host";

/// exchangerate.host historical rates.
#[derive(Clone)]
pub struct ExchangeRateHostAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
}

impl ExchangeRateHostAdapter {
    pub fn new(api_key: impl Into<String>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: String::from(BASE_URL),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn historical_rate(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
        date: Date,
    ) -> Result<ExchangeRate, ProviderError> {
        if let Some(rate) = identity_rate(&from, &to, date) {
            return rate;
        }

        let url = format!(
            "{}/historical?access_key={}&date={}&source={}&currencies={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            format_date(date),
            from,
            to
        );
        let body: HistoricalResponse =
            send_json(self.http_client.as_ref(), self.id(), HttpRequest::get(url)).await?;

        if !body.success {
            let message = body
                .error
                .and_then(|error| error.info)
                .unwrap_or_else(|| String::from("exchange_rate_host request was not successful"));
            return Err(ProviderError::vendor(message));
        }

        let pair = format!("{from}{to}");
        let rate = body
            .quotes
            .and_then(|quotes| quotes.get(&pair).copied())
            .ok_or_else(|| {
                ProviderError::vendor(format!("exchange_rate_host returned no quote for {pair}"))
            })?;

        ExchangeRate::new(from, to, date, rate).map_err(ProviderError::from)
    }
}

impl Provider for ExchangeRateHostAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::ExchangeRateHost
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::empty().with(Capability::FetchExchangeRate)
    }

    fn fetch_exchange_rate<'a>(
        &'a self,
        from: CurrencyCode,
        to: CurrencyCode,
        date: Date,
    ) -> ProviderFuture<'a, ExchangeRate> {
        respond(
            self.id(),
            Capability::FetchExchangeRate,
            self.historical_rate(from, to, date),
        )
    }
}

#[derive(Debug, Deserialize)]
struct HistoricalResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    quotes: Option<HashMap<String, f64>>,
    #[serde(default)]
    error: Option<VendorError>,
}

#[derive(Debug, Deserialize)]
struct VendorError {
    #[serde(default)]
    info: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{block_on, RecordingHttpClient};
    use crate::{HttpResponse, ProviderErrorKind};
    use time::macros::date;

    fn currency(code: &str) -> CurrencyCode {
        CurrencyCode::parse(code).expect("valid currency")
    }

    #[test]
    fn reads_pair_quote_from_historical_endpoint() {
        let client = Arc::new(RecordingHttpClient::responding(HttpResponse::ok_json(
            r#"{"success":true,"historical":true,"date":"2024-03-01","source":"USD","quotes":{"USDMXN":17.0712}}"#,
        )));
        let adapter = ExchangeRateHostAdapter::new("erh-key", client.clone());

        let envelope = block_on(adapter.fetch_exchange_rate(
            currency("USD"),
            currency("MXN"),
            date!(2024 - 03 - 01),
        ));
        let rate = envelope.data().expect("success");
        assert!((rate.rate - 17.0712).abs() < f64::EPSILON);

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url,
            "https://api.exchangerate.host/historical?access_key=erh-key&date=2024-03-01&source=USD&currencies=MXN"
        );
    }

    #[test]
    fn vendor_failure_body_becomes_envelope_error() {
        let client = Arc::new(RecordingHttpClient::responding(HttpResponse::ok_json(
            r#"{"success":false,"error":{"code":101,"type":"invalid_access_key","info":"You have not supplied a valid API Access Key."}}"#,
        )));
        let adapter = ExchangeRateHostAdapter::new("bad", client);

        let envelope = block_on(adapter.fetch_exchange_rate(
            currency("USD"),
            currency("EUR"),
            date!(2024 - 03 - 01),
        ));
        let error = envelope.error().expect("failure");
        assert_eq!(error.kind, ProviderErrorKind::Vendor);
        assert_eq!(error.message, "You have not supplied a valid API Access Key.");
        assert_eq!(error.source, Some(ProviderId::ExchangeRateHost));
    }

    #[test]
    fn same_currency_skips_network() {
        let client = Arc::new(RecordingHttpClient::responding(HttpResponse::ok_json("{}")));
        let adapter = ExchangeRateHostAdapter::new("erh-key", client.clone());

        let envelope = block_on(adapter.fetch_exchange_rate(
            currency("EUR"),
            currency("EUR"),
            date!(2024 - 03 - 01),
        ));
        assert_eq!(envelope.data().map(|rate| rate.rate), Some(1.0));
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn transport_failure_is_retryable_vendor_error() {
        let client = Arc::new(RecordingHttpClient::failing("connection failed: refused"));
        let adapter = ExchangeRateHostAdapter::new("erh-key", client);

        let envelope = block_on(adapter.fetch_exchange_rate(
            currency("USD"),
            currency("MXN"),
            date!(2024 - 03 - 01),
        ));
        let error = envelope.error().expect("failure");
        assert!(error.retryable);
        assert!(error.message.starts_with("exchange_rate_host: "));
    }
}
