//! Exchange-rate lookup that always produces a renderable view.
//!
//! Every failure (bad input, missing provider, vendor error) degrades to a
//! view with no rate and an error message instead of an `Err`.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    format_date, parse_date, Concept, CurrencyCode, Envelope, ExchangeRate, ProviderError,
    ProviderRegistry, ProviderSettings,
};

pub const DEFAULT_FROM: &str = "USD";
pub const DEFAULT_TO: &str = "MXN";

/// Raw, optional inputs as they arrive from a form or the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRateParams {
    pub from: Option<String>,
    pub to: Option<String>,
    /// `YYYY-MM-DD`; today (UTC) when absent.
    pub date: Option<String>,
    /// Provider name; the first resolved provider when absent.
    pub provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateView {
    pub from: String,
    pub to: String,
    pub date: String,
    pub rate: Option<f64>,
    pub error_message: Option<String>,
}

impl ExchangeRateView {
    fn failed(mut self, message: &str) -> Self {
        self.rate = None;
        self.error_message = Some(format!("Error fetching exchange rate: {message}"));
        self
    }
}

pub struct ExchangeRateLookup {
    registry: ProviderRegistry,
}

impl ExchangeRateLookup {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self::with_registry(ProviderRegistry::for_concept(
            Concept::ExchangeRates,
            settings,
        ))
    }

    pub fn with_registry(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    pub async fn lookup(&self, params: &ExchangeRateParams) -> ExchangeRateView {
        self.lookup_on(params, OffsetDateTime::now_utc().date()).await
    }

    /// Same as [`lookup`](Self::lookup) with an explicit "today".
    pub async fn lookup_on(&self, params: &ExchangeRateParams, today: Date) -> ExchangeRateView {
        let from = present(params.from.as_deref()).unwrap_or(DEFAULT_FROM);
        let to = present(params.to.as_deref()).unwrap_or(DEFAULT_TO);
        let date = present(params.date.as_deref())
            .map_or_else(|| format_date(today), str::to_owned);
        let view = ExchangeRateView {
            from: from.to_ascii_uppercase(),
            to: to.to_ascii_uppercase(),
            date,
            rate: None,
            error_message: None,
        };

        let envelope = match self.fetch(&view, params.provider.as_deref()).await {
            Ok(envelope) => envelope,
            Err(error) => return view.failed(error.message()),
        };
        match envelope.into_result() {
            Ok(rate) => ExchangeRateView {
                rate: Some(rate.rate),
                ..view
            },
            Err(error) => view.failed(&error.message),
        }
    }

    async fn fetch(
        &self,
        view: &ExchangeRateView,
        provider: Option<&str>,
    ) -> Result<Envelope<ExchangeRate>, ProviderError> {
        let from = CurrencyCode::parse(&view.from)?;
        let to = CurrencyCode::parse(&view.to)?;
        let date = parse_date(&view.date)?;
        let provider = match present(provider) {
            Some(name) => self.registry.get_provider_by_name(name)?,
            None => self.registry.first_provider()?,
        };

        Ok(provider.fetch_exchange_rate(from, to, date).await)
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::Month;

    use super::*;
    use crate::test_support::{block_on, RecordingHttpClient};
    use crate::HttpResponse;

    fn today() -> Date {
        Date::from_calendar_date(2025, Month::March, 14).expect("valid date")
    }

    fn lookup_with(settings: &ProviderSettings, client: Arc<RecordingHttpClient>) -> ExchangeRateLookup {
        ExchangeRateLookup::with_registry(
            ProviderRegistry::for_concept(Concept::ExchangeRates, settings).with_http_client(client),
        )
    }

    #[test]
    fn defaults_to_usd_mxn_today_on_first_provider() {
        let client = Arc::new(RecordingHttpClient::responding(HttpResponse::ok_json(
            r#"{"success":true,"historical":true,"date":"2025-03-14","source":"USD","quotes":{"USDMXN":20.05}}"#,
        )));
        let settings = ProviderSettings::empty()
            .with_exchange_rate_host_key("erh-key")
            .with_synth_key("synth-key");
        let lookup = lookup_with(&settings, client.clone());

        let view = block_on(lookup.lookup_on(&ExchangeRateParams::default(), today()));
        assert_eq!(view.from, "USD");
        assert_eq!(view.to, "MXN");
        assert_eq!(view.date, "2025-03-14");
        assert_eq!(view.rate, Some(20.05));
        assert_eq!(view.error_message, None);
        assert!(client.recorded_requests()[0]
            .url
            .starts_with("https://api.exchangerate.host/historical?"));
    }

    #[test]
    fn vendor_failure_degrades_to_message() {
        let client = Arc::new(RecordingHttpClient::failing("connection refused"));
        let settings = ProviderSettings::empty().with_synth_key("synth-key");
        let lookup = lookup_with(&settings, client);
        let params = ExchangeRateParams {
            from: Some(String::from("eur")),
            provider: Some(String::from("synth")),
            ..ExchangeRateParams::default()
        };

        let view = block_on(lookup.lookup_on(&params, today()));
        assert_eq!(view.from, "EUR");
        assert_eq!(view.rate, None);
        let message = view.error_message.expect("message");
        assert!(message.starts_with("Error fetching exchange rate: "));
        assert!(message.contains("connection refused"));
    }

    #[test]
    fn unknown_provider_degrades_without_request() {
        let client = Arc::new(RecordingHttpClient::failing("unused"));
        let lookup = lookup_with(&ProviderSettings::empty(), client.clone());
        let params = ExchangeRateParams {
            provider: Some(String::from("nonexistent")),
            ..ExchangeRateParams::default()
        };

        let view = block_on(lookup.lookup_on(&params, today()));
        assert_eq!(
            view.error_message.as_deref(),
            Some("Error fetching exchange rate: Provider 'nonexistent' not found for concept: exchange_rates")
        );
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn malformed_date_degrades() {
        let client = Arc::new(RecordingHttpClient::failing("unused"));
        let settings = ProviderSettings::empty().with_synth_key("synth-key");
        let lookup = lookup_with(&settings, client.clone());
        let params = ExchangeRateParams {
            date: Some(String::from("14/03/2025")),
            ..ExchangeRateParams::default()
        };

        let view = block_on(lookup.lookup_on(&params, today()));
        assert_eq!(view.date, "14/03/2025");
        assert!(view.rate.is_none());
        assert!(view.error_message.is_some());
        assert_eq!(client.request_count(), 0);
    }
}
