use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use time::Date;

use super::{identity_rate, send_json};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::provider::{respond, Capability, CapabilitySet, Provider, ProviderError, ProviderFuture};
use crate::{format_date, CurrencyCode, ExchangeRate, ProviderId, Security, SecurityPrice, Symbol};

const BASE_URL: &str = "https://api.synthfinance.com";

/// Synth market data: exchange rates, security prices and ticker search.
#[derive(Clone)]
pub struct SynthAdapter {
    http_client: Arc<dyn HttpClient>,
    auth: HttpAuth,
    base_url: String,
}

impl SynthAdapter {
    pub fn new(api_key: impl Into<String>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            auth: HttpAuth::BearerToken(api_key.into()),
            base_url: String::from(BASE_URL),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let request = HttpRequest::get(format!("{}{path}", self.base_url)).with_auth(&self.auth);
        send_json(self.http_client.as_ref(), self.id(), request).await
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

        let body: RatesResponse = self
            .get(&format!(
                "/rates/historical?date={}&from={from}&to={to}",
                format_date(date)
            ))
            .await?;
        let rate = body
            .data
            .rates
            .get(to.as_str())
            .copied()
            .ok_or_else(|| ProviderError::vendor(format!("synth returned no rate for {from}/{to}")))?;

        ExchangeRate::new(from, to, date, rate).map_err(ProviderError::from)
    }

    async fn closing_price(&self, symbol: Symbol, date: Date) -> Result<SecurityPrice, ProviderError> {
        let day = format_date(date);
        let body: OpenCloseResponse = self
            .get(&format!(
                "/tickers/{}/open-close?start_date={day}&end_date={day}",
                urlencoding::encode(symbol.as_str())
            ))
            .await?;

        let close = body
            .prices
            .iter()
            .find(|price| price.date == day)
            .or_else(|| body.prices.first())
            .map(|price| price.close)
            .ok_or_else(|| {
                ProviderError::vendor(format!("synth returned no price for {symbol} on {day}"))
            })?;
        let currency = match body.currency {
            Some(code) => CurrencyCode::parse(&code)?,
            None => CurrencyCode::usd(),
        };

        SecurityPrice::new(symbol, date, close, currency).map_err(ProviderError::from)
    }

    async fn ticker_search(&self, query: String) -> Result<Vec<Security>, ProviderError> {
        if query.trim().is_empty() {
            return Err(ProviderError::invalid_request("search query must not be empty"));
        }

        let body: SearchResponse = self
            .get(&format!(
                "/tickers/search?name={}&dataset=limited",
                urlencoding::encode(query.trim())
            ))
            .await?;

        // Tickers that fail symbol validation are skipped rather than failing the search.
        Ok(body
            .data
            .into_iter()
            .filter_map(|hit| {
                let symbol = Symbol::parse(&hit.symbol).ok()?;
                Some(Security {
                    symbol,
                    name: hit.name,
                    exchange: hit.exchange.and_then(|exchange| exchange.operating_mic_code),
                    currency: hit
                        .currency
                        .and_then(|code| CurrencyCode::parse(&code).ok()),
                })
            })
            .collect())
    }
}

impl Provider for SynthAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Synth
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::empty()
            .with(Capability::FetchExchangeRate)
            .with(Capability::FetchSecurityPrice)
            .with(Capability::SearchSecurities)
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

    fn fetch_security_price<'a>(
        &'a self,
        symbol: Symbol,
        date: Date,
    ) -> ProviderFuture<'a, SecurityPrice> {
        respond(
            self.id(),
            Capability::FetchSecurityPrice,
            self.closing_price(symbol, date),
        )
    }

    fn search_securities<'a>(&'a self, query: String) -> ProviderFuture<'a, Vec<Security>> {
        respond(
            self.id(),
            Capability::SearchSecurities,
            self.ticker_search(query),
        )
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    data: RatesData,
}

#[derive(Debug, Deserialize)]
struct RatesData {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct OpenCloseResponse {
    #[serde(default)]
    prices: Vec<OpenClosePrice>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenClosePrice {
    date: String,
    close: f64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    symbol: String,
    name: String,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    exchange: Option<SearchExchange>,
}

#[derive(Debug, Deserialize)]
struct SearchExchange {
    #[serde(default)]
    operating_mic_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{block_on, RecordingHttpClient};
    use crate::{HttpResponse, ProviderErrorKind};
    use time::macros::date;

    #[test]
    fn fetches_rate_with_bearer_auth() {
        let client = Arc::new(RecordingHttpClient::responding(HttpResponse::ok_json(
            r#"{"data":{"date":"2024-03-01","source":"USD","rates":{"MXN":17.05}}}"#,
        )));
        let adapter = SynthAdapter::new("synth-key", client.clone());

        let envelope = block_on(adapter.fetch_exchange_rate(
            CurrencyCode::usd(),
            CurrencyCode::parse("MXN").expect("valid"),
            date!(2024 - 03 - 01),
        ));
        assert_eq!(envelope.data().map(|rate| rate.rate), Some(17.05));

        let requests = client.recorded_requests();
        assert_eq!(
            requests[0].url,
            "https://api.synthfinance.com/rates/historical?date=2024-03-01&from=USD&to=MXN"
        );
        assert_eq!(
            requests[0].headers.get("authorization").map(String::as_str),
            Some("Bearer synth-key")
        );
    }

    #[test]
    fn security_price_uses_matching_day_and_currency() {
        let client = Arc::new(RecordingHttpClient::responding(HttpResponse::ok_json(
            r#"{"ticker":"SHOP","currency":"CAD","prices":[{"date":"2024-03-01","open":100.0,"close":104.5}]}"#,
        )));
        let adapter = SynthAdapter::new("synth-key", client);

        let envelope = block_on(adapter.fetch_security_price(
            Symbol::parse("SHOP").expect("valid"),
            date!(2024 - 03 - 01),
        ));
        let price = envelope.data().expect("success");
        assert_eq!(price.price, 104.5);
        assert_eq!(price.currency.as_str(), "CAD");
    }

    #[test]
    fn search_skips_unparsable_tickers() {
        let client = Arc::new(RecordingHttpClient::responding(HttpResponse::ok_json(
            r#"{"data":[
                {"symbol":"AAPL","name":"Apple Inc.","currency":"USD","exchange":{"operating_mic_code":"XNAS"}},
                {"symbol":"???","name":"Broken"}
            ]}"#,
        )));
        let adapter = SynthAdapter::new("synth-key", client);

        let results = block_on(adapter.search_securities(String::from("apple")))
            .into_result()
            .expect("success");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].exchange.as_deref(), Some("XNAS"));
    }

    #[test]
    fn unauthorized_status_surfaces_vendor_message() {
        let client = Arc::new(RecordingHttpClient::responding(HttpResponse::with_status(
            401,
            r#"{"message":"Invalid API key"}"#,
        )));
        let adapter = SynthAdapter::new("wrong", client);

        let envelope = block_on(adapter.search_securities(String::from("apple")));
        let error = envelope.error().expect("failure");
        assert_eq!(error.kind, ProviderErrorKind::Vendor);
        assert_eq!(error.message, "Invalid API key");
        assert!(!error.retryable);
    }

    #[test]
    fn llm_capabilities_are_not_found() {
        let adapter = SynthAdapter::new("synth-key", Arc::new(RecordingHttpClient::failing("x")));
        let envelope = block_on(adapter.auto_categorize(Vec::new(), Vec::new()));
        assert_eq!(
            envelope.error().map(|error| error.kind),
            Some(ProviderErrorKind::NotFound)
        );
    }
}
