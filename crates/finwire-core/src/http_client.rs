use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

/// Per-request timeout applied when an adapter does not override it.
pub const DEFAULT_TIMEOUT_MS: u64 = 3_000;

/// Capacity of the channel carrying streamed body fragments.
pub const STREAM_CHANNEL_CAPACITY: usize = 32;

pub type HttpFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;

/// Minimal HTTP method set needed by provider adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Authentication strategy applied to outgoing HTTP requests.
#[derive(Clone, PartialEq, Eq)]
pub enum HttpAuth {
    None,
    BearerToken(String),
    Header { name: String, value: String },
}

impl HttpAuth {
    pub fn apply(&self, headers: &mut BTreeMap<String, String>) {
        match self {
            Self::None => {}
            Self::BearerToken(token) => {
                headers.insert(String::from("authorization"), format!("Bearer {token}"));
            }
            Self::Header { name, value } => {
                headers.insert(name.to_ascii_lowercase(), value.clone());
            }
        }
    }
}

// Credentials must not leak through `{:?}` in logs.
impl std::fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::BearerToken(_) => f.write_str("BearerToken(***)"),
            Self::Header { name, .. } => write!(f, "Header({name}: ***)"),
        }
    }
}

/// HTTP request envelope used by adapter transport calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_json_body(self, body: &serde_json::Value) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(body.to_string())
    }

    pub fn with_form_body(self, fields: &[(String, String)]) -> Self {
        let encoded = fields
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        self.with_header("content-type", "application/x-www-form-urlencoded")
            .with_body(encoded)
    }

    pub fn with_auth(mut self, auth: &HttpAuth) -> Self {
        auth.apply(&mut self.headers);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn body_json(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_str(body).ok())
    }
}

/// HTTP response envelope returned by an adapter transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level HTTP error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
    retryable: bool,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Adapter transport contract.
pub trait HttpClient: Send + Sync {
    /// Sends the request and buffers the whole body.
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a>;

    /// Sends the request and pushes body fragments into `sink` as they arrive.
    ///
    /// On a 2xx status the returned response has an empty body and the sender
    /// is dropped when the body ends, closing the channel. On any other status
    /// nothing is pushed and the response carries the full error body.
    fn execute_stream<'a>(
        &'a self,
        request: HttpRequest,
        sink: mpsc::Sender<String>,
    ) -> HttpFuture<'a>;
}

/// Production HTTP client backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent(concat!("finwire/", env!("CARGO_PKG_VERSION")))
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    async fn send(&self, request: HttpRequest) -> Result<reqwest::Response, HttpError> {
        debug!(
            method = ?request.method,
            url = %redact_query(&request.url),
            "sending vendor request"
        );

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        builder = builder.timeout(Duration::from_millis(request.timeout_ms));
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::new(format!("request timeout: {e}"))
            } else if e.is_connect() {
                HttpError::new(format!("connection failed: {e}"))
            } else {
                HttpError::new(format!("request failed: {e}"))
            }
        })
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        Box::pin(async move {
            let response = self.send(request).await?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| HttpError::new(format!("failed to read response body: {e}")))?;
            Ok(HttpResponse { status, body })
        })
    }

    fn execute_stream<'a>(
        &'a self,
        request: HttpRequest,
        sink: mpsc::Sender<String>,
    ) -> HttpFuture<'a> {
        Box::pin(async move {
            let mut response = self.send(request).await?;
            let status = response.status().as_u16();
            if !response.status().is_success() {
                let body = response
                    .text()
                    .await
                    .map_err(|e| HttpError::new(format!("failed to read response body: {e}")))?;
                return Ok(HttpResponse { status, body });
            }

            // Multi-byte characters may straddle network chunks.
            let mut pending = Vec::new();
            while let Some(bytes) = response
                .chunk()
                .await
                .map_err(|e| HttpError::new(format!("stream interrupted: {e}")))?
            {
                pending.extend_from_slice(&bytes);
                let valid = match std::str::from_utf8(&pending) {
                    Ok(text) => text.len(),
                    Err(error) if error.error_len().is_none() => error.valid_up_to(),
                    Err(_) => {
                        return Err(HttpError::non_retryable("stream is not valid UTF-8"));
                    }
                };
                let rest = pending.split_off(valid);
                let fragment = String::from_utf8_lossy(&pending).into_owned();
                pending = rest;
                if !fragment.is_empty() && sink.send(fragment).await.is_err() {
                    break;
                }
            }
            Ok(HttpResponse::with_status(status, String::new()))
        })
    }
}

/// Strips query strings, which may carry access keys, before logging a URL.
pub fn redact_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_auth_populates_authorization_header() {
        let request = HttpRequest::get("https://example.test/rates")
            .with_auth(&HttpAuth::BearerToken(String::from("token-123")));

        assert_eq!(
            request.headers.get("authorization").map(String::as_str),
            Some("Bearer token-123")
        );
    }

    #[test]
    fn form_body_is_url_encoded() {
        let request = HttpRequest::post("https://example.test").with_form_body(&[
            (String::from("line_items[0][price]"), String::from("price_1")),
            (String::from("success_url"), String::from("https://a.test/?ok=1")),
        ]);

        assert_eq!(
            request.body.as_deref(),
            Some("line_items%5B0%5D%5Bprice%5D=price_1&success_url=https%3A%2F%2Fa.test%2F%3Fok%3D1")
        );
    }

    #[test]
    fn debug_output_hides_credentials() {
        let auth = HttpAuth::Header {
            name: String::from("X-Api-Key"),
            value: String::from("secret"),
        };
        assert!(!format!("{auth:?}").contains("secret"));
    }

    #[test]
    fn redacts_query_strings() {
        assert_eq!(
            redact_query("https://api.test/historical?access_key=k"),
            "https://api.test/historical"
        );
        assert_eq!(redact_query("https://api.test/x"), "https://api.test/x");
    }
}
