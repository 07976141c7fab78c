use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::OffsetDateTime;

use super::send_json;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::provider::{respond, Capability, CapabilitySet, Provider, ProviderError, ProviderFuture};
use crate::{CheckoutRequest, CheckoutSession, ProviderId, WebhookEvent};

const BASE_URL: &str = "https://api.stripe.com";

/// Maximum age, in seconds, of a webhook signature timestamp.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// Stripe payments: webhook verification and checkout sessions.
#[derive(Clone)]
pub struct StripeAdapter {
    http_client: Arc<dyn HttpClient>,
    auth: HttpAuth,
    webhook_secret: String,
    base_url: String,
}

impl StripeAdapter {
    pub fn new(
        secret_key: impl Into<String>,
        webhook_secret: impl Into<String>,
        http_client: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            http_client,
            auth: HttpAuth::BearerToken(secret_key.into()),
            webhook_secret: webhook_secret.into(),
            base_url: String::from(BASE_URL),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn verified_event(
        &self,
        payload: &str,
        signature_header: &str,
    ) -> Result<WebhookEvent, ProviderError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        verify_signature(payload, signature_header, &self.webhook_secret, now)?;
        serde_json::from_str(payload).map_err(|error| {
            ProviderError::invalid_request(format!("webhook payload is not a valid event: {error}"))
        })
    }

    async fn checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, ProviderError> {
        if request.quantity == 0 {
            return Err(ProviderError::invalid_request(
                "checkout quantity must be greater than zero",
            ));
        }

        let mut fields = vec![
            (String::from("mode"), request.mode.as_str().to_owned()),
            (String::from("line_items[0][price]"), request.price_id),
            (
                String::from("line_items[0][quantity]"),
                request.quantity.to_string(),
            ),
            (String::from("success_url"), request.success_url),
            (String::from("cancel_url"), request.cancel_url),
        ];
        if let Some(email) = request.customer_email {
            fields.push((String::from("customer_email"), email));
        }

        let http_request = HttpRequest::post(format!("{}/v1/checkout/sessions", self.base_url))
            .with_auth(&self.auth)
            .with_form_body(&fields);
        send_json(self.http_client.as_ref(), self.id(), http_request).await
    }
}

impl Provider for StripeAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Stripe
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::empty()
            .with(Capability::ProcessWebhook)
            .with(Capability::CreateCheckoutSession)
    }

    fn process_webhook<'a>(
        &'a self,
        payload: String,
        signature_header: String,
    ) -> ProviderFuture<'a, WebhookEvent> {
        respond(self.id(), Capability::ProcessWebhook, async move {
            self.verified_event(&payload, &signature_header)
        })
    }

    fn create_checkout_session<'a>(
        &'a self,
        request: CheckoutRequest,
    ) -> ProviderFuture<'a, CheckoutSession> {
        respond(
            self.id(),
            Capability::CreateCheckoutSession,
            self.checkout_session(request),
        )
    }
}

/// Checks a `t=<unix>,v1=<hex>` signature header against `secret`.
///
/// Any `v1` entry may match; other schemes are ignored.
pub(crate) fn verify_signature(
    payload: &str,
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), ProviderError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        ProviderError::invalid_request("webhook signature header has no timestamp")
    })?;
    if signatures.is_empty() {
        return Err(ProviderError::invalid_request(
            "webhook signature header has no v1 signature",
        ));
    }
    if now.abs_diff(timestamp) > WEBHOOK_TOLERANCE_SECS.unsigned_abs() {
        return Err(ProviderError::invalid_request(
            "webhook timestamp is outside the tolerance zone",
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ProviderError::internal("webhook secret cannot key HMAC-SHA256"))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());

    let matched = signatures.iter().any(|signature| {
        hex::decode(signature)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if matched {
        Ok(())
    } else {
        Err(ProviderError::invalid_request(
            "webhook signature does not match payload",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{block_on, RecordingHttpClient};
    use crate::{CheckoutMode, HttpResponse, ProviderErrorKind};

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &str = r#"{"id":"evt_1","type":"checkout.session.completed","created":1700000000,"data":{"object":{"id":"cs_1"}}}"#;

    fn sign(payload: &str, secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("any key length");
        mac.update(format!("{timestamp}.{payload}").as_bytes());
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_valid_signature() {
        let header = sign(PAYLOAD, SECRET, 1_700_000_000);
        assert!(verify_signature(PAYLOAD, &header, SECRET, 1_700_000_100).is_ok());
    }

    #[test]
    fn rejects_tampered_payload_wrong_secret_and_stale_timestamp() {
        let header = sign(PAYLOAD, SECRET, 1_700_000_000);
        let tampered = PAYLOAD.replace("cs_1", "cs_2");

        for result in [
            verify_signature(&tampered, &header, SECRET, 1_700_000_000),
            verify_signature(PAYLOAD, &header, "whsec_other", 1_700_000_000),
            verify_signature(PAYLOAD, &header, SECRET, 1_700_000_301),
            verify_signature(PAYLOAD, "v1=deadbeef", SECRET, 1_700_000_000),
        ] {
            let error = result.expect_err("must be rejected");
            assert_eq!(error.kind(), ProviderErrorKind::InvalidRequest);
        }
    }

    #[test]
    fn extreme_timestamps_are_stale_not_overflow() {
        for timestamp in [i64::MIN, i64::MAX] {
            let header = format!("t={timestamp},v1=00");
            for now in [i64::MIN, 0, 1_700_000_000, i64::MAX] {
                let error = verify_signature(PAYLOAD, &header, SECRET, now)
                    .expect_err("unsigned payload must be rejected");
                assert_eq!(error.kind(), ProviderErrorKind::InvalidRequest);
            }
        }

        let error = verify_signature(
            PAYLOAD,
            "t=-9223372036854775808,v1=00",
            SECRET,
            1_700_000_000,
        )
        .expect_err("stale");
        assert_eq!(error.message(), "webhook timestamp is outside the tolerance zone");
    }

    #[test]
    fn process_webhook_parses_event_without_network() {
        let client = Arc::new(RecordingHttpClient::failing("unused"));
        let adapter = StripeAdapter::new("sk_test", SECRET, client.clone());
        let header = sign(PAYLOAD, SECRET, OffsetDateTime::now_utc().unix_timestamp());

        let event = block_on(adapter.process_webhook(PAYLOAD.to_owned(), header))
            .into_result()
            .expect("valid webhook");
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn checkout_session_posts_form() {
        let client = Arc::new(RecordingHttpClient::responding(HttpResponse::ok_json(
            r#"{"id":"cs_test_1","object":"checkout.session","url":"https://checkout.stripe.com/c/pay/cs_test_1"}"#,
        )));
        let adapter = StripeAdapter::new("sk_test", SECRET, client.clone());

        let session = block_on(adapter.create_checkout_session(CheckoutRequest {
            price_id: String::from("price_123"),
            quantity: 1,
            mode: CheckoutMode::Subscription,
            success_url: String::from("https://app.test/ok"),
            cancel_url: String::from("https://app.test/cancel"),
            customer_email: None,
        }))
        .into_result()
        .expect("session");
        assert_eq!(session.id, "cs_test_1");

        let requests = client.recorded_requests();
        assert_eq!(requests[0].url, "https://api.stripe.com/v1/checkout/sessions");
        assert_eq!(
            requests[0].headers.get("authorization").map(String::as_str),
            Some("Bearer sk_test")
        );
        let body = requests[0].body.as_deref().unwrap_or_default();
        assert!(body.starts_with("mode=subscription&line_items%5B0%5D%5Bprice%5D=price_123"));
    }
}
