//! OpenAI adapter covering both LLM backends.
//!
//! The hosted backend talks to the Responses API and only accepts models on
//! [`SUPPORTED_HOSTED_MODELS`]. The self-hosted backend talks to an
//! OpenAI-compatible Chat Completions server and always uses its configured
//! model, whatever the caller asked for.

mod auto_categorizer;
mod merchant_detector;
mod parser;
mod request;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use self::parser::{parse_chat_completion, parse_responses, StreamParser};
use super::{send_json, status_error};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, STREAM_CHANNEL_CAPACITY};
use crate::provider::{
    respond, Capability, CapabilitySet, ChatStreamer, Provider, ProviderError, ProviderFuture,
};
use crate::settings::LlmBackend;
use crate::sse::{SseDecoder, SseEvent};
use crate::{
    AutoCategorization, AutoDetectedMerchant, ChatRequest, ChatResponse, ChatStreamChunk,
    ProviderId, TransactionInput, UserCategory, UserMerchant,
};

/// Most transactions accepted by one auto-categorize or merchant-detection call.
pub const MAX_BATCH_SIZE: usize = 25;

/// Models the hosted backend accepts.
pub const SUPPORTED_HOSTED_MODELS: [&str; 1] = ["gpt-4.1"];

const DEFAULT_MODEL: &str = "gpt-4.1";
const HOSTED_BASE_URL: &str = "https://api.openai.com/v1";
const LLM_TIMEOUT_MS: u64 = 60_000;

#[derive(Clone)]
pub struct OpenAiAdapter {
    http_client: Arc<dyn HttpClient>,
    backend: LlmBackend,
    hosted_base_url: String,
}

impl OpenAiAdapter {
    pub fn new(backend: LlmBackend, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            backend,
            hosted_base_url: String::from(HOSTED_BASE_URL),
        }
    }

    /// Overrides the hosted endpoint; the self-hosted URL comes from its backend.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.hosted_base_url = base_url.into();
        self
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    /// Models the current backend will run.
    pub fn current_models(&self) -> Vec<&str> {
        match &self.backend {
            LlmBackend::Hosted { .. } => SUPPORTED_HOSTED_MODELS.to_vec(),
            LlmBackend::SelfHosted { model, .. } => vec![model.as_str()],
        }
    }

    pub fn supports_model(&self, model: &str) -> bool {
        self.current_models().contains(&model)
    }

    /// Model actually sent upstream for a caller-requested one.
    pub fn effective_model(&self, requested: &str) -> Result<String, ProviderError> {
        if let LlmBackend::SelfHosted { model, .. } = &self.backend {
            return Ok(model.clone());
        }
        let requested = requested.trim();
        let requested = if requested.is_empty() {
            DEFAULT_MODEL
        } else {
            requested
        };
        if self.supports_model(requested) {
            Ok(requested.to_owned())
        } else {
            Err(ProviderError::unsupported_model(requested))
        }
    }

    fn auth(&self) -> HttpAuth {
        match &self.backend {
            LlmBackend::Hosted { access_token } => HttpAuth::BearerToken(access_token.clone()),
            LlmBackend::SelfHosted { access_token, .. } => {
                HttpAuth::BearerToken(access_token.clone())
            }
        }
    }

    fn endpoint(&self) -> String {
        match &self.backend {
            LlmBackend::Hosted { .. } => {
                format!("{}/responses", self.hosted_base_url.trim_end_matches('/'))
            }
            LlmBackend::SelfHosted { base_url, .. } => {
                format!("{}/chat/completions", base_url.trim_end_matches('/'))
            }
        }
    }

    fn post(&self, body: &Value) -> HttpRequest {
        HttpRequest::post(self.endpoint())
            .with_auth(&self.auth())
            .with_timeout_ms(LLM_TIMEOUT_MS)
            .with_json_body(body)
    }

    async fn chat(
        &self,
        request: ChatRequest,
        streamer: Option<ChatStreamer<'_>>,
    ) -> Result<Option<ChatResponse>, ProviderError> {
        let model = self.effective_model(&request.model)?;
        let stream = streamer.is_some();
        let body = if self.backend.is_self_hosted() {
            if !request.function_results.is_empty() {
                warn!(
                    provider = %ProviderId::OpenAi,
                    dropped = request.function_results.len(),
                    "self-hosted backend cannot replay tool results; sending prompt only"
                );
            }
            request::chat_completions_body(&model, &request, stream)
        } else {
            request::responses_chat_body(&model, &request, stream)
        };
        debug!(provider = %ProviderId::OpenAi, model = %model, stream, "sending chat request");

        let http_request = self.post(&body);
        match streamer {
            Some(streamer) => {
                let parser = if self.backend.is_self_hosted() {
                    StreamParser::chat_completions()
                } else {
                    StreamParser::responses()
                };
                self.stream_chat(http_request, parser, streamer).await
            }
            None => {
                let value: Value =
                    send_json(self.http_client.as_ref(), ProviderId::OpenAi, http_request).await?;
                let response = if self.backend.is_self_hosted() {
                    parse_chat_completion(value)?
                } else {
                    parse_responses(value)?
                };
                Ok(Some(response))
            }
        }
    }

    /// Forwards every parsed chunk to `streamer` as it arrives and returns the
    /// payload of the first final-response chunk, if any.
    async fn stream_chat(
        &self,
        http_request: HttpRequest,
        mut parser: StreamParser,
        streamer: ChatStreamer<'_>,
    ) -> Result<Option<ChatResponse>, ProviderError> {
        let (sender, mut receiver) = mpsc::channel::<String>(STREAM_CHANNEL_CAPACITY);
        let transfer = self.http_client.execute_stream(http_request, sender);

        let forward = async move {
            let mut decoder = SseDecoder::new();
            let mut collected = Vec::new();
            let mut failure = None;
            while let Some(fragment) = receiver.recv().await {
                for event in decoder.push(&fragment) {
                    forward_event(&mut parser, &mut *streamer, &event, &mut collected, &mut failure);
                }
            }
            if let Some(event) = decoder.finish() {
                forward_event(&mut parser, &mut *streamer, &event, &mut collected, &mut failure);
            }
            (collected, failure)
        };

        let (transport, (collected, failure)) = tokio::join!(transfer, forward);
        let response = transport
            .map_err(|error| ProviderError::from(error).with_context(ProviderId::OpenAi.as_str()))?;
        if !response.is_success() {
            return Err(status_error(ProviderId::OpenAi, response.status, &response.body));
        }
        if let Some(error) = failure {
            return Err(error);
        }

        debug!(
            provider = %ProviderId::OpenAi,
            chunks = collected.len(),
            "chat stream finished"
        );
        Ok(collected
            .into_iter()
            .find_map(|chunk| chunk.as_response().cloned()))
    }

    /// Runs a JSON-schema constrained completion and returns the parsed reply.
    async fn structured(
        &self,
        instructions: &str,
        prompt: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<Value, ProviderError> {
        let model = self.effective_model(DEFAULT_MODEL)?;
        let text = if self.backend.is_self_hosted() {
            let body = request::chat_completions_structured_body(
                &model,
                instructions,
                prompt,
                schema_name,
                schema,
            );
            let value: Value =
                send_json(self.http_client.as_ref(), ProviderId::OpenAi, self.post(&body)).await?;
            parse_chat_completion(value)?.content
        } else {
            let body =
                request::responses_structured_body(&model, instructions, prompt, schema_name, schema);
            let value: Value =
                send_json(self.http_client.as_ref(), ProviderId::OpenAi, self.post(&body)).await?;
            parse_responses(value)?.content
        };
        serde_json::from_str(strip_code_fence(&text)).map_err(|error| {
            ProviderError::vendor(format!("model returned malformed structured output: {error}"))
        })
    }

    async fn categorize(
        &self,
        transactions: Vec<TransactionInput>,
        user_categories: Vec<UserCategory>,
    ) -> Result<Vec<AutoCategorization>, ProviderError> {
        check_batch(&transactions, "auto-categorize")?;
        if transactions.is_empty() {
            return Ok(Vec::new());
        }
        let prompt = auto_categorizer::prompt(&transactions, &user_categories)?;
        let schema = auto_categorizer::schema(&transactions, &user_categories);
        let reply = self
            .structured(
                auto_categorizer::INSTRUCTIONS,
                &prompt,
                auto_categorizer::SCHEMA_NAME,
                schema,
            )
            .await?;
        auto_categorizer::normalize(reply, &transactions, &user_categories)
    }

    async fn detect_merchants(
        &self,
        transactions: Vec<TransactionInput>,
        user_merchants: Vec<UserMerchant>,
    ) -> Result<Vec<AutoDetectedMerchant>, ProviderError> {
        check_batch(&transactions, "auto-detect merchants")?;
        if transactions.is_empty() {
            return Ok(Vec::new());
        }
        let prompt = merchant_detector::prompt(&transactions, &user_merchants)?;
        let schema = merchant_detector::schema(&transactions);
        let reply = self
            .structured(
                merchant_detector::INSTRUCTIONS,
                &prompt,
                merchant_detector::SCHEMA_NAME,
                schema,
            )
            .await?;
        merchant_detector::normalize(reply, &transactions, &user_merchants)
    }
}

impl Provider for OpenAiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::empty()
            .with(Capability::AutoCategorize)
            .with(Capability::AutoDetectMerchants)
            .with(Capability::ChatResponse)
    }

    fn auto_categorize<'a>(
        &'a self,
        transactions: Vec<TransactionInput>,
        user_categories: Vec<UserCategory>,
    ) -> ProviderFuture<'a, Vec<AutoCategorization>> {
        respond(
            self.id(),
            Capability::AutoCategorize,
            self.categorize(transactions, user_categories),
        )
    }

    fn auto_detect_merchants<'a>(
        &'a self,
        transactions: Vec<TransactionInput>,
        user_merchants: Vec<UserMerchant>,
    ) -> ProviderFuture<'a, Vec<AutoDetectedMerchant>> {
        respond(
            self.id(),
            Capability::AutoDetectMerchants,
            self.detect_merchants(transactions, user_merchants),
        )
    }

    fn chat_response<'a>(
        &'a self,
        request: ChatRequest,
        streamer: Option<ChatStreamer<'a>>,
    ) -> ProviderFuture<'a, Option<ChatResponse>> {
        respond(
            self.id(),
            Capability::ChatResponse,
            self.chat(request, streamer),
        )
    }
}

/// Parses one event; after the first failure later events are drained unparsed.
fn forward_event(
    parser: &mut StreamParser,
    streamer: &mut (dyn FnMut(&ChatStreamChunk) + Send),
    event: &SseEvent,
    collected: &mut Vec<ChatStreamChunk>,
    failure: &mut Option<ProviderError>,
) {
    if failure.is_some() {
        return;
    }
    match parser.parse(event) {
        Ok(Some(chunk)) => {
            streamer(&chunk);
            collected.push(chunk);
        }
        Ok(None) => {}
        Err(error) => *failure = Some(error),
    }
}

fn check_batch(transactions: &[TransactionInput], action: &str) -> Result<(), ProviderError> {
    if transactions.len() > MAX_BATCH_SIZE {
        return Err(ProviderError::batch_limit(format!(
            "Too many transactions to {action}. Max is {MAX_BATCH_SIZE} per request."
        )));
    }
    Ok(())
}

/// Local models sometimes wrap JSON in a markdown fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
