//! Normalizes both backends' replies, whole or streamed, into [`ChatResponse`].

use serde::Deserialize;
use serde_json::Value;

use crate::sse::SseEvent;
use crate::{ChatResponse, ChatStreamChunk, ProviderError, ToolCall};

// Responses API

#[derive(Debug, Deserialize)]
struct ResponsesBody {
    id: String,
    model: String,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputItem {
    Message {
        #[serde(default)]
        content: Vec<ContentPart>,
    },
    FunctionCall {
        id: String,
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    OutputText { text: String },
    #[serde(other)]
    Other,
}

pub(super) fn parse_responses(value: Value) -> Result<ChatResponse, ProviderError> {
    let body: ResponsesBody = serde_json::from_value(value)?;
    let mut content = String::new();
    let mut tool_calls = Vec::new();
    for item in body.output {
        match item {
            OutputItem::Message { content: parts } => {
                for part in parts {
                    if let ContentPart::OutputText { text } = part {
                        content.push_str(&text);
                    }
                }
            }
            OutputItem::FunctionCall {
                id,
                call_id,
                name,
                arguments,
            } => tool_calls.push(ToolCall {
                id,
                call_id,
                function_name: name,
                function_args: arguments,
            }),
            OutputItem::Other => {}
        }
    }
    Ok(ChatResponse {
        id: body.id,
        model: body.model,
        content,
        tool_calls,
    })
}

// Chat Completions

#[derive(Debug, Deserialize)]
struct CompletionBody {
    id: String,
    model: String,
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<CompletionToolCall>,
}

#[derive(Debug, Deserialize)]
struct CompletionToolCall {
    id: String,
    function: CompletionFunction,
}

#[derive(Debug, Deserialize)]
struct CompletionFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

pub(super) fn parse_chat_completion(value: Value) -> Result<ChatResponse, ProviderError> {
    let body: CompletionBody = serde_json::from_value(value)?;
    let message = body
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| ProviderError::vendor("chat completion returned no choices"))?;
    Ok(ChatResponse {
        id: body.id,
        model: body.model,
        content: message.content.unwrap_or_default(),
        tool_calls: message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall {
                id: call.id.clone(),
                call_id: call.id,
                function_name: call.function.name,
                function_args: call.function.arguments,
            })
            .collect(),
    })
}

/// Maps server-sent events to stream chunks, one event at a time.
#[derive(Debug)]
pub(super) enum StreamParser {
    Responses,
    ChatCompletions(CompletionAccumulator),
}

impl StreamParser {
    pub(super) fn responses() -> Self {
        Self::Responses
    }

    pub(super) fn chat_completions() -> Self {
        Self::ChatCompletions(CompletionAccumulator::default())
    }

    /// Yields at most one chunk per event; unrecognized events yield none.
    pub(super) fn parse(
        &mut self,
        event: &SseEvent,
    ) -> Result<Option<ChatStreamChunk>, ProviderError> {
        if event.is_done_marker() || event.data.trim().is_empty() {
            return Ok(None);
        }
        let value: Value = serde_json::from_str(&event.data)?;
        match self {
            Self::Responses => parse_responses_event(value),
            Self::ChatCompletions(accumulator) => accumulator.push(value),
        }
    }
}

fn parse_responses_event(value: Value) -> Result<Option<ChatStreamChunk>, ProviderError> {
    let event_type = value.get("type").and_then(Value::as_str).unwrap_or_default();
    match event_type {
        "response.output_text.delta" => Ok(value
            .get("delta")
            .and_then(Value::as_str)
            .map(|delta| ChatStreamChunk::OutputText(delta.to_owned()))),
        "response.completed" => {
            let response = value
                .get("response")
                .cloned()
                .ok_or_else(|| ProviderError::vendor("completed event carried no response"))?;
            parse_responses(response).map(|response| Some(ChatStreamChunk::Response(response)))
        }
        "error" | "response.failed" => {
            let message = ["/message", "/error/message", "/response/error/message"]
                .into_iter()
                .find_map(|pointer| value.pointer(pointer).and_then(Value::as_str))
                .unwrap_or("stream failed");
            Err(ProviderError::vendor(message))
        }
        _ => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChunkToolCall>,
}

#[derive(Debug, Deserialize)]
struct ChunkToolCall {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<ChunkFunction>,
}

#[derive(Debug, Deserialize)]
struct ChunkFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Chat Completions streams never send the whole reply, so it is rebuilt
/// from deltas and emitted once a choice reports a finish reason.
#[derive(Debug, Default)]
pub(super) struct CompletionAccumulator {
    id: String,
    model: String,
    content: String,
    tool_calls: Vec<ToolCall>,
    finished: bool,
}

impl CompletionAccumulator {
    fn push(&mut self, value: Value) -> Result<Option<ChatStreamChunk>, ProviderError> {
        let chunk: CompletionChunk = serde_json::from_value(value)?;
        if self.finished {
            return Ok(None);
        }
        if self.id.is_empty() {
            self.id = chunk.id;
        }
        if self.model.is_empty() {
            self.model = chunk.model;
        }
        let Some(choice) = chunk.choices.into_iter().next() else {
            return Ok(None);
        };

        for call in choice.delta.tool_calls {
            // Fragments for a new call arrive at the next free index.
            if call.index > self.tool_calls.len() {
                return Err(ProviderError::vendor("tool call index out of order"));
            }
            if call.index == self.tool_calls.len() {
                self.tool_calls.push(ToolCall {
                    id: String::new(),
                    call_id: String::new(),
                    function_name: String::new(),
                    function_args: String::new(),
                });
            }
            let slot = &mut self.tool_calls[call.index];
            if let Some(id) = call.id {
                slot.call_id.clone_from(&id);
                slot.id = id;
            }
            if let Some(function) = call.function {
                if let Some(name) = function.name {
                    slot.function_name.push_str(&name);
                }
                if let Some(arguments) = function.arguments {
                    slot.function_args.push_str(&arguments);
                }
            }
        }

        let delta = choice.delta.content.unwrap_or_default();
        self.content.push_str(&delta);

        if choice.finish_reason.is_some() {
            self.finished = true;
            return Ok(Some(ChatStreamChunk::Response(ChatResponse {
                id: self.id.clone(),
                model: self.model.clone(),
                content: self.content.clone(),
                tool_calls: self.tool_calls.clone(),
            })));
        }
        Ok((!delta.is_empty()).then_some(ChatStreamChunk::OutputText(delta)))
    }
}
