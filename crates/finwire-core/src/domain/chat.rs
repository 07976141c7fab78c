use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool the model may call, described by a JSON schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
    #[serde(default)]
    pub strict: bool,
}

/// Output of a tool call executed by the caller on a previous turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResult {
    pub call_id: String,
    pub output: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub call_id: String,
    pub function_name: String,
    /// Raw JSON argument string as produced by the model.
    pub function_args: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub function_results: Vec<FunctionResult>,
    /// Continuation token from an earlier response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            instructions: None,
            functions: Vec::new(),
            function_results: Vec::new(),
            previous_response_id: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_functions(mut self, functions: Vec<FunctionDefinition>) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_function_results(mut self, results: Vec<FunctionResult>) -> Self {
        self.function_results = results;
        self
    }

    pub fn with_previous_response_id(mut self, id: impl Into<String>) -> Self {
        self.previous_response_id = Some(id.into());
        self
    }
}

/// Normalized chat reply, identical for both LLM backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub model: String,
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

/// One parsed element of a streamed chat reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChatStreamChunk {
    OutputText(String),
    /// The completed reply; at most one per stream is expected.
    Response(ChatResponse),
}

impl ChatStreamChunk {
    pub fn as_response(&self) -> Option<&ChatResponse> {
        match self {
            Self::Response(response) => Some(response),
            Self::OutputText(_) => None,
        }
    }
}
