//! Backend-specific request bodies.
//!
//! The hosted backend speaks the Responses API (`input` items, `instructions`,
//! `tools`, `previous_response_id`). The self-hosted backend speaks Chat
//! Completions (a flat `messages` list).

use serde_json::{json, Value};

use crate::{ChatRequest, FunctionDefinition};

pub(super) fn responses_chat_body(model: &str, request: &ChatRequest, stream: bool) -> Value {
    let mut input = vec![json!({ "role": "user", "content": request.prompt })];
    input.extend(request.function_results.iter().map(|result| {
        json!({
            "type": "function_call_output",
            "call_id": result.call_id,
            "output": result.output.to_string(),
        })
    }));

    let mut body = json!({
        "model": model,
        "input": input,
        "tools": responses_tools(&request.functions),
        "stream": stream,
    });
    if let Some(instructions) = &request.instructions {
        body["instructions"] = json!(instructions);
    }
    if let Some(previous) = &request.previous_response_id {
        body["previous_response_id"] = json!(previous);
    }
    body
}

/// Prior tool results are not part of the message list on this backend.
pub(super) fn chat_completions_body(model: &str, request: &ChatRequest, stream: bool) -> Value {
    let mut messages = Vec::with_capacity(2);
    if let Some(instructions) = request
        .instructions
        .as_deref()
        .filter(|text| !text.trim().is_empty())
    {
        messages.push(json!({ "role": "system", "content": instructions }));
    }
    messages.push(json!({ "role": "user", "content": request.prompt }));

    let mut body = json!({
        "model": model,
        "messages": messages,
        "stream": stream,
    });
    if !request.functions.is_empty() {
        body["tools"] = json!(chat_completions_tools(&request.functions));
    }
    body
}

pub(super) fn responses_structured_body(
    model: &str,
    instructions: &str,
    prompt: &str,
    schema_name: &str,
    schema: Value,
) -> Value {
    json!({
        "model": model,
        "input": [{ "role": "user", "content": prompt }],
        "instructions": instructions,
        "text": {
            "format": {
                "type": "json_schema",
                "name": schema_name,
                "strict": true,
                "schema": schema,
            }
        },
    })
}

pub(super) fn chat_completions_structured_body(
    model: &str,
    instructions: &str,
    prompt: &str,
    schema_name: &str,
    schema: Value,
) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": instructions },
            { "role": "user", "content": prompt },
        ],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": schema_name,
                "strict": true,
                "schema": schema,
            }
        },
    })
}

fn responses_tools(functions: &[FunctionDefinition]) -> Vec<Value> {
    functions
        .iter()
        .map(|function| {
            json!({
                "type": "function",
                "name": function.name,
                "description": function.description,
                "parameters": function.parameters,
                "strict": function.strict,
            })
        })
        .collect()
}

fn chat_completions_tools(functions: &[FunctionDefinition]) -> Vec<Value> {
    functions
        .iter()
        .map(|function| {
            json!({
                "type": "function",
                "function": {
                    "name": function.name,
                    "description": function.description,
                    "parameters": function.parameters,
                    "strict": function.strict,
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FunctionResult;

    fn request() -> ChatRequest {
        ChatRequest::new("What did I spend on groceries?", "gpt-4.1")
            .with_instructions("You are a finance assistant.")
            .with_functions(vec![FunctionDefinition {
                name: String::from("get_transactions"),
                description: String::from("List transactions"),
                parameters: json!({"type": "object", "properties": {}}),
                strict: true,
            }])
            .with_function_results(vec![FunctionResult {
                call_id: String::from("call_1"),
                output: json!({"total": 120.5}),
            }])
            .with_previous_response_id("resp_prev")
    }

    #[test]
    fn responses_body_carries_tool_outputs_and_continuation() {
        let body = responses_chat_body("gpt-4.1", &request(), false);

        assert_eq!(body["input"][0]["role"], "user");
        assert_eq!(body["input"][1]["type"], "function_call_output");
        assert_eq!(body["input"][1]["call_id"], "call_1");
        assert_eq!(body["input"][1]["output"], "{\"total\":120.5}");
        assert_eq!(body["tools"][0]["name"], "get_transactions");
        assert_eq!(body["instructions"], "You are a finance assistant.");
        assert_eq!(body["previous_response_id"], "resp_prev");
    }

    #[test]
    fn chat_completions_body_is_flat_message_list() {
        let body = chat_completions_body("local-model", &request(), true);

        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(body["tools"][0]["function"]["name"], "get_transactions");
        assert!(body.get("previous_response_id").is_none());
        assert!(!body.to_string().contains("call_1"));
    }

    #[test]
    fn system_message_is_optional() {
        let body = chat_completions_body("m", &ChatRequest::new("hi", "m"), false);
        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 1);
        assert!(body.get("tools").is_none());
    }
}
