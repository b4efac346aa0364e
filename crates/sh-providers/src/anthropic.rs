//! Anthropic-native adapter: the Messages API, including tool use and
//! streaming, with system messages split into a separate top-level field.

use crate::traits::{ChatRequest, LlmProvider};
use crate::util::{from_reqwest, resolve_api_key};
use sh_domain::cancel::CancelToken;
use sh_domain::error::{Error, Result};
use sh_domain::stream::{BoxStream, StreamPart, Usage};
use sh_domain::tool::{ContentPart, Message, MessageContent, Role, ToolDefinition};
use serde_json::Value;
use std::collections::HashMap;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    id: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, api_key_env: &str, default_model: impl Into<String>) -> Result<Self> {
        let api_key = resolve_api_key(api_key_env)?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(from_reqwest)?;
        Ok(Self {
            id: id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            default_model: default_model.into(),
            client,
        })
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
    }

    fn build_messages_body(&self, req: &ChatRequest) -> Value {
        let model = req.model.clone().unwrap_or_else(|| self.default_model.clone());

        let mut system_parts: Vec<String> = Vec::new();
        let mut api_messages: Vec<Value> = Vec::new();

        for msg in &req.messages {
            match msg.role {
                Role::System => system_parts.push(msg.content.extract_all_text()),
                Role::User => api_messages.push(user_msg_to_anthropic(msg)),
                Role::Assistant => api_messages.push(assistant_msg_to_anthropic(msg)),
                Role::Tool => api_messages.push(tool_result_to_anthropic(msg)),
            }
        }

        let mut body = serde_json::json!({
            "model": model,
            "messages": api_messages,
            "stream": true,
            "max_tokens": req.max_tokens.unwrap_or(4096),
        });

        if !system_parts.is_empty() {
            body["system"] = Value::String(system_parts.join("\n\n"));
        }
        if !req.tools.is_empty() {
            body["tools"] = Value::Array(req.tools.iter().map(tool_to_anthropic).collect());
        }
        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        body
    }
}

fn user_msg_to_anthropic(msg: &Message) -> Value {
    match &msg.content {
        MessageContent::Text(t) => serde_json::json!({ "role": "user", "content": t }),
        MessageContent::Parts(parts) => {
            let content: Vec<Value> = parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(serde_json::json!({"type": "text", "text": text})),
                    _ => None,
                })
                .collect();
            serde_json::json!({ "role": "user", "content": content })
        }
    }
}

fn assistant_msg_to_anthropic(msg: &Message) -> Value {
    match &msg.content {
        MessageContent::Text(t) => serde_json::json!({
            "role": "assistant",
            "content": [{"type": "text", "text": t}],
        }),
        MessageContent::Parts(parts) => {
            let content: Vec<Value> = parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(serde_json::json!({"type": "text", "text": text})),
                    ContentPart::ToolUse { id, name, input } => Some(serde_json::json!({
                        "type": "tool_use", "id": id, "name": name, "input": input,
                    })),
                    _ => None,
                })
                .collect();
            serde_json::json!({ "role": "assistant", "content": content })
        }
    }
}

fn tool_result_to_anthropic(msg: &Message) -> Value {
    let content: Vec<Value> = match &msg.content {
        MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::ToolResult { tool_use_id, content, is_error } => Some(serde_json::json!({
                    "type": "tool_result",
                    "tool_use_id": tool_use_id,
                    "content": content,
                    "is_error": is_error,
                })),
                _ => None,
            })
            .collect(),
        MessageContent::Text(t) => vec![serde_json::json!({
            "type": "tool_result", "tool_use_id": "", "content": t,
        })],
    };
    serde_json::json!({ "role": "user", "content": content })
}

fn tool_to_anthropic(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.parameters,
    })
}

fn parse_usage(v: &Value) -> Option<Usage> {
    let input = v.get("input_tokens")?.as_u64()? as u32;
    let output = v.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    Some(Usage { prompt_tokens: input, completion_tokens: output, total_tokens: input + output })
}

/// Assembly state for streaming tool-call deltas across content blocks.
#[derive(Default)]
struct StreamState {
    active_tool_calls: HashMap<u64, (String, String, String)>,
    usage: Option<Usage>,
    done_emitted: bool,
}

fn parse_anthropic_sse(data: &str, state: &mut StreamState) -> Vec<Result<StreamPart>> {
    let mut parts = Vec::new();

    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            parts.push(Err(Error::Json(e)));
            return parts;
        }
    };

    match v.get("type").and_then(|v| v.as_str()).unwrap_or("") {
        "message_start" => {
            if let Some(msg) = v.get("message") {
                state.usage = msg.get("usage").and_then(parse_usage);
            }
        }
        "content_block_start" => {
            let idx = v.get("index").and_then(|v| v.as_u64()).unwrap_or(0);
            if let Some(block) = v.get("content_block") {
                if block.get("type").and_then(|v| v.as_str()) == Some("tool_use") {
                    let call_id = block.get("id").and_then(|v| v.as_str()).unwrap_or("").to_string();
                    let name = block.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string();
                    parts.push(Ok(StreamPart::FunctionCallStarted { call_id: call_id.clone(), name: name.clone() }));
                    state.active_tool_calls.insert(idx, (call_id, name, String::new()));
                }
            }
        }
        "content_block_delta" => {
            let idx = v.get("index").and_then(|v| v.as_u64()).unwrap_or(0);
            if let Some(delta) = v.get("delta") {
                match delta.get("type").and_then(|v| v.as_str()).unwrap_or("") {
                    "text_delta" => {
                        if let Some(text) = delta.get("text").and_then(|v| v.as_str()) {
                            if !text.is_empty() {
                                parts.push(Ok(StreamPart::Text { text: text.to_string() }));
                            }
                        }
                    }
                    // Extended thinking: streamed separately from visible text so
                    // it can be kept out of `text_chunk` at the source, not
                    // filtered downstream (spec §3 thought parts).
                    "thinking_delta" => {
                        if let Some(text) = delta.get("thinking").and_then(|v| v.as_str()) {
                            if !text.is_empty() {
                                parts.push(Ok(StreamPart::Thought { text: text.to_string() }));
                            }
                        }
                    }
                    "input_json_delta" => {
                        if let Some(partial) = delta.get("partial_json").and_then(|v| v.as_str()) {
                            if let Some(tc) = state.active_tool_calls.get_mut(&idx) {
                                tc.2.push_str(partial);
                                parts.push(Ok(StreamPart::FunctionCallDelta { call_id: tc.0.clone(), delta: partial.to_string() }));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        "content_block_stop" => {
            let idx = v.get("index").and_then(|v| v.as_u64()).unwrap_or(0);
            if let Some((call_id, name, args_str)) = state.active_tool_calls.remove(&idx) {
                let arguments: Value = serde_json::from_str(&args_str).unwrap_or(Value::Object(Default::default()));
                parts.push(Ok(StreamPart::FunctionCallFinished { call_id, name, arguments }));
            }
        }
        "message_delta" => {
            if let Some(output) = v.get("usage").and_then(|u| u.get("output_tokens")).and_then(|v| v.as_u64()) {
                if let Some(ref mut u) = state.usage {
                    u.completion_tokens = output as u32;
                    u.total_tokens = u.prompt_tokens + u.completion_tokens;
                }
            }
            let stop_reason = v
                .get("delta")
                .and_then(|d| d.get("stop_reason"))
                .and_then(|v| v.as_str())
                .map(|s| match s {
                    "end_turn" => "stop".to_string(),
                    "tool_use" => "tool_calls".to_string(),
                    other => other.to_string(),
                });
            if stop_reason.is_some() {
                state.done_emitted = true;
                parts.push(Ok(StreamPart::Done { usage: state.usage.clone(), finish_reason: stop_reason }));
            }
        }
        "message_stop" => {
            if !state.done_emitted {
                state.done_emitted = true;
                parts.push(Ok(StreamPart::Done { usage: state.usage.clone(), finish_reason: Some("stop".into()) }));
            }
        }
        "error" => {
            let msg = v.get("error").and_then(|e| e.get("message")).and_then(|v| v.as_str()).unwrap_or("unknown error");
            parts.push(Ok(StreamPart::Error { message: msg.to_string() }));
        }
        _ => {} // ping / unknown event types
    }

    parts
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    async fn chat_stream(&self, req: &ChatRequest, cancel: CancelToken) -> Result<BoxStream<'static, Result<StreamPart>>> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_messages_body(req);
        let provider_id = self.id.clone();

        tracing::debug!(provider = %provider_id, "anthropic stream request");

        let resp = self.authed_post(&url).json(&body).send().await.map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::Upstream(format!("{provider_id}: HTTP {} - {err_text}", status.as_u16())));
        }

        let mut state = StreamState::default();
        Ok(crate::sse::sse_response_stream(resp, cancel, move |data| parse_anthropic_sse(data, &mut state)))
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_delta_emits_text_part() {
        let mut state = StreamState::default();
        let data = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"hi"}}"#;
        let parts = parse_anthropic_sse(data, &mut state);
        assert!(matches!(parts.as_slice(), [Ok(StreamPart::Text { text })] if text == "hi"));
    }

    #[test]
    fn tool_use_start_then_delta_then_stop_assembles_arguments() {
        let mut state = StreamState::default();
        parse_anthropic_sse(
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"c1","name":"get_profile"}}"#,
            &mut state,
        );
        parse_anthropic_sse(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"username\":\"brand\"}"}}"#,
            &mut state,
        );
        let finished = parse_anthropic_sse(r#"{"type":"content_block_stop","index":0}"#, &mut state);
        match finished.as_slice() {
            [Ok(StreamPart::FunctionCallFinished { call_id, name, arguments })] => {
                assert_eq!(call_id, "c1");
                assert_eq!(name, "get_profile");
                assert_eq!(arguments["username"], "brand");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn thinking_delta_emits_thought_part() {
        let mut state = StreamState::default();
        let data = r#"{"type":"content_block_delta","index":0,"delta":{"type":"thinking_delta","thinking":"let me check"}}"#;
        let parts = parse_anthropic_sse(data, &mut state);
        assert!(matches!(parts.as_slice(), [Ok(StreamPart::Thought { text })] if text == "let me check"));
    }

    #[test]
    fn message_stop_emits_done_once() {
        let mut state = StreamState::default();
        parse_anthropic_sse(r#"{"type":"message_stop"}"#, &mut state);
        let second = parse_anthropic_sse(r#"{"type":"message_stop"}"#, &mut state);
        assert!(second.is_empty());
    }
}
