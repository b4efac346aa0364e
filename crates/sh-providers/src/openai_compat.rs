//! OpenAI-compatible adapter: the chat completions streaming contract,
//! shared by OpenAI itself, Azure OpenAI, Ollama, vLLM, and any other
//! endpoint that follows the same wire format.

use crate::traits::{ChatRequest, LlmProvider};
use crate::util::{from_reqwest, resolve_api_key};
use sh_domain::cancel::CancelToken;
use sh_domain::error::{Error, Result};
use sh_domain::stream::{BoxStream, StreamPart, Usage};
use sh_domain::tool::{ContentPart, Message, MessageContent, Role, ToolDefinition};
use serde_json::Value;
use std::collections::HashMap;

pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
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

    fn build_body(&self, req: &ChatRequest) -> Value {
        let model = req.model.clone().unwrap_or_else(|| self.default_model.clone());
        let messages: Vec<Value> = req.messages.iter().map(message_to_openai).collect();

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": true,
        });

        if !req.tools.is_empty() {
            body["tools"] = Value::Array(req.tools.iter().map(tool_to_openai).collect());
        }
        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max_tokens) = req.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn message_to_openai(msg: &Message) -> Value {
    match (msg.role, &msg.content) {
        (Role::Tool, MessageContent::Parts(parts)) => {
            let part = parts.iter().find_map(|p| match p {
                ContentPart::ToolResult { tool_use_id, content, .. } => Some((tool_use_id, content)),
                _ => None,
            });
            match part {
                Some((tool_use_id, content)) => serde_json::json!({
                    "role": "tool", "tool_call_id": tool_use_id, "content": content,
                }),
                None => serde_json::json!({ "role": "tool", "content": "" }),
            }
        }
        (Role::Assistant, MessageContent::Parts(parts)) => {
            let text = parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n");
            let tool_calls: Vec<Value> = parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::ToolUse { id, name, input } => Some(serde_json::json!({
                        "id": id,
                        "type": "function",
                        "function": { "name": name, "arguments": input.to_string() },
                    })),
                    _ => None,
                })
                .collect();
            let mut value = serde_json::json!({ "role": "assistant", "content": text });
            if !tool_calls.is_empty() {
                value["tool_calls"] = Value::Array(tool_calls);
            }
            value
        }
        (role, content) => serde_json::json!({ "role": role_str(role), "content": content.extract_all_text() }),
    }
}

fn tool_to_openai(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        },
    })
}

fn parse_usage(v: &Value) -> Option<Usage> {
    let prompt = v.get("prompt_tokens")?.as_u64()? as u32;
    let completion = v.get("completion_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    let total = v.get("total_tokens").and_then(|v| v.as_u64()).unwrap_or((prompt + completion) as u64) as u32;
    Some(Usage { prompt_tokens: prompt, completion_tokens: completion, total_tokens: total })
}

/// Assembly state for streaming tool-call deltas, keyed by the
/// provider's per-chunk tool-call index rather than call id (OpenAI only
/// sends the id on the first delta of each call).
#[derive(Default)]
struct StreamState {
    active_tool_calls: HashMap<u64, (String, String, String)>,
    started: std::collections::HashSet<u64>,
    usage: Option<Usage>,
    done_emitted: bool,
}

fn parse_openai_sse(data: &str, state: &mut StreamState) -> Vec<Result<StreamPart>> {
    let mut parts = Vec::new();

    if data == "[DONE]" {
        if !state.done_emitted {
            state.done_emitted = true;
            parts.push(Ok(StreamPart::Done { usage: state.usage.clone(), finish_reason: Some("stop".into()) }));
        }
        return parts;
    }

    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            parts.push(Err(Error::Json(e)));
            return parts;
        }
    };

    if let Some(usage) = v.get("usage").and_then(parse_usage) {
        state.usage = Some(usage);
    }

    let Some(choice) = v.get("choices").and_then(|c| c.get(0)) else {
        return parts;
    };

    if let Some(delta) = choice.get("delta") {
        if let Some(content) = delta.get("content").and_then(|v| v.as_str()) {
            if !content.is_empty() {
                parts.push(Ok(StreamPart::Text { text: content.to_string() }));
            }
        }

        // Reasoning-capable OpenAI-compatible endpoints (DeepSeek-R1 style,
        // served through vLLM/Ollama) stream chain-of-thought in a separate
        // `reasoning_content` field rather than as visible `content`.
        if let Some(reasoning) = delta.get("reasoning_content").and_then(|v| v.as_str()) {
            if !reasoning.is_empty() {
                parts.push(Ok(StreamPart::Thought { text: reasoning.to_string() }));
            }
        }

        if let Some(tool_calls) = delta.get("tool_calls").and_then(|v| v.as_array()) {
            for tc in tool_calls {
                let idx = tc.get("index").and_then(|v| v.as_u64()).unwrap_or(0);
                let function = tc.get("function");
                let name_delta = function.and_then(|f| f.get("name")).and_then(|v| v.as_str());
                let args_delta = function.and_then(|f| f.get("arguments")).and_then(|v| v.as_str()).unwrap_or("");
                let id = tc.get("id").and_then(|v| v.as_str());

                let entry = state.active_tool_calls.entry(idx).or_insert_with(|| (String::new(), String::new(), String::new()));
                if let Some(id) = id {
                    entry.0 = id.to_string();
                }
                if let Some(name) = name_delta {
                    entry.1 = name.to_string();
                }
                entry.2.push_str(args_delta);

                if !state.started.contains(&idx) && !entry.0.is_empty() && !entry.1.is_empty() {
                    state.started.insert(idx);
                    parts.push(Ok(StreamPart::FunctionCallStarted { call_id: entry.0.clone(), name: entry.1.clone() }));
                }
                if state.started.contains(&idx) && !args_delta.is_empty() {
                    parts.push(Ok(StreamPart::FunctionCallDelta { call_id: entry.0.clone(), delta: args_delta.to_string() }));
                }
            }
        }
    }

    if let Some(finish_reason) = choice.get("finish_reason").and_then(|v| v.as_str()) {
        for (idx, (call_id, name, args_str)) in state.active_tool_calls.drain().collect::<Vec<_>>() {
            if !state.started.contains(&idx) {
                continue;
            }
            let arguments: Value = serde_json::from_str(&args_str).unwrap_or(Value::Object(Default::default()));
            parts.push(Ok(StreamPart::FunctionCallFinished { call_id, name, arguments }));
        }
        state.started.clear();

        let mapped = match finish_reason {
            "stop" => "stop".to_string(),
            "tool_calls" => "tool_calls".to_string(),
            "length" => "length".to_string(),
            other => other.to_string(),
        };
        if !state.done_emitted {
            state.done_emitted = true;
            parts.push(Ok(StreamPart::Done { usage: state.usage.clone(), finish_reason: Some(mapped) }));
        }
    }

    parts
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn chat_stream(&self, req: &ChatRequest, cancel: CancelToken) -> Result<BoxStream<'static, Result<StreamPart>>> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(req);
        let provider_id = self.id.clone();

        tracing::debug!(provider = %provider_id, "openai-compat stream request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::Upstream(format!("{provider_id}: HTTP {} - {err_text}", status.as_u16())));
        }

        let mut state = StreamState::default();
        Ok(crate::sse::sse_response_stream(resp, cancel, move |data| parse_openai_sse(data, &mut state)))
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}
