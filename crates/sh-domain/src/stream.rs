use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A boxed async stream, used for LLM streaming responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// Delta parts emitted while the LLM streams a turn (component C7).
///
/// Delivered in generation order. `Thought` carries internal reasoning
/// that is kept in history for context but never surfaced to the client
/// (spec §3, §8 invariant 3).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum StreamPart {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "thought")]
    Thought { text: String },

    #[serde(rename = "function_call_started")]
    FunctionCallStarted { call_id: String, name: String },

    #[serde(rename = "function_call_delta")]
    FunctionCallDelta { call_id: String, delta: String },

    #[serde(rename = "function_call_finished")]
    FunctionCallFinished {
        call_id: String,
        name: String,
        arguments: serde_json::Value,
    },

    #[serde(rename = "done")]
    Done {
        usage: Option<Usage>,
        finish_reason: Option<String>,
    },

    #[serde(rename = "error")]
    Error { message: String },
}

/// Token usage for a completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The assembled result of a finished LLM stream: every part the adapter
/// saw, already split into visible text / thought / function calls so the
/// orchestrator does not need to re-scan the delta sequence.
#[derive(Debug, Clone, Default)]
pub struct FinalCandidate {
    pub text: String,
    pub thoughts: Vec<String>,
    pub function_calls: Vec<crate::tool::ToolCall>,
    pub usage: Usage,
}
