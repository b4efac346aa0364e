//! The events a turn emits to its caller (spec §4.C8, §6).
//!
//! `sh-gateway` frames these as SSE through `sh-transport`; tests can
//! just collect them into a `Vec`.

use serde::Serialize;

use sh_domain::session::ToolCallInfo;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OrchestratorEvent {
    #[serde(rename = "thinking")]
    Thinking { turn: u32, message: String },

    #[serde(rename = "text_chunk")]
    TextChunk { text: String },

    #[serde(rename = "tool_start")]
    ToolStart { tools: Vec<String>, labels: Vec<String> },

    #[serde(rename = "tool_done")]
    ToolDone { info: ToolCallInfo },

    #[serde(rename = "answer")]
    Answer { text: String, tool_calls: Vec<ToolCallInfo> },
}

/// A sink for [`OrchestratorEvent`]s. `None` means the caller wants the
/// final result only (the non-streaming `/chat` route), in which case
/// `run_turn` still computes everything but emits nothing.
pub type EmitFn<'a> = &'a (dyn Fn(OrchestratorEvent) + Send + Sync);
