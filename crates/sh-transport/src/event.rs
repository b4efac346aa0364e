//! The streaming wire contract (component C9, spec §4.C9/§6): a
//! serde-tagged event vocabulary plus the SSE framing around it. The
//! orchestrator's [`sh_orchestrator::OrchestratorEvent`] is the thing
//! produced; `WireEvent` is the thing actually sent to a client, with a
//! `connected`/`session` pair the orchestrator itself has no reason to
//! know about.

use serde::{Deserialize, Serialize};

use sh_domain::session::{SessionId, ToolCallInfo};
use sh_orchestrator::OrchestratorEvent;

/// Every event a streamed turn can emit, in wire order: `connected` is
/// always first, `session` and one of `answer`/`error` are always last.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireEvent {
    #[serde(rename = "connected")]
    Connected,

    #[serde(rename = "thinking")]
    Thinking { turn: u32, message: String },

    #[serde(rename = "text_chunk")]
    TextChunk { text: String },

    #[serde(rename = "tool_start")]
    ToolStart { tools: Vec<String>, labels: Vec<String> },

    #[serde(rename = "tool_done")]
    ToolDone { info: ToolCallInfo },

    #[serde(rename = "answer")]
    Answer {
        text: String,
        #[serde(rename = "toolCalls")]
        tool_calls: Vec<ToolCallInfo>,
    },

    #[serde(rename = "session")]
    Session {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
    },

    #[serde(rename = "error")]
    Error { message: String },
}

impl From<OrchestratorEvent> for WireEvent {
    fn from(event: OrchestratorEvent) -> Self {
        match event {
            OrchestratorEvent::Thinking { turn, message } => WireEvent::Thinking { turn, message },
            OrchestratorEvent::TextChunk { text } => WireEvent::TextChunk { text },
            OrchestratorEvent::ToolStart { tools, labels } => WireEvent::ToolStart { tools, labels },
            OrchestratorEvent::ToolDone { info } => WireEvent::ToolDone { info },
            OrchestratorEvent::Answer { text, tool_calls } => WireEvent::Answer { text, tool_calls },
        }
    }
}

/// Render one SSE `data:` frame. Per the SSE spec a payload must not
/// contain a bare newline inside a single `data:` line; `serde_json`
/// never emits one, so a single line suffices.
pub fn frame(event: &WireEvent) -> String {
    format!("data: {}\n\n", serde_json::to_string(event).expect("WireEvent always serializes"))
}

/// The heartbeat comment line sent every [`HEARTBEAT_INTERVAL_SECS`] to
/// keep idle connections (and the proxies in front of them) alive. SSE
/// comment lines start with `:` and carry no event data.
pub const PING_LINE: &str = ": ping\n\n";

/// Interval between heartbeat pings on an open stream (spec §4.C9).
pub const HEARTBEAT_INTERVAL_SECS: u64 = 15;

/// Hard wall-clock budget for a single streamed turn, independent of
/// `OrchestratorConfig::turn_timeout_ms` — this is the transport-level
/// backstop (spec §4.C9).
pub const REQUEST_TIMEOUT_SECS: u64 = 180;

/// Parse one rendered `data: <json>\n\n` frame back into a [`WireEvent`].
/// Only used by tests to check the round-trip law (spec §8); a real
/// client only ever needs to deserialize the JSON payload itself.
pub fn parse(rendered: &str) -> Option<WireEvent> {
    let body = rendered.strip_prefix("data: ")?.strip_suffix("\n\n")?;
    serde_json::from_str(body).ok()
}
