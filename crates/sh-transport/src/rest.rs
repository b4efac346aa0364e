//! The non-streaming REST response shape (spec §6 `/chat`): the same
//! information `WireEvent::Answer` + `WireEvent::Session` carries over
//! SSE, collapsed into one JSON object.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sh_domain::session::{SessionId, ToolCallInfo};

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
    #[serde(rename = "toolCalls")]
    pub tool_calls: Vec<ToolCallInfo>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_session_id_as_plain_string() {
        let response = ChatResponse {
            response: "hi".into(),
            session_id: SessionId::new(),
            tool_calls: vec![],
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value["sessionId"].as_str().is_some());
    }
}
