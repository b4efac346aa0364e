//! The conversation data model (spec §3): sessions, turns, and parts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A session identifier: a v4 UUID, rendered as lowercase canonical
/// 8-4-4-4-12 hex (spec §6). Server-issued only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(crate::clock::new_uuid())
    }

    /// Parse a client-supplied ID. Rejects anything that isn't a valid v4
    /// UUID — clients must not fabricate session IDs (spec §6).
    pub fn parse(raw: &str) -> Option<Self> {
        let id = uuid::Uuid::parse_str(raw).ok()?;
        if id.get_version_num() != 4 {
            return None;
        }
        Some(Self(id))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// One tagged part of a turn (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Part {
    /// User text, or the model's visible answer.
    #[serde(rename = "text")]
    Text { text: String },

    /// Model internal reasoning. Persisted for LLM context, never
    /// surfaced to the client, always stripped by history trimming.
    #[serde(rename = "thought")]
    Thought { text: String },

    /// A request to invoke a tool.
    #[serde(rename = "function_call")]
    FunctionCall {
        name: String,
        args: serde_json::Value,
    },

    /// The result returned to the model for a prior function call.
    #[serde(rename = "function_response")]
    FunctionResponse {
        name: String,
        payload: serde_json::Value,
    },
}

impl Part {
    pub fn is_thought(&self) -> bool {
        matches!(self, Part::Thought { .. })
    }
}

/// An ordered turn within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            parts: vec![Part::Text { text: text.into() }],
        }
    }
}

/// Per-invocation tool-call observability record (spec §3).
///
/// For grouped/batched calls `label` becomes `"<label> xN"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallInfo {
    pub name: String,
    pub label: String,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    #[serde(rename = "cacheHit", skip_serializing_if = "Option::is_none")]
    pub cache_hit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A session: a bounded, ordered sequence of turns.
///
/// Invariant: `created_at <= updated_at`; `updated_at` is touched on
/// every successful read (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        debug_assert!(self.created_at <= now || self.created_at <= self.updated_at);
        self.updated_at = now;
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.updated_at)
    }
}
