//! Assembling one LLM stream into a [`FinalCandidate`] (spec §4.C8 steps
//! 3-4), grounded on the teacher's `turn.rs` stream-consumption loop but
//! built against `sh_providers::LlmProvider`'s already-typed
//! `StreamPart` instead of a string-delta protocol.

use futures_util::StreamExt;
use std::collections::HashMap;

use sh_domain::cancel::CancelToken;
use sh_domain::error::{Error, Result};
use sh_domain::stream::{BoxStream, FinalCandidate, StreamPart, Usage};
use sh_domain::tool::ToolCall;

use crate::events::{EmitFn, OrchestratorEvent};

/// Drain `stream` into a [`FinalCandidate`], emitting `text_chunk` for
/// every visible-text delta as it arrives. Stops early (returning
/// whatever was accumulated so far) once `cancel` is observed true —
/// the caller is responsible for treating a cancelled candidate as
/// terminal.
pub async fn assemble(
    mut stream: BoxStream<'static, Result<StreamPart>>,
    cancel: &CancelToken,
    emit: Option<EmitFn<'_>>,
) -> Result<FinalCandidate> {
    let mut text = String::new();
    let mut thoughts = Vec::new();
    let mut finished_calls = Vec::new();
    let mut usage = Usage::default();

    // Some providers only ever send start+delta without a finished event;
    // buffer by call_id so a stream that never finishes a call still
    // yields something usable once the stream ends.
    let mut pending: HashMap<String, (String, String)> = HashMap::new();

    while let Some(item) = stream.next().await {
        if cancel.is_cancelled() {
            break;
        }
        match item? {
            StreamPart::Text { text: delta } => {
                text.push_str(&delta);
                if let Some(emit) = emit {
                    emit(OrchestratorEvent::TextChunk { text: delta });
                }
            }
            StreamPart::Thought { text } => thoughts.push(text),
            StreamPart::FunctionCallStarted { call_id, name } => {
                pending.insert(call_id, (name, String::new()));
            }
            StreamPart::FunctionCallDelta { call_id, delta } => {
                if let Some((_, buf)) = pending.get_mut(&call_id) {
                    buf.push_str(&delta);
                }
            }
            StreamPart::FunctionCallFinished { call_id, name, arguments } => {
                pending.remove(&call_id);
                finished_calls.push(ToolCall { call_id, tool_name: name, arguments });
            }
            StreamPart::Done { usage: u, .. } => {
                if let Some(u) = u {
                    usage = u;
                }
            }
            StreamPart::Error { message } => return Err(Error::Upstream(message)),
        }
    }

    for (call_id, (name, args_str)) in pending {
        let arguments = if args_str.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(&args_str).unwrap_or_else(|err| {
                tracing::warn!(%err, call_id, tool_name = %name, "tool call arguments were not valid JSON, defaulting to empty object");
                serde_json::Value::Object(Default::default())
            })
        };
        finished_calls.push(ToolCall { call_id, tool_name: name, arguments });
    }

    Ok(FinalCandidate { text, thoughts, function_calls: finished_calls, usage })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn boxed(parts: Vec<Result<StreamPart>>) -> BoxStream<'static, Result<StreamPart>> {
        Box::pin(stream::iter(parts))
    }

    #[tokio::test]
    async fn text_accumulates_and_thoughts_are_kept_separately() {
        let parts = vec![
            Ok(StreamPart::Thought { text: "hmm".into() }),
            Ok(StreamPart::Text { text: "Hello".into() }),
            Ok(StreamPart::Text { text: ", world".into() }),
            Ok(StreamPart::Done { usage: None, finish_reason: None }),
        ];
        let candidate = assemble(boxed(parts), &CancelToken::new(), None).await.unwrap();
        assert_eq!(candidate.text, "Hello, world");
        assert_eq!(candidate.thoughts, vec!["hmm".to_string()]);
        assert!(candidate.function_calls.is_empty());
    }

    #[tokio::test]
    async fn finished_function_call_uses_its_own_arguments() {
        let parts = vec![
            Ok(StreamPart::FunctionCallStarted { call_id: "c1".into(), name: "get_profile".into() }),
            Ok(StreamPart::FunctionCallFinished {
                call_id: "c1".into(),
                name: "get_profile".into(),
                arguments: serde_json::json!({"username": "brand"}),
            }),
            Ok(StreamPart::Done { usage: None, finish_reason: None }),
        ];
        let candidate = assemble(boxed(parts), &CancelToken::new(), None).await.unwrap();
        assert_eq!(candidate.function_calls.len(), 1);
        assert_eq!(candidate.function_calls[0].arguments["username"], "brand");
    }

    #[tokio::test]
    async fn delta_only_call_is_assembled_from_buffered_json_at_stream_end() {
        let parts = vec![
            Ok(StreamPart::FunctionCallStarted { call_id: "c1".into(), name: "get_profile".into() }),
            Ok(StreamPart::FunctionCallDelta { call_id: "c1".into(), delta: "{\"username\":".into() }),
            Ok(StreamPart::FunctionCallDelta { call_id: "c1".into(), delta: "\"brand\"}".into() }),
            Ok(StreamPart::Done { usage: None, finish_reason: None }),
        ];
        let candidate = assemble(boxed(parts), &CancelToken::new(), None).await.unwrap();
        assert_eq!(candidate.function_calls.len(), 1);
        assert_eq!(candidate.function_calls[0].arguments["username"], "brand");
    }

    #[tokio::test]
    async fn upstream_error_part_short_circuits() {
        let parts = vec![Ok(StreamPart::Error { message: "boom".into() })];
        let err = assemble(boxed(parts), &CancelToken::new(), None).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }

    #[tokio::test]
    async fn cancellation_stops_consumption_early() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let parts = vec![Ok(StreamPart::Text { text: "should not appear".into() })];
        let candidate = assemble(boxed(parts), &cancel, None).await.unwrap();
        assert_eq!(candidate.text, "");
    }
}
