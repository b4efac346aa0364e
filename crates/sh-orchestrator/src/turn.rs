//! The bounded multi-turn tool-calling loop (spec §4.C8's ten numbered
//! steps), grounded on the teacher's `turn.rs::run_turn_inner` structure
//! (stream loop with cancellation checks, concurrent tool dispatch via
//! `join_all`, transcript append) with the loop-break, batching, and
//! all-failed short-circuit behavior the spec's REDESIGN FLAGS call for.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::future::join_all;

use sh_domain::cancel::CancelToken;
use sh_domain::config::OrchestratorConfig;
use sh_domain::error::Result;
use sh_domain::session::{Part, ToolCallInfo, Turn, TurnRole};
use sh_domain::tool::{ContentPart, Message, MessageContent, Role, ToolDefinition};
use sh_providers::{ChatRequest, LlmProvider};
use sh_tools::{Dispatcher, ToolContext};

use crate::assemble::assemble;
use crate::events::{EmitFn, OrchestratorEvent};
use crate::mapping::history_to_messages;
use crate::trim::trim_turns;

pub struct TurnDeps {
    pub provider: Arc<dyn LlmProvider>,
    pub dispatcher: Arc<Dispatcher>,
    pub tool_context: ToolContext,
    pub tool_defs: Vec<ToolDefinition>,
    pub config: OrchestratorConfig,
    pub system_prompt: String,
}

pub struct TurnOutput {
    pub answer: String,
    pub tool_calls: Vec<ToolCallInfo>,
    /// The new turns this run added, already trimmed (spec §4.C8 post-turn
    /// trimming) — the caller appends these to the session's stored
    /// history and does not need to trim again.
    pub new_turns: Vec<Turn>,
}

const FALLBACK_ANSWER: &str = "Done.";

pub async fn run_turn(
    prior_turns: &[Turn],
    user_message: String,
    deps: &TurnDeps,
    emit: Option<EmitFn<'_>>,
    cancel: CancelToken,
) -> Result<TurnOutput> {
    let mut messages = history_to_messages(&deps.system_prompt, prior_turns);
    messages.push(Message::user(user_message.clone()));

    let mut new_turns = vec![Turn::user_text(user_message)];
    let mut all_tool_calls: Vec<ToolCallInfo> = Vec::new();
    let mut prev_signature: Option<Vec<String>> = None;
    let mut repeat_count: u32 = 0;
    let mut had_tool_calls = false;
    let mut last_text = String::new();

    for turn_no in 1..=deps.config.max_loops {
        if cancel.is_cancelled() {
            // Spec §5/§8 invariant 1: a cancelled request emits `error`,
            // never a terminal `answer`. No `finish()` here.
            return Err(sh_domain::error::Error::Cancelled);
        }

        let message = if turn_no == 1 {
            "Analysing your request…".to_string()
        } else if had_tool_calls {
            "Processing tool results…".to_string()
        } else {
            "Thinking…".to_string()
        };
        if let Some(emit) = emit {
            emit(OrchestratorEvent::Thinking { turn: turn_no, message });
        }

        let req = ChatRequest {
            messages: messages.clone(),
            tools: deps.tool_defs.clone(),
            temperature: Some(0.2),
            max_tokens: None,
            model: None,
        };
        let stream = deps.provider.chat_stream(&req, cancel.clone()).await?;
        let candidate = assemble(stream, &cancel, emit).await?;
        if cancel.is_cancelled() {
            return Err(sh_domain::error::Error::Cancelled);
        }
        last_text = candidate.text.clone();

        let mut model_parts: Vec<Part> = candidate
            .thoughts
            .iter()
            .map(|t| Part::Thought { text: t.clone() })
            .collect();
        if !candidate.text.is_empty() {
            model_parts.push(Part::Text { text: candidate.text.clone() });
        }
        for call in &candidate.function_calls {
            model_parts.push(Part::FunctionCall { name: call.tool_name.clone(), args: call.arguments.clone() });
        }
        new_turns.push(Turn { role: TurnRole::Model, parts: model_parts });

        let mut assistant_wire_parts = Vec::new();
        if !candidate.text.is_empty() {
            assistant_wire_parts.push(ContentPart::Text { text: candidate.text.clone() });
        }
        for call in &candidate.function_calls {
            assistant_wire_parts.push(ContentPart::ToolUse {
                id: call.call_id.clone(),
                name: call.tool_name.clone(),
                input: call.arguments.clone(),
            });
        }
        if assistant_wire_parts.is_empty() {
            assistant_wire_parts.push(ContentPart::Text { text: String::new() });
        }
        messages.push(Message { role: Role::Assistant, content: MessageContent::Parts(assistant_wire_parts) });

        if candidate.function_calls.is_empty() {
            let answer = if !candidate.text.is_empty() { candidate.text } else { FALLBACK_ANSWER.to_string() };
            return Ok(finish(answer, all_tool_calls, new_turns, emit));
        }

        // Step 6: count occurrences, unique names in first-appearance order.
        let mut name_counts: HashMap<String, usize> = HashMap::new();
        for call in &candidate.function_calls {
            *name_counts.entry(call.tool_name.clone()).or_insert(0) += 1;
        }
        let mut unique_names = Vec::new();
        let mut seen = HashSet::new();
        for call in &candidate.function_calls {
            if seen.insert(call.tool_name.clone()) {
                unique_names.push(call.tool_name.clone());
            }
        }
        let labels: Vec<String> = unique_names
            .iter()
            .map(|name| {
                let count = name_counts[name];
                let label = deps.dispatcher.label(name);
                if count > 1 { format!("{label} ×{count}") } else { label }
            })
            .collect();
        if let Some(emit) = emit {
            emit(OrchestratorEvent::ToolStart { tools: unique_names.clone(), labels });
        }

        // Step 7: loop-break / repeat-signature check.
        let mut signature: Vec<String> = candidate.function_calls.iter().map(|c| c.tool_name.clone()).collect();
        signature.sort();
        if prev_signature.as_ref() == Some(&signature) {
            repeat_count += 1;
        } else {
            repeat_count = 0;
            prev_signature = Some(signature);
        }
        if repeat_count >= deps.config.max_repeats {
            let answer = "I'm repeating the same tool calls without making progress, so I'll stop here.".to_string();
            return Ok(finish(answer, all_tool_calls, new_turns, emit));
        }

        // Step 8: dispatch concurrently, suppressing per-call emission for
        // names called more than once this turn.
        let adapter = emit.map(|e| {
            move |info: ToolCallInfo| e(OrchestratorEvent::ToolDone { info })
        });
        let adapter_ref: Option<&(dyn Fn(ToolCallInfo) + Send + Sync)> =
            adapter.as_ref().map(|a| a as &(dyn Fn(ToolCallInfo) + Send + Sync));

        let futures = candidate.function_calls.iter().map(|call| {
            let suppress = name_counts[&call.tool_name] > 1;
            let per_call_emit = if suppress { None } else { adapter_ref };
            deps.dispatcher.invoke(&call.tool_name, call.arguments.clone(), deps.tool_context.clone(), per_call_emit)
        });
        let results = join_all(futures).await;

        // Step 9: synthetic tool_done for batched names.
        let mut batch_agg: HashMap<String, (u32, u32, u64, u32)> = HashMap::new();
        for (_, info) in &results {
            if name_counts[&info.name] > 1 {
                let entry = batch_agg.entry(info.name.clone()).or_insert((0, 0, 0, 0));
                if info.error.is_some() { entry.1 += 1 } else { entry.0 += 1 }
                entry.2 += info.duration_ms;
                if info.cache_hit == Some(true) { entry.3 += 1 }
            }
        }
        for name in &unique_names {
            let count = name_counts[name];
            if count <= 1 {
                continue;
            }
            let (_succeeded, errors, total_ms, cache_hits) = batch_agg[name];
            let n = count as u64;
            let info = ToolCallInfo {
                name: name.clone(),
                label: format!("{} ×{}", deps.dispatcher.label(name), count),
                duration_ms: total_ms / n.max(1),
                cache_hit: Some(cache_hits as usize == count),
                error: if errors > 0 { Some(format!("{errors}/{n} failed")) } else { None },
            };
            if let Some(emit) = emit {
                emit(OrchestratorEvent::ToolDone { info });
            }
        }

        // Step 10: function_response parts aligned 1:1 with call order.
        let mut response_parts = Vec::new();
        let mut wire_results = Vec::new();
        for (call, (payload, info)) in candidate.function_calls.iter().zip(results.iter()) {
            response_parts.push(Part::FunctionResponse { name: info.name.clone(), payload: payload.clone() });
            wire_results.push(ContentPart::ToolResult {
                tool_use_id: call.call_id.clone(),
                content: payload.to_string(),
                is_error: info.error.is_some(),
            });
            all_tool_calls.push(info.clone());
        }
        new_turns.push(Turn { role: TurnRole::User, parts: response_parts });
        messages.push(Message { role: Role::Tool, content: MessageContent::Parts(wire_results) });

        had_tool_calls = true;

        // Step 11: all-failed short-circuit.
        if results.iter().all(|(_, info)| info.error.is_some()) {
            let mut lines: Vec<String> = results
                .iter()
                .take(3)
                .map(|(_, info)| format!("{}: {}", info.name, info.error.as_deref().unwrap_or("unknown error")))
                .collect();
            if results.len() > 3 {
                lines.push(format!("…and {} more", results.len() - 3));
            }
            let answer = format!("Every tool call failed:\n{}", lines.join("\n"));
            return Ok(finish(answer, all_tool_calls, new_turns, emit));
        }
    }

    let answer = if last_text.is_empty() { FALLBACK_ANSWER.to_string() } else { last_text };
    Ok(finish(answer, all_tool_calls, new_turns, emit))
}

fn finish(answer: String, tool_calls: Vec<ToolCallInfo>, new_turns: Vec<Turn>, emit: Option<EmitFn<'_>>) -> TurnOutput {
    if let Some(emit) = emit {
        emit(OrchestratorEvent::Answer { text: answer.clone(), tool_calls: tool_calls.clone() });
    }
    TurnOutput { answer, tool_calls, new_turns: trim_turns(new_turns) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use sh_actor::MockActorClient;
    use sh_domain::clock::SystemClock;
    use sh_domain::config::OrchestratorConfig;
    use sh_domain::error::Error;
    use sh_domain::stream::{BoxStream, StreamPart};
    use sh_store::{Cache, DocumentStore, MemoryDocumentStore};

    /// A provider that must never be called — used to prove a
    /// pre-cancelled turn returns before touching the LLM at all.
    struct PanicProvider;

    #[async_trait::async_trait]
    impl LlmProvider for PanicProvider {
        async fn chat_stream(&self, _req: &ChatRequest, _cancel: CancelToken) -> Result<BoxStream<'static, Result<StreamPart>>> {
            panic!("chat_stream must not be called once the turn is already cancelled");
        }

        fn provider_id(&self) -> &str {
            "panic"
        }
    }

    /// A provider whose stream trips the cancellation token partway
    /// through, simulating cancellation observed mid-stream.
    struct CancelMidStreamProvider;

    #[async_trait::async_trait]
    impl LlmProvider for CancelMidStreamProvider {
        async fn chat_stream(&self, _req: &ChatRequest, cancel: CancelToken) -> Result<BoxStream<'static, Result<StreamPart>>> {
            let stream = async_stream::stream! {
                yield Ok(StreamPart::Text { text: "partial".into() });
                cancel.cancel();
                yield Ok(StreamPart::Text { text: "should not be seen".into() });
                yield Ok(StreamPart::Done { usage: None, finish_reason: None });
            };
            Ok(Box::pin(stream))
        }

        fn provider_id(&self) -> &str {
            "cancel-mid-stream"
        }
    }

    fn test_deps(provider: Arc<dyn LlmProvider>) -> TurnDeps {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let clock = Arc::new(SystemClock);
        TurnDeps {
            provider,
            dispatcher: Arc::new(Dispatcher::new()),
            tool_context: ToolContext {
                cache: Arc::new(Cache::new(store.clone(), clock.clone())),
                actor: Arc::new(MockActorClient::new()),
                store,
                clock,
            },
            tool_defs: Vec::new(),
            config: OrchestratorConfig::default(),
            system_prompt: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn already_cancelled_turn_errors_without_calling_the_provider() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let deps = test_deps(Arc::new(PanicProvider));
        let err = run_turn(&[], "hi".to_string(), &deps, None, cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_observed_mid_stream_errors_instead_of_answering() {
        let cancel = CancelToken::new();
        let deps = test_deps(Arc::new(CancelMidStreamProvider));
        let err = run_turn(&[], "hi".to_string(), &deps, None, cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
