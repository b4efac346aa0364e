//! Runtime glue: per-session concurrency/cancellation, and the bridge
//! between a session's stored history and [`sh_orchestrator::run_turn`].

pub mod cancel;
pub mod session_lock;

use std::sync::Arc;

use sh_domain::error::{Error, Result};
use sh_domain::session::SessionId;
use sh_orchestrator::{EmitFn, TurnDeps, TurnOutput};

use crate::state::AppState;

const SYSTEM_PROMPT: &str = "You are a brand-intelligence assistant. You can look up social \
profiles, posts, reels, and hashtag activity, rank influencers by engagement, and monitor a \
post's metrics over time. Use the available tools rather than guessing at data you don't have.";

/// Resolves the concrete [`SessionId`] a turn will run under — creating a
/// fresh session if none was supplied, or if the supplied id is unknown or
/// idle-expired — and returns it along with its prior turns.
///
/// Split out from the turn-running step so a caller (the `/chat` and
/// `/chat/stream` handlers) can learn the session id *before* the
/// potentially-long LLM/tool work starts, and so trip the id's
/// cancellation token in `state.cancel_map` on a request timeout (spec
/// §4.C9: "on timeout the cancellation token is tripped").
pub fn resolve_session(state: &AppState, session_id: Option<SessionId>) -> (SessionId, Vec<sh_domain::session::Turn>) {
    let session_id = session_id.unwrap_or_else(|| state.sessions.create());
    match state.sessions.get(session_id) {
        Some(turns) => (session_id, turns),
        None => {
            // Unknown or idle-expired: ids are server-issued, so a caller
            // can't keep the one it asked for — mint a fresh one instead.
            let fresh = state.sessions.create();
            (fresh, Vec::new())
        }
    }
}

/// Runs one orchestrated turn for an already-resolved session id and its
/// prior turns, persisting the updated history on success. Registers and
/// tears down the session's cancellation token for the duration of the run.
pub async fn run_resolved_turn(
    state: &AppState,
    session_id: SessionId,
    prior_turns: Vec<sh_domain::session::Turn>,
    message: String,
    emit: Option<EmitFn<'_>>,
) -> Result<TurnOutput> {
    let registry = state.providers.get().await?;
    let (provider, _model) = registry.for_role("chat")?;

    let cancel = state.cancel_map.register(session_id);

    let deps = TurnDeps {
        provider,
        dispatcher: state.dispatcher.clone(),
        tool_context: sh_tools::ToolContext {
            cache: state.cache.clone(),
            actor: actor_client(state),
            store: state.store.clone(),
            clock: state.clock.clone(),
        },
        tool_defs: (*state.tool_defs).clone(),
        config: state.config.orchestrator.clone(),
        system_prompt: SYSTEM_PROMPT.to_string(),
    };

    let result = sh_orchestrator::run_turn(&prior_turns, message, &deps, emit, cancel).await;
    state.cancel_map.remove(session_id);

    let output = result?;
    let mut turns = prior_turns;
    turns.extend(output.new_turns.clone());
    state.sessions.set(session_id, turns);

    Ok(output)
}

/// Separated out so the actor client's construction (and whatever it
/// takes to authenticate) isn't repeated at every call site; `AppState`
/// only ever needs one, long-lived.
fn actor_client(state: &AppState) -> Arc<dyn sh_actor::ActorClient> {
    state.actor.clone()
}

pub fn session_not_found() -> Error {
    Error::NotFound("session not found".into())
}
