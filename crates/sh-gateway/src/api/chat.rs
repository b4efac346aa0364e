//! `POST /chat` (non-streaming) and `POST /chat/stream` (SSE) — spec §6.

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use futures_util::stream::Stream;
use serde::Deserialize;

use sh_domain::error::Error;
use sh_domain::session::SessionId;
use sh_transport::{ChatResponse, WireEvent, HEARTBEAT_INTERVAL_SECS, REQUEST_TIMEOUT_SECS};

use crate::runtime::{resolve_session, run_resolved_turn};
use crate::runtime::session_lock::SessionBusy;
use crate::state::AppState;

const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub message: String,
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

type ErrorResponse = (StatusCode, Json<serde_json::Value>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ErrorResponse {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

fn validate_message(message: &str) -> Result<(), ErrorResponse> {
    let len = message.chars().count();
    if len == 0 || len > MAX_MESSAGE_CHARS {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("message must be 1..{MAX_MESSAGE_CHARS} characters"),
        ));
    }
    Ok(())
}

/// Clients must not fabricate session IDs (spec §6) — an id that isn't a
/// server-issued v4 UUID is rejected rather than silently treated as new.
fn parse_session_id(raw: &Option<String>) -> Result<Option<SessionId>, ErrorResponse> {
    match raw {
        None => Ok(None),
        Some(raw) => SessionId::parse(raw).map(Some).ok_or_else(|| {
            error_response(StatusCode::BAD_REQUEST, "sessionId must be a server-issued session id")
        }),
    }
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Upstream(_) => StatusCode::BAD_GATEWAY,
        Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        Error::Cancelled => StatusCode::BAD_REQUEST,
        Error::Internal(_) | Error::Io(_) | Error::Json(_) | Error::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_payload(err: &Error) -> ErrorResponse {
    (
        status_for(err),
        Json(serde_json::json!({ "error": err.to_string(), "code": err.code() })),
    )
}

pub async fn chat(State(state): State<AppState>, Json(body): Json<ChatBody>) -> impl IntoResponse {
    if let Err(resp) = validate_message(&body.message) {
        return resp.into_response();
    }
    let session_id = match parse_session_id(&body.session_id) {
        Ok(id) => id,
        Err(resp) => return resp.into_response(),
    };

    // Only a client-supplied id can contend with another in-flight turn;
    // a freshly minted one can't, so no lock is needed in that case.
    let _permit = match session_id {
        Some(id) => match state.session_locks.acquire(id) {
            Ok(permit) => Some(permit),
            Err(SessionBusy) => {
                return error_response(StatusCode::TOO_MANY_REQUESTS, SessionBusy.to_string()).into_response();
            }
        },
        None => None,
    };

    let (session_id, prior_turns) = resolve_session(&state, session_id);
    let turn = run_resolved_turn(&state, session_id, prior_turns, body.message, None);
    match tokio::time::timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), turn).await {
        Ok(Ok(output)) => Json(ChatResponse {
            response: output.answer,
            session_id,
            tool_calls: output.tool_calls,
            timestamp: state.clock.now(),
        })
        .into_response(),
        Ok(Err(err)) => error_payload(&err).into_response(),
        Err(_) => {
            // Trip the session's cancellation token (spec §4.C9: "on
            // timeout the cancellation token is tripped") so the
            // in-flight LLM stream and any running tool calls abort, then
            // drop the stale registration rather than leaking it.
            state.cancel_map.cancel(session_id);
            state.cancel_map.remove(session_id);
            error_response(StatusCode::GATEWAY_TIMEOUT, "turn exceeded the request timeout").into_response()
        }
    }
}

pub async fn chat_stream(State(state): State<AppState>, Json(body): Json<ChatBody>) -> impl IntoResponse {
    if let Err(resp) = validate_message(&body.message) {
        return resp.into_response();
    }
    let session_id = match parse_session_id(&body.session_id) {
        Ok(id) => id,
        Err(resp) => return resp.into_response(),
    };

    let permit = match session_id {
        Some(id) => match state.session_locks.acquire(id) {
            Ok(permit) => Some(permit),
            Err(SessionBusy) => {
                return error_response(StatusCode::TOO_MANY_REQUESTS, SessionBusy.to_string()).into_response();
            }
        },
        None => None,
    };

    let (session_id, prior_turns) = resolve_session(&state, session_id);

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<WireEvent>();
    tx.send(WireEvent::Connected).ok();

    let message = body.message;
    let state_for_task = state.clone();
    tokio::spawn(async move {
        let emit_tx = tx.clone();
        let emit = move |event: sh_orchestrator::OrchestratorEvent| {
            emit_tx.send(WireEvent::from(event)).ok();
        };
        let turn = run_resolved_turn(&state_for_task, session_id, prior_turns, message, Some(&emit));
        // Client disconnects don't cancel this task (spec §5 "best effort"
        // — the turn runs to completion and updates session history
        // regardless of whether anyone is still listening); the request
        // timeout is the only thing that cuts it short.
        let result = tokio::time::timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), turn).await;
        match result {
            Ok(Ok(_output)) => {
                tx.send(WireEvent::Session { session_id }).ok();
            }
            Ok(Err(err)) => {
                tx.send(WireEvent::Error { message: err.to_string() }).ok();
            }
            Err(_) => {
                // Trip the session's cancellation token (spec §4.C9: "on
                // timeout the cancellation token is tripped") so the
                // in-flight LLM stream and any running tool calls abort, then
                // drop the stale registration rather than leaking it.
                state_for_task.cancel_map.cancel(session_id);
                state_for_task.cancel_map.remove(session_id);
                tx.send(WireEvent::Error { message: "turn exceeded the request timeout".into() }).ok();
            }
        }
        drop(permit);
    });

    let stream = wire_event_stream(rx);
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS))
                .text("ping"),
        )
        .into_response()
}

fn wire_event_stream(
    mut rx: tokio::sync::mpsc::UnboundedReceiver<WireEvent>,
) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let data = serde_json::to_string(&event).expect("WireEvent always serializes");
            yield Ok(Event::default().data(data));
        }
    }
}
