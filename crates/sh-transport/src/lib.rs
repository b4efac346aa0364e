//! The wire contract between the orchestrator and a client (component C9):
//! the SSE event vocabulary and framing, plus the plain-JSON REST
//! response. Runtime concerns — spawning the turn, enforcing the request
//! timeout, handling a client disconnect — live in the gateway; this
//! crate only owns the shape of what crosses the wire.

mod event;
mod rest;

pub use event::{frame, parse, WireEvent, HEARTBEAT_INTERVAL_SECS, PING_LINE, REQUEST_TIMEOUT_SECS};
pub use rest::ChatResponse;
