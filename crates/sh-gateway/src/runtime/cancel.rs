//! Per-session cancellation tokens.
//!
//! Each in-flight turn registers a [`sh_domain::cancel::CancelToken`] here
//! under its session id so a client-initiated abort (or a future admin
//! endpoint) can reach it without the caller holding on to the token
//! itself. No cascading/group semantics — this server has no sub-agent
//! concept that would need them.

use std::collections::HashMap;

use parking_lot::Mutex;

use sh_domain::cancel::CancelToken;
use sh_domain::session::SessionId;

#[derive(Default)]
pub struct CancelMap {
    tokens: Mutex<HashMap<SessionId, CancelToken>>,
}

impl CancelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a fresh token for `session_id`, replacing any
    /// previous (already-finished) one.
    pub fn register(&self, session_id: SessionId) -> CancelToken {
        let token = CancelToken::new();
        self.tokens.lock().insert(session_id, token.clone());
        token
    }

    /// Cancel the running turn for `session_id`, if any. Returns `true`
    /// if a token was found.
    pub fn cancel(&self, session_id: SessionId) -> bool {
        match self.tokens.lock().get(&session_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Drop the token once a turn completes, so cancelling a stale id is
    /// a no-op rather than reaching into a finished turn.
    pub fn remove(&self, session_id: SessionId) {
        self.tokens.lock().remove(&session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_cancel_flips_the_token() {
        let map = CancelMap::new();
        let id = SessionId::new();
        let token = map.register(id);
        assert!(!token.is_cancelled());
        assert!(map.cancel(id));
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_of_unknown_session_is_false() {
        let map = CancelMap::new();
        assert!(!map.cancel(SessionId::new()));
    }

    #[test]
    fn remove_makes_subsequent_cancel_a_no_op() {
        let map = CancelMap::new();
        let id = SessionId::new();
        map.register(id);
        map.remove(id);
        assert!(!map.cancel(id));
    }
}
