//! Per-session concurrency control (spec §5 "one session at a time is
//! sufficient because history mutations are short").
//!
//! Ensures only one turn runs per session at a time: a second request for
//! a session with a turn already in flight is rejected immediately rather
//! than queued, since a 180s-bounded turn makes an unbounded wait pointless.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use sh_domain::session::SessionId;
use std::sync::Arc;

pub struct SessionLockMap {
    locks: Mutex<HashMap<SessionId, Arc<Semaphore>>>,
}

impl Default for SessionLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLockMap {
    pub fn new() -> Self {
        Self { locks: Mutex::new(HashMap::new()) }
    }

    /// Attempt to acquire the run lock for `session_id` without waiting.
    /// Returns [`SessionBusy`] if a turn for this session is already
    /// in flight.
    pub fn acquire(&self, session_id: SessionId) -> Result<OwnedSemaphorePermit, SessionBusy> {
        let sem = {
            let mut locks = self.locks.lock();
            locks.entry(session_id).or_insert_with(|| Arc::new(Semaphore::new(1))).clone()
        };
        sem.try_acquire_owned().map_err(|_| SessionBusy)
    }

    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop locks for sessions with no turn currently running (cleanup).
    pub fn prune_idle(&self) {
        self.locks.lock().retain(|_, sem| sem.available_permits() == 0);
    }
}

#[derive(Debug)]
pub struct SessionBusy;

impl std::fmt::Display for SessionBusy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session is busy — a turn is already in progress")
    }
}

impl std::error::Error for SessionBusy {}
