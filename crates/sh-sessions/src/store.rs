//! The bounded, in-memory conversation-history store (component C6).
//!
//! Keyed by [`SessionId`], holding the ordered [`Turn`] sequence that the
//! orchestrator reads and appends to. Capacity is bounded by
//! `SessionsConfig::max_sessions`; pressure triggers an idle sweep first,
//! then LRU eviction by `updated_at` (spec §4.C6).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use sh_domain::clock::Clock;
use sh_domain::config::SessionsConfig;
use sh_domain::session::{Session, SessionId, Turn};

/// A bounded keyed store of conversation histories.
///
/// The hot path (`get`/`set`) is O(1); eviction scans at most
/// `max_sessions` entries for the oldest `updated_at`, which is
/// acceptable at the target scale (spec §4.C6: "hot path is O(1) is
/// sufficient, eviction need not be").
pub struct SessionStore {
    clock: Arc<dyn Clock>,
    config: SessionsConfig,
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionStore {
    pub fn new(clock: Arc<dyn Clock>, config: SessionsConfig) -> Self {
        Self {
            clock,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Always returns a new session ID. Before insertion, if the store is
    /// at capacity, runs the idle sweep then LRU eviction (spec §4.C6).
    pub fn create(&self) -> SessionId {
        let id = SessionId::new();
        let now = self.clock.now();
        self.make_room_for_one();
        self.sessions.write().insert(id, Session::new(id, now));
        id
    }

    /// Returns `None` for an unknown or idle-expired session. On success,
    /// touches `updated_at`.
    pub fn get(&self, id: SessionId) -> Option<Vec<Turn>> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&id)?;
        if session.idle_for(now) > idle_timeout(&self.config) {
            sessions.remove(&id);
            return None;
        }
        session.touch(now);
        Some(session.turns.clone())
    }

    /// Overwrites the session's turns, creating it if absent (with
    /// eviction on pressure). Stamps `updated_at`.
    pub fn set(&self, id: SessionId, turns: Vec<Turn>) {
        let now = self.clock.now();
        {
            let sessions = self.sessions.read();
            if !sessions.contains_key(&id) {
                drop(sessions);
                self.make_room_for_one();
            }
        }
        let mut sessions = self.sessions.write();
        let session = sessions
            .entry(id)
            .or_insert_with(|| Session::new(id, now));
        session.turns = turns;
        session.touch(now);
    }

    pub fn delete(&self, id: SessionId) {
        self.sessions.write().remove(&id);
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Remove every session whose idle age exceeds the configured TTL.
    /// Intended to be driven by a periodic background task (every 5
    /// minutes per spec §4.C6), but safe to call at any cadence.
    pub fn sweep_idle(&self) -> usize {
        let now = self.clock.now();
        let ttl = idle_timeout(&self.config);
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| session.idle_for(now) <= ttl);
        before - sessions.len()
    }

    /// If at or over capacity, sweep idle sessions first; if still at
    /// capacity, evict the single least-recently-updated session.
    fn make_room_for_one(&self) {
        if self.count() < self.config.max_sessions {
            return;
        }
        self.sweep_idle();
        if self.count() < self.config.max_sessions {
            return;
        }
        let mut sessions = self.sessions.write();
        if let Some(oldest) = sessions
            .iter()
            .min_by_key(|(_, s)| s.updated_at)
            .map(|(id, _)| *id)
        {
            sessions.remove(&oldest);
        }
    }
}

fn idle_timeout(config: &SessionsConfig) -> chrono::Duration {
    chrono::Duration::seconds(config.idle_timeout_secs as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sh_domain::clock::FixedClock;
    use sh_domain::session::Turn;

    fn store_with(max_sessions: usize, idle_timeout_secs: u64) -> (SessionStore, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(chrono::Utc::now()));
        let config = SessionsConfig {
            max_sessions,
            idle_timeout_secs,
            sweep_interval_secs: 300,
        };
        (SessionStore::new(clock.clone(), config), clock)
    }

    #[test]
    fn create_then_get_returns_empty_history() {
        let (store, _clock) = store_with(500, 1800);
        let id = store.create();
        assert_eq!(store.get(id), Some(Vec::new()));
    }

    #[test]
    fn get_unknown_session_is_none() {
        let (store, _clock) = store_with(500, 1800);
        assert_eq!(store.get(SessionId::new()), None);
    }

    #[test]
    fn set_then_get_round_trips_modulo_updated_at() {
        let (store, _clock) = store_with(500, 1800);
        let id = store.create();
        let turns = vec![Turn::user_text("hi")];
        store.set(id, turns.clone());
        let fetched = store.get(id).unwrap();
        assert_eq!(fetched.len(), turns.len());
    }

    #[test]
    fn get_touches_updated_at() {
        let (store, clock) = store_with(500, 1800);
        let id = store.create();
        clock.advance(chrono::Duration::minutes(10));
        store.get(id).unwrap();
        // A session touched 10 minutes in no longer idles out immediately
        // afterward, proving the touch moved `updated_at` forward.
        clock.advance(chrono::Duration::minutes(25));
        assert!(store.get(id).is_some());
    }

    #[test]
    fn get_expires_idle_session() {
        let (store, clock) = store_with(500, 60);
        let id = store.create();
        clock.advance(chrono::Duration::seconds(61));
        assert_eq!(store.get(id), None);
    }

    #[test]
    fn delete_removes_session() {
        let (store, _clock) = store_with(500, 1800);
        let id = store.create();
        store.delete(id);
        assert_eq!(store.get(id), None);
    }

    #[test]
    fn count_reflects_live_sessions() {
        let (store, _clock) = store_with(500, 1800);
        assert_eq!(store.count(), 0);
        store.create();
        store.create();
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn sweep_idle_removes_only_expired_sessions() {
        let (store, clock) = store_with(500, 60);
        let stale = store.create();
        clock.advance(chrono::Duration::seconds(30));
        let fresh = store.create();
        clock.advance(chrono::Duration::seconds(40));
        let removed = store.sweep_idle();
        assert_eq!(removed, 1);
        assert_eq!(store.count(), 1);
        assert!(store.get(fresh).is_some());
        let _ = stale;
    }

    #[test]
    fn eviction_drops_least_recently_updated_session_at_capacity() {
        let (store, clock) = store_with(2, 1_000_000);
        let first = store.create();
        clock.advance(chrono::Duration::seconds(1));
        let _second = store.create();
        clock.advance(chrono::Duration::seconds(1));
        // Touch `first` so `_second` becomes the least-recently-updated.
        store.get(first).unwrap();
        clock.advance(chrono::Duration::seconds(1));
        let third = store.create();
        assert_eq!(store.count(), 2);
        assert!(store.get(first).is_some());
        assert!(store.get(third).is_some());
    }

    #[test]
    fn count_never_exceeds_max_sessions() {
        let (store, clock) = store_with(5, 1_000_000);
        for _ in 0..20 {
            store.create();
            clock.advance(chrono::Duration::seconds(1));
            assert!(store.count() <= 5);
        }
    }
}
