//! The background idle sweep (spec §4.C6): every `sweep_interval_secs`
//! (default 5 minutes), remove every session idle longer than the TTL.

use std::sync::Arc;

use crate::store::SessionStore;

/// Spawn the sweep loop. Returns the `JoinHandle` so callers can abort it
/// on shutdown; dropping the handle does not stop the task (same "weak
/// timer" posture as the scheduler's interval jobs, spec §4.C10).
pub fn spawn_idle_sweep(store: Arc<SessionStore>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = store.sweep_idle();
            if removed > 0 {
                tracing::debug!(removed, "session sweep evicted idle sessions");
            }
        }
    })
}
