//! The background scheduler (component C10, spec §4.C10): two interval
//! jobs — `monitor_active_posts` and `prefetch_hashtags` — each guarded
//! against overlapping runs, driven by the same [`Dispatcher`] the HTTP
//! surface uses so there is exactly one code path for "invoke a tool".

pub mod monitor;
pub mod prefetch;

use std::sync::Arc;

use sh_domain::clock::Clock;
use sh_domain::config::SchedulerConfig;
use sh_store::DocumentStore;
use sh_tools::{Dispatcher, ToolContext};

/// Handles for both spawned jobs. Tokio tasks are detached on drop by
/// default; holding these is only useful for tests or an orderly
/// shutdown path, never required for the jobs to keep running.
pub struct SchedulerHandles {
    pub monitor: tokio::task::JoinHandle<()>,
    pub prefetch: tokio::task::JoinHandle<()>,
}

/// Spawns both scheduler jobs against a shared [`Dispatcher`]/[`ToolContext`].
pub fn spawn(
    store: Arc<dyn DocumentStore>,
    dispatcher: Arc<Dispatcher>,
    ctx: ToolContext,
    clock: Arc<dyn Clock>,
    config: &SchedulerConfig,
) -> SchedulerHandles {
    let monitor = monitor::spawn(store, dispatcher.clone(), ctx.clone(), clock, config.monitor_interval_secs);
    let prefetch = prefetch::spawn(dispatcher, ctx, config.startup_delay_secs, config.prefetch_interval_secs);
    SchedulerHandles { monitor, prefetch }
}
