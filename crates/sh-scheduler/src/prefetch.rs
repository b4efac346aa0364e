//! `prefetch_hashtags` (spec §4.C10): keeps a small fixed set of "home"
//! hashtags warm in the cache so a user's first question about one of
//! them never pays the full upstream-scrape latency.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sh_domain::clock::Clock;
use sh_store::DocumentStore;
use sh_tools::{Dispatcher, ToolContext};

const THROTTLE: Duration = Duration::from_secs(2);

/// The hashtags this brand-intelligence deployment always wants warm.
/// A fixed list per spec §4.C10 — there is no registry for these the way
/// there is for `active_posts`; add one here if that ever needs to be
/// operator-configurable.
pub const HOME_HASHTAGS: &[&str] = &["marketing", "socialmedia", "brandstrategy", "contentcreator"];

pub async fn run_once(dispatcher: &Dispatcher, ctx: &ToolContext) {
    for tag in HOME_HASHTAGS {
        let (_, info) = dispatcher
            .invoke("get_hashtag_posts", serde_json::json!({ "hashtag": tag }), ctx.clone(), None)
            .await;
        if let Some(error) = info.error {
            tracing::warn!(hashtag = %tag, error, "prefetch_hashtags: fetch failed, continuing");
        }
        tokio::time::sleep(THROTTLE).await;
    }
}

/// Spawns the `prefetch_hashtags` job: one pass `startup_delay_secs`
/// after boot, then every `interval_secs` (spec §4.C10: "every 6 hours,
/// plus once 10s after startup"). Skips a tick if the previous pass is
/// still running.
pub fn spawn(dispatcher: Arc<Dispatcher>, ctx: ToolContext, startup_delay_secs: u64, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    let running = Arc::new(AtomicBool::new(false));
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(startup_delay_secs)).await;
        loop {
            if running.swap(true, Ordering::SeqCst) {
                tracing::debug!("prefetch_hashtags: previous run still in progress, skipping tick");
            } else {
                run_once(&dispatcher, &ctx).await;
                running.store(false, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_secs(interval_secs)).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sh_actor::MockActorClient;
    use sh_domain::clock::SystemClock;
    use sh_store::{Cache, MemoryDocumentStore};
    use sh_tools::catalog;

    #[tokio::test]
    async fn run_once_invokes_get_hashtag_posts_for_every_home_tag() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let actor = MockActorClient::new();
        for tag in HOME_HASHTAGS {
            actor.register("hashtag-posts-scraper", vec![serde_json::json!({"id": tag})]);
        }
        let ctx = ToolContext {
            cache: Arc::new(Cache::new(store.clone(), clock.clone())),
            actor: Arc::new(actor),
            store: store.clone(),
            clock: clock.clone(),
        };
        let mut dispatcher = Dispatcher::new();
        catalog::register_all(&mut dispatcher, store.clone(), clock.clone());

        run_once(&dispatcher, &ctx).await;

        for tag in HOME_HASHTAGS {
            let cached = store
                .find_one("hashtag_posts", serde_json::json!({ "_key": tag }))
                .await
                .unwrap();
            assert!(cached.is_some(), "expected {tag} to be cached after prefetch");
        }
    }
}
