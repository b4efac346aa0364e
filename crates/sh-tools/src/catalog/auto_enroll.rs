//! The auto-enroll post-tool hook (spec REDESIGN FLAGS / §9): a
//! successful `monitor_post_snapshot` call enrolls its post into the
//! `active_posts` registry the scheduler's `monitor_active_posts` job
//! reads, so a post the user inspects manually starts being tracked
//! automatically. A plain hook closure, not an `async fn`, so the actual
//! write is fire-and-forget on a spawned task — this is exactly the
//! cyclic coupling the hook exists to break: the tool never imports the
//! scheduler, and the scheduler never imports the tool catalog.

use std::sync::Arc;

use serde_json::Value;

use sh_domain::clock::Clock;
use sh_store::DocumentStore;

use crate::dispatcher::PostToolHook;

pub const ACTIVE_POSTS_COLLECTION: &str = "active_posts";

/// `active_posts` is the registry the scheduler's `monitor_active_posts`
/// job (spec §4.C10) scans: `registeredAt` drives its age-based interval,
/// `lastCheckedAt` starts `null` so a freshly enrolled post is checked on
/// the job's first pass, and `deleted` lets a post be retired without a
/// separate delete path.
pub fn build(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> PostToolHook {
    Arc::new(move |name, payload| {
        if name != "monitor_post_snapshot" {
            return;
        }
        let Some(post_id) = payload.get("postId").and_then(Value::as_str).map(str::to_string) else {
            return;
        };
        let store = store.clone();
        let now = clock.now();
        tokio::spawn(async move {
            let filter = serde_json::json!({ "_key": post_id });
            let existing = store.find_one(ACTIVE_POSTS_COLLECTION, filter.clone()).await.ok().flatten();
            if existing.is_some() {
                return; // already enrolled; don't reset registeredAt/lastCheckedAt
            }
            let doc = serde_json::json!({
                "_key": post_id,
                "postId": post_id,
                "registeredAt": now.to_rfc3339(),
                "lastCheckedAt": Value::Null,
                "deleted": false,
            });
            if let Err(err) = store.bulk_upsert(ACTIVE_POSTS_COLLECTION, vec![(filter, doc)]).await {
                tracing::warn!(%err, post_id, "failed to auto-enroll post for monitoring");
            }
        });
    })
}
