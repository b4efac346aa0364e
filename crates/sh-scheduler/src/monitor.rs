//! `monitor_active_posts` (spec §4.C10): scans the `active_posts`
//! registry auto-enroll populates and re-invokes `monitor_post_snapshot`
//! for any post whose age-bracketed interval has elapsed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use sh_domain::clock::Clock;
use sh_store::DocumentStore;
use sh_tools::{catalog::auto_enroll::ACTIVE_POSTS_COLLECTION, Dispatcher, ToolContext};

const THROTTLE: Duration = Duration::from_secs(2);

/// Per-post check interval, bracketed by age since registration (spec
/// §4.C10): the younger a post, the more often it's worth re-checking.
pub fn next_check_interval(age: chrono::Duration) -> chrono::Duration {
    if age < chrono::Duration::hours(24) {
        chrono::Duration::hours(2)
    } else if age < chrono::Duration::hours(72) {
        chrono::Duration::hours(4)
    } else if age < chrono::Duration::days(7) {
        chrono::Duration::hours(12)
    } else {
        chrono::Duration::hours(24)
    }
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

/// One pass over `active_posts`: for every non-deleted post whose
/// elapsed-since-last-check exceeds its age-bracketed interval, invokes
/// `monitor_post_snapshot` and, on success, writes back `lastCheckedAt`.
/// `MemoryDocumentStore::bulk_upsert` replaces the whole matched document,
/// so the update is read-modify-write rather than a partial field patch.
pub async fn run_once(store: &Arc<dyn DocumentStore>, dispatcher: &Dispatcher, ctx: &ToolContext, clock: &Arc<dyn Clock>) {
    let docs = match store.find(ACTIVE_POSTS_COLLECTION, serde_json::json!({})).await {
        Ok(docs) => docs,
        Err(err) => {
            tracing::warn!(%err, "monitor_active_posts: failed to list active posts");
            return;
        }
    };

    let now = clock.now();
    for doc in docs {
        if doc.get("deleted").and_then(Value::as_bool).unwrap_or(false) {
            continue;
        }
        let Some(post_id) = doc.get("postId").and_then(Value::as_str).map(str::to_string) else {
            continue;
        };
        let Some(registered_at) = doc.get("registeredAt").and_then(Value::as_str).and_then(parse_rfc3339) else {
            continue;
        };
        let last_checked_at = doc.get("lastCheckedAt").and_then(Value::as_str).and_then(parse_rfc3339);

        let age = now.signed_duration_since(registered_at);
        let interval = next_check_interval(age);
        let due = match last_checked_at {
            None => true,
            Some(last) => now.signed_duration_since(last) >= interval,
        };
        if !due {
            continue;
        }

        let (payload, info) = dispatcher
            .invoke("monitor_post_snapshot", serde_json::json!({ "post_id": post_id }), ctx.clone(), None)
            .await;
        if let Some(error) = info.error {
            tracing::warn!(post_id, error, "monitor_active_posts: snapshot call failed, continuing");
        } else {
            let _ = payload;
            let mut updated = doc.clone();
            if let Some(obj) = updated.as_object_mut() {
                obj.insert("lastCheckedAt".into(), Value::String(now.to_rfc3339()));
            }
            let filter = serde_json::json!({ "_key": doc.get("_key").cloned().unwrap_or(Value::String(post_id.clone())) });
            if let Err(err) = store.bulk_upsert(ACTIVE_POSTS_COLLECTION, vec![(filter, updated)]).await {
                tracing::warn!(%err, post_id, "monitor_active_posts: failed to record lastCheckedAt");
            }
        }

        tokio::time::sleep(THROTTLE).await;
    }
}

/// Spawns the `monitor_active_posts` interval job: runs every
/// `interval_secs`, skipping a tick entirely (no queuing) if the previous
/// pass hasn't finished yet.
pub fn spawn(
    store: Arc<dyn DocumentStore>,
    dispatcher: Arc<Dispatcher>,
    ctx: ToolContext,
    clock: Arc<dyn Clock>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    let running = Arc::new(AtomicBool::new(false));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            if running.swap(true, Ordering::SeqCst) {
                tracing::debug!("monitor_active_posts: previous run still in progress, skipping tick");
                continue;
            }
            run_once(&store, &dispatcher, &ctx, &clock).await;
            running.store(false, Ordering::SeqCst);
        }
    })
}
