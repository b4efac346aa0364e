//! `monitor_post_snapshot` — appends one engagement snapshot to a post's
//! rolling history (spec §4.C11, cache kind `SnapshotHistory`, 180d TTL).
//! Called directly by the model and by the scheduler's
//! `monitor_active_posts` job (spec §3.9).

use serde_json::Value;

use sh_domain::cache::CacheKind;
use sh_domain::clock::Clock;
use sh_domain::error::Result;

use super::args::required_str;
use crate::context::ToolContext;
use crate::dispatcher::{erase, HandlerFn};

pub struct Args {
    pub post_id: String,
}

fn validate(raw: &Value) -> Result<Args> {
    Ok(Args { post_id: required_str(raw, "post_id")? })
}

async fn fetch_metrics(ctx: &ToolContext, post_id: &str) -> Result<Value> {
    let items = ctx
        .actor
        .run(
            "post-metrics-scraper",
            serde_json::json!({ "postId": post_id }),
            sh_actor::ActorLimits { timeout: std::time::Duration::from_secs(20), max_items: 1 },
        )
        .await?;
    Ok(items.into_iter().next().unwrap_or_else(|| serde_json::json!({ "likes": 0, "comments": 0 })))
}

async fn run(args: Args, ctx: ToolContext) -> Result<Value> {
    let metrics = fetch_metrics(&ctx, &args.post_id).await?;
    let now = ctx.clock.now();

    let mut history: Vec<Value> = ctx
        .cache
        .read(CacheKind::SnapshotHistory, &args.post_id)
        .await
        .and_then(|c| c.payload.get("snapshots").and_then(Value::as_array).cloned())
        .unwrap_or_default();

    history.push(serde_json::json!({
        "takenAt": now.to_rfc3339(),
        "likes": metrics.get("likes").cloned().unwrap_or(Value::from(0)),
        "comments": metrics.get("comments").cloned().unwrap_or(Value::from(0)),
    }));

    let payload = serde_json::json!({ "postId": args.post_id, "snapshots": history });
    ctx.cache.write(CacheKind::SnapshotHistory, &args.post_id, payload.clone()).await;

    Ok(serde_json::json!({
        "postId": args.post_id,
        "snapshotCount": payload["snapshots"].as_array().unwrap().len(),
        "latest": payload["snapshots"].as_array().unwrap().last().cloned(),
    }))
}

pub fn handler() -> HandlerFn {
    erase(validate, run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sh_actor::MockActorClient;
    use sh_domain::clock::FixedClock;
    use sh_store::{Cache, MemoryDocumentStore};
    use std::sync::Arc;

    fn ctx_with_actor(actor: MockActorClient, clock: Arc<dyn Clock>) -> ToolContext {
        let store = Arc::new(MemoryDocumentStore::new());
        ToolContext {
            cache: Arc::new(Cache::new(store.clone(), clock.clone())),
            actor: Arc::new(actor),
            store,
            clock,
        }
    }

    #[tokio::test]
    async fn snapshots_accumulate_across_calls() {
        let actor = MockActorClient::new();
        actor.register("post-metrics-scraper", vec![serde_json::json!({"likes": 10, "comments": 2})]);
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(chrono::Utc::now()));
        let ctx = ctx_with_actor(actor, clock);

        let first = run(Args { post_id: "p1".into() }, ctx.clone()).await.unwrap();
        assert_eq!(first["snapshotCount"], 1);
        let second = run(Args { post_id: "p1".into() }, ctx).await.unwrap();
        assert_eq!(second["snapshotCount"], 2);
    }

    #[test]
    fn validate_requires_post_id() {
        assert!(validate(&serde_json::json!({})).is_err());
    }
}
