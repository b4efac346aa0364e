//! `get_profile` — cache-first profile lookup (spec §4.C11, cache kind
//! `Profile`, 24h TTL).

use serde_json::Value;

use sh_actor::ActorLimits;
use sh_domain::cache::CacheKind;
use sh_domain::error::Result;

use super::args::required_str;
use crate::context::ToolContext;
use crate::dispatcher::{erase, HandlerFn};

pub struct Args {
    pub username: String,
}

fn validate(raw: &Value) -> Result<Args> {
    Ok(Args {
        username: required_str(raw, "username")?.to_lowercase(),
    })
}

async fn run(args: Args, ctx: ToolContext) -> Result<Value> {
    if let Some(cached) = ctx.cache.read(CacheKind::Profile, &args.username).await {
        let mut payload = cached.payload;
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("cacheHit".into(), Value::Bool(true));
            obj.insert("cachedAt".into(), Value::String(cached.cached_at.to_rfc3339()));
        }
        return Ok(payload);
    }

    let items = ctx
        .actor
        .run(
            "profile-scraper",
            serde_json::json!({ "username": args.username }),
            ActorLimits { timeout: std::time::Duration::from_secs(30), max_items: 1 },
        )
        .await?;

    let mut payload = items.into_iter().next().unwrap_or_else(|| {
        serde_json::json!({
            "username": args.username,
            "followers": 0,
            "following": 0,
            "postsCount": 0,
            "bio": "",
        })
    });

    ctx.cache.write(CacheKind::Profile, &args.username, payload.clone()).await;

    if let Some(obj) = payload.as_object_mut() {
        obj.insert("cacheHit".into(), Value::Bool(false));
    }
    Ok(payload)
}

pub fn handler() -> HandlerFn {
    erase(validate, run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sh_actor::MockActorClient;
    use sh_domain::clock::SystemClock;
    use sh_store::{Cache, MemoryDocumentStore};
    use std::sync::Arc;

    fn ctx_with_actor(actor: MockActorClient) -> ToolContext {
        let store = Arc::new(MemoryDocumentStore::new());
        ToolContext {
            cache: Arc::new(Cache::new(store.clone(), Arc::new(SystemClock))),
            actor: Arc::new(actor),
            store,
            clock: Arc::new(SystemClock),
        }
    }

    #[tokio::test]
    async fn miss_then_hit_round_trips_through_cache() {
        let actor = MockActorClient::new();
        actor.register("profile-scraper", vec![serde_json::json!({"username": "brand", "followers": 1000})]);
        let ctx = ctx_with_actor(actor);

        let first = run(Args { username: "brand".into() }, ctx.clone()).await.unwrap();
        assert_eq!(first["cacheHit"], false);
        assert_eq!(first["followers"], 1000);

        let second = run(Args { username: "brand".into() }, ctx).await.unwrap();
        assert_eq!(second["cacheHit"], true);
        assert_eq!(second["followers"], 1000);
    }

    #[tokio::test]
    async fn validate_rejects_missing_username() {
        assert!(validate(&serde_json::json!({})).is_err());
    }

    #[tokio::test]
    async fn validate_lowercases_username() {
        let args = validate(&serde_json::json!({"username": "BRAND"})).unwrap();
        assert_eq!(args.username, "brand");
    }
}
