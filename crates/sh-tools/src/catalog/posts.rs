//! `get_posts` / `get_reels` — cache-first content lookups (spec
//! §4.C11, cache kinds `Post`/`Reel`, 6h TTL each).

use serde_json::Value;

use sh_actor::ActorLimits;
use sh_domain::cache::CacheKind;
use sh_domain::error::Result;

use super::args::{optional_usize, required_str};
use crate::context::ToolContext;
use crate::dispatcher::{erase, HandlerFn};

pub struct Args {
    pub username: String,
    pub limit: usize,
}

const DEFAULT_LIMIT: usize = 12;
const MAX_LIMIT: usize = 50;

fn validate(raw: &Value) -> Result<Args> {
    Ok(Args {
        username: required_str(raw, "username")?.to_lowercase(),
        limit: optional_usize(raw, "limit", DEFAULT_LIMIT, MAX_LIMIT)?,
    })
}

async fn fetch(kind: CacheKind, actor_id: &str, field: &str, args: Args, ctx: ToolContext) -> Result<Value> {
    if let Some(cached) = ctx.cache.read(kind, &args.username).await {
        return Ok(shape_response(field, cached.payload, args.limit, true));
    }

    let items = ctx
        .actor
        .run(
            actor_id,
            serde_json::json!({ "username": args.username, "limit": MAX_LIMIT }),
            ActorLimits { timeout: std::time::Duration::from_secs(45), max_items: MAX_LIMIT },
        )
        .await?;

    let full = serde_json::json!({ "username": args.username, field: items });
    ctx.cache.write(kind, &args.username, full.clone()).await;

    Ok(shape_response(field, full, args.limit, false))
}

/// Trim the cached/fetched array down to `limit` items while preserving
/// the total count, and stamp the cache-hit flag the dispatcher reads.
fn shape_response(field: &str, stored: Value, limit: usize, cache_hit: bool) -> Value {
    let username = stored.get("username").cloned().unwrap_or(Value::Null);
    let items = stored
        .get(field)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let total_fetched = items.len();
    let trimmed: Vec<Value> = items.into_iter().take(limit).collect();
    serde_json::json!({
        "username": username,
        field: trimmed,
        "totalFetched": total_fetched,
        "cacheHit": cache_hit,
    })
}

pub fn get_posts_handler() -> HandlerFn {
    erase(validate, |args, ctx| fetch(CacheKind::Post, "posts-scraper", "posts", args, ctx))
}

pub fn get_reels_handler() -> HandlerFn {
    erase(validate, |args, ctx| fetch(CacheKind::Reel, "reels-scraper", "reels", args, ctx))
}
