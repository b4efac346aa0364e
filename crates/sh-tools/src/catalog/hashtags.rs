//! `get_hashtag_posts` / `get_hashtag_stats` (spec §4.C11, cache kinds
//! `HashtagPost`/`HashtagMeta`).

use serde_json::Value;

use sh_actor::ActorLimits;
use sh_domain::cache::CacheKind;
use sh_domain::error::Result;

use super::args::{optional_usize, required_str};
use crate::context::ToolContext;
use crate::dispatcher::{erase, HandlerFn};

fn normalize_tag(raw: &str) -> String {
    raw.trim().trim_start_matches('#').to_lowercase()
}

pub struct PostsArgs {
    pub tag: String,
    pub limit: usize,
}

const DEFAULT_LIMIT: usize = 15;
const MAX_LIMIT: usize = 50;

fn validate_posts(raw: &Value) -> Result<PostsArgs> {
    Ok(PostsArgs {
        tag: normalize_tag(&required_str(raw, "hashtag")?),
        limit: optional_usize(raw, "limit", DEFAULT_LIMIT, MAX_LIMIT)?,
    })
}

async fn get_hashtag_posts(args: PostsArgs, ctx: ToolContext) -> Result<Value> {
    if let Some(cached) = ctx.cache.read(CacheKind::HashtagPost, &args.tag).await {
        let mut payload = cached.payload;
        if let Some(items) = payload.get("posts").and_then(Value::as_array).cloned() {
            let trimmed: Vec<Value> = items.into_iter().take(args.limit).collect();
            if let Some(obj) = payload.as_object_mut() {
                obj.insert("posts".into(), Value::Array(trimmed));
                obj.insert("cacheHit".into(), Value::Bool(true));
            }
        }
        return Ok(payload);
    }

    let items = ctx
        .actor
        .run(
            "hashtag-posts-scraper",
            serde_json::json!({ "hashtag": args.tag, "limit": MAX_LIMIT }),
            ActorLimits { timeout: std::time::Duration::from_secs(45), max_items: MAX_LIMIT },
        )
        .await?;

    let full = serde_json::json!({ "hashtag": args.tag, "posts": items.clone() });
    ctx.cache.write(CacheKind::HashtagPost, &args.tag, full).await;

    let trimmed: Vec<Value> = items.into_iter().take(args.limit).collect();
    Ok(serde_json::json!({ "hashtag": args.tag, "posts": trimmed, "cacheHit": false }))
}

pub struct StatsArgs {
    pub tag: String,
}

fn validate_stats(raw: &Value) -> Result<StatsArgs> {
    Ok(StatsArgs { tag: normalize_tag(&required_str(raw, "hashtag")?) })
}

async fn get_hashtag_stats(args: StatsArgs, ctx: ToolContext) -> Result<Value> {
    if let Some(cached) = ctx.cache.read(CacheKind::HashtagMeta, &args.tag).await {
        let mut payload = cached.payload;
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("cacheHit".into(), Value::Bool(true));
        }
        return Ok(payload);
    }

    let items = ctx
        .actor
        .run(
            "hashtag-stats-scraper",
            serde_json::json!({ "hashtag": args.tag }),
            ActorLimits { timeout: std::time::Duration::from_secs(20), max_items: 1 },
        )
        .await?;

    let mut payload = items.into_iter().next().unwrap_or_else(|| {
        serde_json::json!({ "hashtag": args.tag, "postCount": 0 })
    });

    ctx.cache.write(CacheKind::HashtagMeta, &args.tag, payload.clone()).await;

    if let Some(obj) = payload.as_object_mut() {
        obj.insert("cacheHit".into(), Value::Bool(false));
    }
    Ok(payload)
}

pub fn get_hashtag_posts_handler() -> HandlerFn {
    erase(validate_posts, get_hashtag_posts)
}

pub fn get_hashtag_stats_handler() -> HandlerFn {
    erase(validate_stats, get_hashtag_stats)
}
