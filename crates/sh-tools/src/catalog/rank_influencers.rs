//! `rank_influencers` — an aggregation tool over cached hashtag posts
//! (spec §4.C11). The scoring formula is intentionally simple; ranking
//! quality is explicitly out of scope for the core per spec.md §1.

use serde_json::Value;
use std::collections::HashMap;

use sh_domain::cache::CacheKind;
use sh_domain::error::{Error, Result};

use super::args::{optional_usize, required_str};
use crate::context::ToolContext;
use crate::dispatcher::{erase, HandlerFn};

pub struct Args {
    pub tag: String,
    pub top_n: usize,
}

const DEFAULT_TOP_N: usize = 5;
const MAX_TOP_N: usize = 25;

fn validate(raw: &Value) -> Result<Args> {
    Ok(Args {
        tag: required_str(raw, "hashtag")?.trim().trim_start_matches('#').to_lowercase(),
        top_n: optional_usize(raw, "top_n", DEFAULT_TOP_N, MAX_TOP_N)?,
    })
}

fn engagement_score(post: &Value) -> f64 {
    let likes = post.get("likes").and_then(Value::as_f64).unwrap_or(0.0);
    let comments = post.get("comments").and_then(Value::as_f64).unwrap_or(0.0);
    likes + comments * 2.0
}

async fn run(args: Args, ctx: ToolContext) -> Result<Value> {
    let docs = ctx
        .store
        .aggregate(
            CacheKind::HashtagPost.collection(),
            vec![serde_json::json!({ "$match": { "_key": args.tag } })],
        )
        .await?;

    let Some(doc) = docs.into_iter().next() else {
        return Err(Error::NotFound(format!(
            "no cached posts for hashtag '{}' — call get_hashtag_posts first",
            args.tag
        )));
    };

    let posts = doc
        .get("payload")
        .and_then(|p| p.get("posts"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut by_username: HashMap<String, f64> = HashMap::new();
    for post in &posts {
        let Some(username) = post.get("username").and_then(Value::as_str) else {
            continue;
        };
        *by_username.entry(username.to_string()).or_insert(0.0) += engagement_score(post);
    }

    let mut ranked: Vec<(String, f64)> = by_username.into_iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(args.top_n);

    let influencers: Vec<Value> = ranked
        .into_iter()
        .map(|(username, score)| serde_json::json!({ "username": username, "score": score }))
        .collect();

    Ok(serde_json::json!({
        "hashtag": args.tag,
        "influencers": influencers,
    }))
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

    async fn ctx_with_hashtag_posts(tag: &str, posts: Vec<Value>) -> ToolContext {
        let store = Arc::new(MemoryDocumentStore::new());
        let cache = Cache::new(store.clone(), Arc::new(SystemClock));
        cache.write(CacheKind::HashtagPost, tag, serde_json::json!({ "hashtag": tag, "posts": posts })).await;
        ToolContext {
            cache: Arc::new(cache),
            actor: Arc::new(MockActorClient::new()),
            store,
            clock: Arc::new(SystemClock),
        }
    }

    #[tokio::test]
    async fn ranks_by_engagement_and_respects_top_n() {
        let ctx = ctx_with_hashtag_posts(
            "skincare",
            vec![
                serde_json::json!({"username": "alice", "likes": 100, "comments": 5}),
                serde_json::json!({"username": "bob", "likes": 10, "comments": 50}),
                serde_json::json!({"username": "carol", "likes": 1, "comments": 1}),
            ],
        )
        .await;
        let result = run(Args { tag: "skincare".into(), top_n: 2 }, ctx).await.unwrap();
        let influencers = result["influencers"].as_array().unwrap();
        assert_eq!(influencers.len(), 2);
        assert_eq!(influencers[0]["username"], "bob");
    }

    #[tokio::test]
    async fn missing_hashtag_returns_not_found() {
        let store: Arc<dyn sh_store::DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let ctx = ToolContext {
            cache: Arc::new(Cache::new(store.clone(), Arc::new(SystemClock))),
            actor: Arc::new(MockActorClient::new()),
            store,
            clock: Arc::new(SystemClock),
        };
        let err = run(Args { tag: "nope".into(), top_n: 5 }, ctx).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
