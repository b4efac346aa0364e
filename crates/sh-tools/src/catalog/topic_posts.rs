//! `check_user_topic_posts` — deliberately uncached (spec §4.C11): it
//! exercises the orchestrator's per-name batching when the model calls
//! it repeatedly with different `topic` arguments in one turn.

use serde_json::Value;

use sh_actor::ActorLimits;
use sh_domain::error::Result;

use super::args::required_str;
use crate::context::ToolContext;
use crate::dispatcher::{erase, HandlerFn};

pub struct Args {
    pub username: String,
    pub topic: String,
}

fn validate(raw: &Value) -> Result<Args> {
    Ok(Args {
        username: required_str(raw, "username")?.to_lowercase(),
        topic: required_str(raw, "topic")?,
    })
}

async fn run(args: Args, ctx: ToolContext) -> Result<Value> {
    let items = ctx
        .actor
        .run(
            "topic-posts-scraper",
            serde_json::json!({ "username": args.username, "topic": args.topic }),
            ActorLimits { timeout: std::time::Duration::from_secs(30), max_items: 25 },
        )
        .await?;

    Ok(serde_json::json!({
        "username": args.username,
        "topic": args.topic,
        "matchCount": items.len(),
        "posts": items,
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

    fn test_ctx(actor: MockActorClient) -> ToolContext {
        let store = Arc::new(MemoryDocumentStore::new());
        ToolContext {
            cache: Arc::new(Cache::new(store.clone(), Arc::new(SystemClock))),
            actor: Arc::new(actor),
            store,
            clock: Arc::new(SystemClock),
        }
    }

    #[tokio::test]
    async fn every_call_hits_the_actor_even_for_the_same_username() {
        let actor = MockActorClient::new();
        actor.register("topic-posts-scraper", vec![serde_json::json!({"id": 1})]);
        let ctx = test_ctx(actor);
        run(Args { username: "brand".into(), topic: "skincare".into() }, ctx.clone()).await.unwrap();
        let second = run(Args { username: "brand".into(), topic: "makeup".into() }, ctx).await.unwrap();
        assert_eq!(second["topic"], "makeup");
        assert_eq!(second["matchCount"], 1);
    }

    #[test]
    fn validate_requires_both_fields() {
        assert!(validate(&serde_json::json!({"username": "brand"})).is_err());
        assert!(validate(&serde_json::json!({"topic": "skincare"})).is_err());
    }
}
