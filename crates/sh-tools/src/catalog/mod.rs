//! The concrete tool catalog (component C11, spec §4.C11). Each module
//! owns one or two related tools; `register_all` is the only thing the
//! gateway calls to wire them into a [`Dispatcher`]. `tool_definitions`
//! is the catalog's other public surface — the JSON-Schema shapes the
//! orchestrator hands to the LLM provider so the model knows what it can
//! call.

mod args;
pub mod auto_enroll;
mod hashtags;
mod monitor_snapshot;
mod posts;
mod profile;
mod rank_influencers;
mod topic_posts;

use std::sync::Arc;

use sh_domain::clock::Clock;
use sh_domain::tool::ToolDefinition;
use sh_store::DocumentStore;

use crate::dispatcher::Dispatcher;

pub fn register_all(dispatcher: &mut Dispatcher, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) {
    dispatcher.register("get_profile", "Fetching profile", profile::handler());
    dispatcher.register("get_posts", "Fetching posts", posts::get_posts_handler());
    dispatcher.register("get_reels", "Fetching reels", posts::get_reels_handler());
    dispatcher.register("get_hashtag_posts", "Scanning hashtag posts", hashtags::get_hashtag_posts_handler());
    dispatcher.register("get_hashtag_stats", "Fetching hashtag stats", hashtags::get_hashtag_stats_handler());
    dispatcher.register("check_user_topic_posts", "Scanning creator content", topic_posts::handler());
    dispatcher.register("rank_influencers", "Ranking influencers", rank_influencers::handler());
    dispatcher.register("monitor_post_snapshot", "Recording post snapshot", monitor_snapshot::handler());

    dispatcher.register_hook(auto_enroll::build(store, clock));
}

/// The tool definitions exposed to the LLM, in the shape every provider
/// translates into its own tool-calling wire format (spec §6 "uniform"
/// tool contract — arguments are a free-form map; the schema here only
/// tells the model which keys to fill in).
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_profile".into(),
            description: "Look up a social profile's follower count, bio, and basic stats.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": { "username": { "type": "string" } },
                "required": ["username"],
            }),
        },
        ToolDefinition {
            name: "get_posts".into(),
            description: "Fetch a user's recent posts.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "username": { "type": "string" },
                    "limit": { "type": "integer", "description": "max posts to return, default 12" },
                },
                "required": ["username"],
            }),
        },
        ToolDefinition {
            name: "get_reels".into(),
            description: "Fetch a user's recent reels/short-form video posts.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "username": { "type": "string" },
                    "limit": { "type": "integer", "description": "max reels to return, default 12" },
                },
                "required": ["username"],
            }),
        },
        ToolDefinition {
            name: "get_hashtag_posts".into(),
            description: "Fetch recent posts tagged with a hashtag.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "hashtag": { "type": "string" },
                    "limit": { "type": "integer", "description": "max posts to return, default 15" },
                },
                "required": ["hashtag"],
            }),
        },
        ToolDefinition {
            name: "get_hashtag_stats".into(),
            description: "Fetch aggregate stats (post count, etc.) for a hashtag.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": { "hashtag": { "type": "string" } },
                "required": ["hashtag"],
            }),
        },
        ToolDefinition {
            name: "check_user_topic_posts".into(),
            description: "Check whether a specific creator has posted about a given topic recently.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "username": { "type": "string" },
                    "topic": { "type": "string" },
                },
                "required": ["username", "topic"],
            }),
        },
        ToolDefinition {
            name: "rank_influencers".into(),
            description: "Rank creators who posted under a hashtag by engagement. Requires get_hashtag_posts to have been called for that hashtag first.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "hashtag": { "type": "string" },
                    "top_n": { "type": "integer", "description": "how many to return, default 5" },
                },
                "required": ["hashtag"],
            }),
        },
        ToolDefinition {
            name: "monitor_post_snapshot".into(),
            description: "Record a fresh engagement snapshot for a post and enroll it for ongoing monitoring.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": { "post_id": { "type": "string" } },
                "required": ["post_id"],
            }),
        },
    ]
}
