//! The upstream-platform actor client (component C2): a narrow trait
//! wrapping whatever scraping/automation system backs social-platform
//! lookups, plus an HTTP implementation and an in-memory test double.
//!
//! The actor itself, its retry policy, and its rate-limit handling are
//! out of scope here — this crate only owns the contract the rest of
//! the workspace dispatches tools through.

use async_trait::async_trait;
use serde_json::Value;
use sh_domain::error::{Error, Result};
use std::time::Duration;

/// Bounds applied to a single actor run.
#[derive(Debug, Clone, Copy)]
pub struct ActorLimits {
    pub timeout: Duration,
    pub max_items: usize,
}

impl Default for ActorLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_items: 100,
        }
    }
}

#[async_trait]
pub trait ActorClient: Send + Sync {
    /// Run `actor_id` with `input`, returning at most `limits.max_items`
    /// result items. Times out after `limits.timeout`.
    async fn run(&self, actor_id: &str, input: Value, limits: ActorLimits) -> Result<Vec<Value>>;
}

/// Calls a remote actor-execution endpoint over HTTP, bearer-authenticated
/// from an env var so the token never lives in config files.
pub struct HttpActorClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpActorClient {
    pub fn new(base_url: impl Into<String>, token_env: &str) -> Result<Self> {
        let token = std::env::var(token_env).map_err(|_| {
            Error::Internal(format!(
                "environment variable '{token_env}' not set or not valid UTF-8"
            ))
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token,
        })
    }
}

#[async_trait]
impl ActorClient for HttpActorClient {
    async fn run(&self, actor_id: &str, input: Value, limits: ActorLimits) -> Result<Vec<Value>> {
        let url = format!("{}/actors/{actor_id}/runs", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "input": input, "maxItems": limits.max_items }))
            .timeout(limits.timeout)
            .send()
            .await
            .map_err(from_reqwest)?;

        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "actor {actor_id} returned status {}",
                response.status()
            )));
        }

        let mut items: Vec<Value> = response.json().await.map_err(from_reqwest)?;
        items.truncate(limits.max_items);
        Ok(items)
    }
}

fn from_reqwest(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(err.to_string())
    } else {
        Error::Upstream(err.to_string())
    }
}

/// In-memory actor double for tool-layer tests: returns a fixed response
/// per `actor_id`, or an error if none was registered.
#[derive(Default)]
pub struct MockActorClient {
    responses: std::sync::Mutex<std::collections::HashMap<String, std::result::Result<Vec<Value>, String>>>,
}

impl MockActorClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, actor_id: impl Into<String>, items: Vec<Value>) {
        self.responses.lock().unwrap().insert(actor_id.into(), Ok(items));
    }

    pub fn register_error(&self, actor_id: impl Into<String>, message: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(actor_id.into(), Err(message.into()));
    }
}

#[async_trait]
impl ActorClient for MockActorClient {
    async fn run(&self, actor_id: &str, _input: Value, limits: ActorLimits) -> Result<Vec<Value>> {
        match self.responses.lock().unwrap().get(actor_id) {
            Some(Ok(items)) => {
                let mut items = items.clone();
                items.truncate(limits.max_items);
                Ok(items)
            }
            Some(Err(message)) => Err(Error::Upstream(message.clone())),
            None => Err(Error::Upstream(format!("no mock response registered for actor {actor_id}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_registered_items() {
        let mock = MockActorClient::new();
        mock.register("profile-scraper", vec![serde_json::json!({"username": "brand"})]);
        let items = mock
            .run("profile-scraper", serde_json::json!({}), ActorLimits::default())
            .await
            .expect("registered actor run succeeds");
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn mock_truncates_to_max_items() {
        let mock = MockActorClient::new();
        mock.register(
            "posts-scraper",
            (0..10).map(|i| serde_json::json!({"id": i})).collect(),
        );
        let items = mock
            .run(
                "posts-scraper",
                serde_json::json!({}),
                ActorLimits { timeout: Duration::from_secs(1), max_items: 3 },
            )
            .await
            .expect("run succeeds");
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn mock_errors_on_unregistered_actor() {
        let mock = MockActorClient::new();
        let err = mock
            .run("unknown", serde_json::json!({}), ActorLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }

    #[tokio::test]
    async fn mock_propagates_registered_error() {
        let mock = MockActorClient::new();
        mock.register_error("rate-limited", "429 from actor");
        let err = mock
            .run("rate-limited", serde_json::json!({}), ActorLimits::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("429"));
    }
}
