use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use sh_domain::error::Result;
use std::collections::HashMap;
use std::time::Duration;

use crate::DocumentStore;

/// An in-process `DocumentStore`: one `Vec<Value>` per collection behind
/// a single `RwLock`, the same `RwLock<HashMap<..>>` shape the teacher
/// uses for its session and process registries.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    ttl_indexes: RwLock<HashMap<String, (String, Duration)>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A document matches `filter` if every key present in `filter` has an
/// equal value in the document. An empty filter matches everything.
fn matches(doc: &Value, filter: &Value) -> bool {
    let Some(filter_obj) = filter.as_object() else {
        return true;
    };
    let Some(doc_obj) = doc.as_object() else {
        return filter_obj.is_empty();
    };
    filter_obj
        .iter()
        .all(|(key, expected)| doc_obj.get(key) == Some(expected))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(&self, coll: &str, filter: Value) -> Result<Vec<Value>> {
        let collections = self.collections.read();
        Ok(collections
            .get(coll)
            .map(|docs| docs.iter().filter(|d| matches(d, &filter)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_one(&self, coll: &str, filter: Value) -> Result<Option<Value>> {
        let collections = self.collections.read();
        Ok(collections
            .get(coll)
            .and_then(|docs| docs.iter().find(|d| matches(d, &filter)).cloned()))
    }

    /// Supports a minimal `$match` stage; other stage kinds are skipped
    /// with a warning rather than erroring, since aggregation beyond
    /// filtering is out of scope for the in-memory store.
    async fn aggregate(&self, coll: &str, pipeline: Vec<Value>) -> Result<Vec<Value>> {
        let mut docs = self.find(coll, serde_json::json!({})).await?;
        for stage in pipeline {
            if let Some(filter) = stage.get("$match") {
                docs.retain(|d| matches(d, filter));
            } else {
                tracing::warn!(stage = %stage, "aggregation stage not supported by in-memory store, skipped");
            }
        }
        Ok(docs)
    }

    async fn bulk_upsert(&self, coll: &str, docs: Vec<(Value, Value)>) -> Result<usize> {
        let mut collections = self.collections.write();
        let entry = collections.entry(coll.to_string()).or_default();
        let mut written = 0;
        for (filter, doc) in docs {
            if let Some(existing) = entry.iter_mut().find(|d| matches(d, &filter)) {
                *existing = doc;
            } else {
                entry.push(doc);
            }
            written += 1;
        }
        Ok(written)
    }

    async fn create_ttl_index(&self, coll: &str, field: &str, ttl: Duration) -> Result<()> {
        self.ttl_indexes
            .write()
            .insert(coll.to_string(), (field.to_string(), ttl));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bulk_upsert_inserts_when_no_match() {
        let store = MemoryDocumentStore::new();
        let written = store
            .bulk_upsert("profiles", vec![(serde_json::json!({"_key": "a"}), serde_json::json!({"_key": "a", "v": 1}))])
            .await
            .unwrap();
        assert_eq!(written, 1);
        let found = store.find_one("profiles", serde_json::json!({"_key": "a"})).await.unwrap();
        assert_eq!(found.unwrap()["v"], 1);
    }

    #[tokio::test]
    async fn bulk_upsert_replaces_existing_match() {
        let store = MemoryDocumentStore::new();
        store
            .bulk_upsert("profiles", vec![(serde_json::json!({"_key": "a"}), serde_json::json!({"_key": "a", "v": 1}))])
            .await
            .unwrap();
        store
            .bulk_upsert("profiles", vec![(serde_json::json!({"_key": "a"}), serde_json::json!({"_key": "a", "v": 2}))])
            .await
            .unwrap();
        let all = store.find("profiles", serde_json::json!({})).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0]["v"], 2);
    }

    #[tokio::test]
    async fn find_empty_filter_returns_all_docs_in_collection() {
        let store = MemoryDocumentStore::new();
        store
            .bulk_upsert(
                "posts",
                vec![
                    (serde_json::json!({"_key": "1"}), serde_json::json!({"_key": "1"})),
                    (serde_json::json!({"_key": "2"}), serde_json::json!({"_key": "2"})),
                ],
            )
            .await
            .unwrap();
        let all = store.find("posts", serde_json::json!({})).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn aggregate_applies_match_stage() {
        let store = MemoryDocumentStore::new();
        store
            .bulk_upsert(
                "posts",
                vec![
                    (serde_json::json!({"_key": "1"}), serde_json::json!({"_key": "1", "liked": true})),
                    (serde_json::json!({"_key": "2"}), serde_json::json!({"_key": "2", "liked": false})),
                ],
            )
            .await
            .unwrap();
        let matched = store
            .aggregate("posts", vec![serde_json::json!({"$match": {"liked": true}})])
            .await
            .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0]["_key"], "1");
    }

    #[tokio::test]
    async fn create_ttl_index_is_idempotent_and_ok() {
        let store = MemoryDocumentStore::new();
        store.create_ttl_index("posts", "cached_at", Duration::from_secs(3600)).await.unwrap();
        store.create_ttl_index("posts", "cached_at", Duration::from_secs(3600)).await.unwrap();
    }
}
