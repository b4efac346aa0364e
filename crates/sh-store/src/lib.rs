//! Document storage (C3) and the cache-first read-through layer built on
//! top of it (C4).
//!
//! The real backing database is out of scope here (spec'd as an external
//! collaborator) — `MemoryDocumentStore` is an in-process stand-in that
//! satisfies the same trait, so `Cache` and the tool catalog can be
//! exercised without a live database.

mod memory;

pub use memory::MemoryDocumentStore;

use async_trait::async_trait;
use serde_json::Value;
use sh_domain::cache::CacheKind;
use sh_domain::clock::Clock;
use sh_domain::error::Result;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, coll: &str, filter: Value) -> Result<Vec<Value>>;
    async fn find_one(&self, coll: &str, filter: Value) -> Result<Option<Value>>;
    async fn aggregate(&self, coll: &str, pipeline: Vec<Value>) -> Result<Vec<Value>>;
    /// Upsert each `(filter, doc)` pair; returns the number of documents
    /// written (inserted or replaced).
    async fn bulk_upsert(&self, coll: &str, docs: Vec<(Value, Value)>) -> Result<usize>;
    /// Declare a TTL index on `field` for eventual physical deletion.
    /// Freshness on read is still enforced separately by `Cache::read`.
    async fn create_ttl_index(&self, coll: &str, field: &str, ttl: Duration) -> Result<()>;
}

/// Cache-first read-through over a `DocumentStore` (spec §4.C4).
pub struct Cache {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl Cache {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// `None` on a miss — both when nothing is stored for `key` and when
    /// the stored document has aged past `kind`'s TTL. A stale document is
    /// never deleted here; that is the TTL index's job.
    pub async fn read(&self, kind: CacheKind, key: &str) -> Option<sh_domain::cache::CachedDocument<Value>> {
        let filter = serde_json::json!({ "_key": key });
        let doc = match self.store.find_one(kind.collection(), filter).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(%err, kind = ?kind, key, "cache read failed, treating as miss");
                return None;
            }
        };
        let cached: sh_domain::cache::CachedDocument<Value> = match serde_json::from_value(doc) {
            Ok(cached) => cached,
            Err(err) => {
                tracing::warn!(%err, kind = ?kind, key, "cache document malformed, treating as miss");
                return None;
            }
        };
        if cached.is_fresh(kind, self.clock.now()) {
            Some(cached)
        } else {
            None
        }
    }

    /// Best-effort upsert. Store errors are logged and swallowed — a
    /// cache write failure must never fail the caller.
    pub async fn write(&self, kind: CacheKind, key: &str, payload: Value) {
        let cached = sh_domain::cache::CachedDocument::new(payload, self.clock.now());
        let doc = match serde_json::to_value(&cached) {
            Ok(mut doc) => {
                if let Some(obj) = doc.as_object_mut() {
                    obj.insert("_key".into(), Value::String(key.to_string()));
                }
                doc
            }
            Err(err) => {
                tracing::warn!(%err, kind = ?kind, key, "failed to serialize cache document");
                return;
            }
        };
        let filter = serde_json::json!({ "_key": key });
        if let Err(err) = self.store.bulk_upsert(kind.collection(), vec![(filter, doc)]).await {
            tracing::warn!(%err, kind = ?kind, key, "cache write failed");
        }
    }
}
