//! Cache kinds and the cached-document envelope (spec §3, §6).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The cache kinds the tool set writes through, with their TTLs (spec §6).
/// TTLs here are parameters, not core invariants — the core only needs
/// `ttl()` to evaluate the freshness predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    Profile,
    Post,
    Reel,
    HashtagPost,
    HashtagMeta,
    SnapshotHistory,
}

impl CacheKind {
    pub fn ttl(self) -> Duration {
        match self {
            CacheKind::Profile => Duration::hours(24),
            CacheKind::Post | CacheKind::Reel => Duration::hours(6),
            CacheKind::HashtagPost | CacheKind::HashtagMeta => Duration::hours(12),
            CacheKind::SnapshotHistory => Duration::days(180),
        }
    }

    /// The backing document-store collection name for this kind.
    pub fn collection(self) -> &'static str {
        match self {
            CacheKind::Profile => "profiles",
            CacheKind::Post => "posts",
            CacheKind::Reel => "reels",
            CacheKind::HashtagPost => "hashtag_posts",
            CacheKind::HashtagMeta => "hashtag_meta",
            CacheKind::SnapshotHistory => "snapshot_history",
        }
    }
}

/// Any persisted object with a `cached_at` timestamp.
///
/// Freshness predicate: `now - cached_at < TTL(kind)` (spec §3). The
/// document store applies a TTL index for eventual physical deletion,
/// while reads always re-check freshness so a read never serves a stale
/// document even before physical expiry runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedDocument<T> {
    pub payload: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedDocument<T> {
    pub fn new(payload: T, cached_at: DateTime<Utc>) -> Self {
        Self { payload, cached_at }
    }

    pub fn is_fresh(&self, kind: CacheKind, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.cached_at) < kind.ttl()
    }
}
