use serde::{Deserialize, Serialize};

/// Per-kind TTL overrides for the read-through cache (spec §6). Absent
/// entries fall back to `CacheKind::ttl()`'s built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    #[serde(default)]
    pub profile_ttl_secs: Option<u64>,
    #[serde(default)]
    pub post_ttl_secs: Option<u64>,
    #[serde(default)]
    pub reel_ttl_secs: Option<u64>,
    #[serde(default)]
    pub hashtag_post_ttl_secs: Option<u64>,
    #[serde(default)]
    pub hashtag_meta_ttl_secs: Option<u64>,
    #[serde(default)]
    pub snapshot_history_ttl_secs: Option<u64>,
}

impl CacheConfig {
    /// Resolve the effective TTL for `kind`, in seconds: an explicit
    /// override if configured, else the kind's built-in default.
    pub fn ttl_secs(&self, kind: crate::cache::CacheKind) -> u64 {
        use crate::cache::CacheKind::*;
        let override_secs = match kind {
            Profile => self.profile_ttl_secs,
            Post => self.post_ttl_secs,
            Reel => self.reel_ttl_secs,
            HashtagPost => self.hashtag_post_ttl_secs,
            HashtagMeta => self.hashtag_meta_ttl_secs,
            SnapshotHistory => self.snapshot_history_ttl_secs,
        };
        override_secs.unwrap_or_else(|| kind.ttl().num_seconds().max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKind;

    #[test]
    fn default_ttl_falls_back_to_cache_kind() {
        let config = CacheConfig::default();
        assert_eq!(
            config.ttl_secs(CacheKind::Profile),
            CacheKind::Profile.ttl().num_seconds() as u64
        );
    }

    #[test]
    fn override_takes_precedence() {
        let config = CacheConfig {
            profile_ttl_secs: Some(60),
            ..Default::default()
        };
        assert_eq!(config.ttl_secs(CacheKind::Profile), 60);
    }
}
