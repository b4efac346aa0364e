use serde::{Deserialize, Serialize};

/// Bounds for the in-memory LRU session store (spec §4.C6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Hard cap on concurrently held sessions. Oldest-by-`updated_at` is
    /// evicted once this is exceeded.
    #[serde(default = "d_max_sessions")]
    pub max_sessions: usize,

    /// A session idle longer than this is evicted by the sweep.
    #[serde(default = "d_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// How often the background sweep runs.
    #[serde(default = "d_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_sessions: d_max_sessions(),
            idle_timeout_secs: d_idle_timeout_secs(),
            sweep_interval_secs: d_sweep_interval_secs(),
        }
    }
}

fn d_max_sessions() -> usize {
    500
}
fn d_idle_timeout_secs() -> u64 {
    30 * 60
}
fn d_sweep_interval_secs() -> u64 {
    5 * 60
}
