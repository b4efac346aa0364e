use serde::{Deserialize, Serialize};

/// Background job intervals (spec §4.C10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// `monitor_active_posts` interval.
    #[serde(default = "d_monitor_interval_secs")]
    pub monitor_interval_secs: u64,
    /// `prefetch_hashtags` interval.
    #[serde(default = "d_prefetch_interval_secs")]
    pub prefetch_interval_secs: u64,
    /// Delay before the first run of any job, so startup doesn't contend
    /// with the first requests.
    #[serde(default = "d_startup_delay_secs")]
    pub startup_delay_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            monitor_interval_secs: d_monitor_interval_secs(),
            prefetch_interval_secs: d_prefetch_interval_secs(),
            startup_delay_secs: d_startup_delay_secs(),
        }
    }
}

fn d_monitor_interval_secs() -> u64 {
    60 * 60
}
fn d_prefetch_interval_secs() -> u64 {
    6 * 60 * 60
}
fn d_startup_delay_secs() -> u64 {
    10
}
