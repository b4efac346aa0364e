use serde::{Deserialize, Serialize};

/// Limits for the tool-calling turn loop (spec §4.C8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Hard cap on LLM round-trips within a single turn before the loop
    /// is forced to stop and return whatever text has been produced.
    #[serde(default = "d_max_loops")]
    pub max_loops: u32,

    /// Consecutive identical (name, args) tool-call signatures that break
    /// the loop early rather than re-dispatching.
    #[serde(default = "d_max_repeats")]
    pub max_repeats: u32,

    /// Wall-clock budget for a whole turn, including tool dispatch.
    #[serde(default = "d_turn_timeout_ms")]
    pub turn_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_loops: d_max_loops(),
            max_repeats: d_max_repeats(),
            turn_timeout_ms: d_turn_timeout_ms(),
        }
    }
}

fn d_max_loops() -> u32 {
    10
}
fn d_max_repeats() -> u32 {
    2
}
fn d_turn_timeout_ms() -> u64 {
    60_000
}
