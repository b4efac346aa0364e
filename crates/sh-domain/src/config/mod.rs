//! Process configuration: env + optional `config.toml`, merged with
//! built-in defaults field-by-field (spec §1, §6).
//!
//! Each section lives in its own submodule mirroring the component it
//! configures. Every field has a `#[serde(default = "d_xxx")]` and a
//! matching free function so a partial (or absent) `config.toml` still
//! deserializes to a complete, usable `Config`.

mod cache;
mod llm;
mod orchestrator;
mod scheduler;
mod server;
mod sessions;

pub use cache::CacheConfig;
pub use llm::{LlmConfig, ProviderConfig, ProviderKind, RoleConfig};
pub use orchestrator::OrchestratorConfig;
pub use scheduler::SchedulerConfig;
pub use server::{CorsConfig, ServerConfig};
pub use sessions::SessionsConfig;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration from a TOML file, failing on parse errors but
    /// not on missing keys (those fall back to field defaults).
    pub fn load(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` if it exists and parses; otherwise fall back to
    /// built-in defaults. Never fails startup over a missing config file.
    pub fn load_or_default(path: &str) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(%err, path, "failed to load config, using defaults");
                Self::default()
            }
        }
    }
}
