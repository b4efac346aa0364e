use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// LLM provider registration and role assignment (spec §4.C7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "d_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,
    /// Model roles (e.g. "chat", "summarize") mapped to a provider id + model.
    #[serde(default)]
    pub roles: HashMap<String, RoleConfig>,
    /// Registered providers, data-driven: adding a provider is adding config.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: d_request_timeout_ms(),
            max_retries: d_max_retries(),
            roles: HashMap::new(),
            providers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Format: "<provider_id>/<model_name>".
    pub model: String,
    #[serde(default)]
    pub require_streaming: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub base_url: String,
    /// Env var holding the API key. Looked up at provider init, never
    /// stored in the config value itself.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Anthropic,
    OpenaiCompat,
}

fn d_request_timeout_ms() -> u64 {
    20_000
}
fn d_max_retries() -> u32 {
    2
}
