//! Resolves LLM providers by role and keeps the whole registry behind a
//! lazily-initialized singleton (component C7, spec §4.C7/§9): providers
//! are constructed on first use, not at process start, so a missing API
//! key surfaces as an error from the first request that needs it rather
//! than killing startup.

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;
use sh_domain::config::{LlmConfig, ProviderConfig, ProviderKind};
use sh_domain::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Every configured provider, constructed eagerly from `LlmConfig` and
/// resolvable by role name.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    roles: HashMap<String, (String, String)>,
}

impl ProviderRegistry {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        for provider_config in &config.providers {
            let provider = build_provider(provider_config)?;
            providers.insert(provider_config.id.clone(), provider);
        }

        let mut roles = HashMap::new();
        for (role, role_config) in &config.roles {
            let (provider_id, model) = split_role_model(&role_config.model)?;
            roles.insert(role.clone(), (provider_id, model));
        }

        Ok(Self { providers, roles })
    }

    /// Resolve a role (e.g. `"chat"`) to its provider and the model name
    /// that provider should use for this role.
    pub fn for_role(&self, role: &str) -> Result<(Arc<dyn LlmProvider>, String)> {
        let (provider_id, model) = self
            .roles
            .get(role)
            .ok_or_else(|| Error::Internal(format!("no provider role configured for '{role}'")))?;
        let provider = self
            .providers
            .get(provider_id)
            .ok_or_else(|| Error::Internal(format!("role '{role}' references unknown provider '{provider_id}'")))?;
        Ok((provider.clone(), model.clone()))
    }
}

fn split_role_model(model: &str) -> Result<(String, String)> {
    model
        .split_once('/')
        .map(|(provider, model)| (provider.to_string(), model.to_string()))
        .ok_or_else(|| Error::Internal(format!("role model '{model}' is not '<provider_id>/<model_name>'")))
}

fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    let default_model = config.default_model.clone().unwrap_or_default();
    let api_key_env = config
        .api_key_env
        .as_deref()
        .ok_or_else(|| Error::Internal(format!("provider '{}' has no api_key_env configured", config.id)))?;

    match config.kind {
        ProviderKind::Anthropic => {
            let provider = AnthropicProvider::new(&config.id, &config.base_url, api_key_env, default_model)?;
            Ok(Arc::new(provider))
        }
        ProviderKind::OpenaiCompat => {
            let provider = OpenAiCompatProvider::new(&config.id, &config.base_url, api_key_env, default_model)?;
            Ok(Arc::new(provider))
        }
    }
}

/// Process-wide lazy wrapper (spec §9): the registry — and therefore every
/// provider's API-key lookup — is only built the first time a turn asks
/// for it. A missing key surfaces as a fatal error from that first call,
/// never at startup.
pub struct LazyProviderRegistry {
    config: LlmConfig,
    cell: tokio::sync::OnceCell<Arc<ProviderRegistry>>,
}

impl LazyProviderRegistry {
    pub fn new(config: LlmConfig) -> Self {
        Self { config, cell: tokio::sync::OnceCell::new() }
    }

    pub async fn get(&self) -> Result<Arc<ProviderRegistry>> {
        self.cell
            .get_or_try_init(|| async { ProviderRegistry::from_config(&self.config).map(Arc::new) })
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sh_domain::config::RoleConfig;

    fn anthropic_config() -> LlmConfig {
        let mut roles = HashMap::new();
        roles.insert("chat".to_string(), RoleConfig { model: "claude/claude-3-5-sonnet".into(), require_streaming: true });
        LlmConfig {
            request_timeout_ms: 20_000,
            max_retries: 2,
            roles,
            providers: vec![ProviderConfig {
                id: "claude".into(),
                kind: ProviderKind::Anthropic,
                base_url: "https://api.anthropic.com".into(),
                api_key_env: Some("SH_TEST_REGISTRY_ANTHROPIC_KEY".into()),
                default_model: Some("claude-3-5-sonnet".into()),
            }],
        }
    }

    #[test]
    fn from_config_resolves_role_to_provider_and_model() {
        std::env::set_var("SH_TEST_REGISTRY_ANTHROPIC_KEY", "sk-test");
        let registry = ProviderRegistry::from_config(&anthropic_config()).expect("builds");
        let (provider, model) = registry.for_role("chat").expect("chat role resolves");
        assert_eq!(provider.provider_id(), "claude");
        assert_eq!(model, "claude-3-5-sonnet");
        std::env::remove_var("SH_TEST_REGISTRY_ANTHROPIC_KEY");
    }

    #[test]
    fn unknown_role_is_an_error() {
        std::env::set_var("SH_TEST_REGISTRY_ANTHROPIC_KEY", "sk-test");
        let registry = ProviderRegistry::from_config(&anthropic_config()).expect("builds");
        assert!(registry.for_role("summarize").is_err());
        std::env::remove_var("SH_TEST_REGISTRY_ANTHROPIC_KEY");
    }

    #[test]
    fn missing_api_key_env_surfaces_at_build_not_panic() {
        std::env::remove_var("SH_TEST_REGISTRY_ANTHROPIC_KEY_MISSING");
        let mut config = anthropic_config();
        config.providers[0].api_key_env = Some("SH_TEST_REGISTRY_ANTHROPIC_KEY_MISSING".into());
        let err = ProviderRegistry::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("SH_TEST_REGISTRY_ANTHROPIC_KEY_MISSING"));
    }

    #[tokio::test]
    async fn lazy_registry_builds_once_on_first_get() {
        std::env::set_var("SH_TEST_REGISTRY_LAZY_KEY", "sk-test");
        let mut config = anthropic_config();
        config.providers[0].api_key_env = Some("SH_TEST_REGISTRY_LAZY_KEY".into());
        let lazy = LazyProviderRegistry::new(config);
        let first = lazy.get().await.expect("first get builds");
        let second = lazy.get().await.expect("second get reuses");
        assert!(Arc::ptr_eq(&first, &second));
        std::env::remove_var("SH_TEST_REGISTRY_LAZY_KEY");
    }
}
