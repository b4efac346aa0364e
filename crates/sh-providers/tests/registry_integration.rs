//! Integration tests for provider construction and role resolution,
//! without requiring network access — provider construction only
//! validates configuration and resolves an API key from the environment,
//! it never dials out.

use sh_domain::config::{LlmConfig, ProviderConfig, ProviderKind, RoleConfig};
use sh_providers::ProviderRegistry;
use std::collections::HashMap;

#[test]
fn registry_resolves_two_different_providers_by_role() {
    std::env::set_var("SH_TEST_INTEGRATION_ANTHROPIC_KEY", "sk-ant-test");
    std::env::set_var("SH_TEST_INTEGRATION_OPENAI_KEY", "sk-openai-test");

    let mut roles = HashMap::new();
    roles.insert("chat".to_string(), RoleConfig { model: "claude/claude-3-5-sonnet".into(), require_streaming: true });
    roles.insert("cheap".to_string(), RoleConfig { model: "gpt/gpt-4o-mini".into(), require_streaming: true });

    let config = LlmConfig {
        request_timeout_ms: 20_000,
        max_retries: 2,
        roles,
        providers: vec![
            ProviderConfig {
                id: "claude".into(),
                kind: ProviderKind::Anthropic,
                base_url: "https://api.anthropic.com".into(),
                api_key_env: Some("SH_TEST_INTEGRATION_ANTHROPIC_KEY".into()),
                default_model: Some("claude-3-5-sonnet".into()),
            },
            ProviderConfig {
                id: "gpt".into(),
                kind: ProviderKind::OpenaiCompat,
                base_url: "https://api.openai.com/v1".into(),
                api_key_env: Some("SH_TEST_INTEGRATION_OPENAI_KEY".into()),
                default_model: Some("gpt-4o-mini".into()),
            },
        ],
    };

    let registry = ProviderRegistry::from_config(&config).expect("registry builds from valid config");

    let (chat_provider, chat_model) = registry.for_role("chat").expect("chat role resolves");
    assert_eq!(chat_provider.provider_id(), "claude");
    assert_eq!(chat_model, "claude-3-5-sonnet");

    let (cheap_provider, cheap_model) = registry.for_role("cheap").expect("cheap role resolves");
    assert_eq!(cheap_provider.provider_id(), "gpt");
    assert_eq!(cheap_model, "gpt-4o-mini");

    std::env::remove_var("SH_TEST_INTEGRATION_ANTHROPIC_KEY");
    std::env::remove_var("SH_TEST_INTEGRATION_OPENAI_KEY");
}
