use crate::config::{AppConfig, ProviderConfig};
use crate::http::RetryPolicy;
use crate::providers::{AssistantProvider, ChatCompletionsProvider, LlmProvider, OpenAIProvider};
use crate::RecipeError;

pub struct ProviderFactory;

impl ProviderFactory {
    /// Build the provider registered under `provider_name`.
    ///
    /// Every HTTP call the provider makes is retried with `retry`.
    pub fn create(
        provider_name: &str,
        config: &ProviderConfig,
        retry: &RetryPolicy,
    ) -> Result<Box<dyn LlmProvider>, RecipeError> {
        if !config.enabled {
            return Err(RecipeError::Provider(format!(
                "Provider '{}' is not enabled in configuration",
                provider_name
            )));
        }

        match provider_name {
            "chat" => Ok(Box::new(
                ChatCompletionsProvider::new(config)?.with_retry_policy(retry.clone()),
            )),
            "openai" => Ok(Box::new(
                OpenAIProvider::new(config)?.with_retry_policy(retry.clone()),
            )),
            "assistant" => Ok(Box::new(
                AssistantProvider::new(config)?.with_retry_policy(retry.clone()),
            )),
            _ => Err(RecipeError::Provider(format!(
                "Unknown provider: {}",
                provider_name
            ))),
        }
    }

    /// The provider named by `default_provider`.
    pub fn get_default_provider(config: &AppConfig) -> Result<Box<dyn LlmProvider>, RecipeError> {
        let provider_name = &config.default_provider;
        let provider_config = config.providers.get(provider_name).ok_or_else(|| {
            RecipeError::Provider(format!(
                "Default provider '{}' not found in configuration",
                provider_name
            ))
        })?;

        Self::create(provider_name, provider_config, &config.retry.policy())
    }

    pub fn available_providers() -> Vec<&'static str> {
        vec!["chat", "openai", "assistant"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn keyed_config() -> ProviderConfig {
        ProviderConfig {
            enabled: true,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            api_key: Some("test-key".to_string()),
            base_url: None,
            endpoint: None,
            assistant_id: None,
            persona: None,
            max_poll_attempts: 10,
        }
    }

    #[test]
    fn test_create_openai_provider() {
        let config = keyed_config();
        let provider = ProviderFactory::create("openai", &config, &RetryPolicy::none()).unwrap();
        assert_eq!(provider.provider_name(), "openai");
    }

    #[test]
    fn test_create_chat_provider() {
        let mut config = keyed_config();
        config.endpoint = Some("https://project.example.com/functions/v1/chat".to_string());

        let provider = ProviderFactory::create("chat", &config, &RetryPolicy::none()).unwrap();
        assert_eq!(provider.provider_name(), "chat");
    }

    #[test]
    fn test_create_chat_provider_without_endpoint() {
        let config = keyed_config();
        let result = ProviderFactory::create("chat", &config, &RetryPolicy::none());
        assert!(matches!(result, Err(RecipeError::Provider(_))));
    }

    #[test]
    fn test_create_assistant_provider() {
        let mut config = keyed_config();
        config.assistant_id = Some("asst_123".to_string());

        let provider =
            ProviderFactory::create("assistant", &config, &RetryPolicy::none()).unwrap();
        assert_eq!(provider.provider_name(), "assistant");
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = keyed_config();
        let error = ProviderFactory::create("gemini", &config, &RetryPolicy::none())
            .err()
            .map(|e| e.to_string());
        assert_eq!(error.as_deref(), Some("Provider error: Unknown provider: gemini"));
    }

    #[test]
    fn test_create_disabled_provider() {
        let mut config = keyed_config();
        config.enabled = false;

        let result = ProviderFactory::create("openai", &config, &RetryPolicy::none());
        assert!(matches!(result, Err(RecipeError::Provider(msg)) if msg.contains("not enabled")));
    }

    #[test]
    fn test_get_default_provider() {
        let mut providers = HashMap::new();
        providers.insert("openai".to_string(), keyed_config());

        let config = AppConfig {
            default_provider: "openai".to_string(),
            providers,
            ..Default::default()
        };

        let provider = ProviderFactory::get_default_provider(&config).unwrap();
        assert_eq!(provider.provider_name(), "openai");
    }

    #[test]
    fn test_get_default_provider_not_found() {
        let config = AppConfig::default();

        let result = ProviderFactory::get_default_provider(&config);
        assert!(matches!(result, Err(RecipeError::Provider(msg)) if msg.contains("'chat' not found")));
    }

    #[test]
    fn test_available_providers() {
        let providers = ProviderFactory::available_providers();
        assert_eq!(providers, vec!["chat", "openai", "assistant"]);
    }
}
