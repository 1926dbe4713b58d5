use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::config::{AppConfig, ProviderConfig};
use crate::extractors::{LlmRecipeExtractor, RecipeExtractor};
use crate::providers::{FallbackProvider, LlmProvider, ProviderFactory};
use crate::{RecipeError, RecipeParser};

/// AI provider used for the extraction tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Hosted chat-completion function
    Chat,
    OpenAI,
    /// Thread/run based assistant
    Assistant,
}

impl ProviderKind {
    /// Convert to provider name string used by the factory
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Chat => "chat",
            ProviderKind::OpenAI => "openai",
            ProviderKind::Assistant => "assistant",
        }
    }
}

/// Builder for configuring a [`RecipeParser`]
#[derive(Default)]
pub struct RecipeParserBuilder {
    config: Option<AppConfig>,
    provider: Option<ProviderKind>,
    api_key: Option<String>,
    model: Option<String>,
    timeout: Option<Duration>,
    language: Option<String>,
    extractor: Option<Arc<dyn RecipeExtractor>>,
    without_ai: bool,
}

impl RecipeParserBuilder {
    /// Use an explicit configuration instead of `config.toml` and the environment
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a single named provider instead of the configured fallback chain
    ///
    /// # Example
    /// ```
    /// use recipe_parser::{ProviderKind, RecipeParser};
    ///
    /// let builder = RecipeParser::builder()
    ///     .provider(ProviderKind::OpenAI)
    ///     .api_key("your-api-key");
    /// ```
    pub fn provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the API key for the provider
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the model name for the provider
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Race every AI call against this timeout (default from config, 60 seconds)
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Tell the model which language the recipe text is written in
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Use a custom extractor for the AI tier
    pub fn extractor(mut self, extractor: Arc<dyn RecipeExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Skip the AI tier entirely
    ///
    /// # Example
    /// ```
    /// use recipe_parser::RecipeParser;
    ///
    /// let parser = RecipeParser::builder().without_ai().build().unwrap();
    /// assert!(!parser.has_ai_tier());
    /// ```
    pub fn without_ai(mut self) -> Self {
        self.without_ai = true;
        self
    }

    /// Build the parser
    ///
    /// # Errors
    /// Returns `RecipeError` if:
    /// - An extractor is combined with `without_ai()`
    /// - The configuration cannot be loaded
    /// - An explicitly requested provider cannot be created
    ///
    /// Without an explicit provider, a configuration with no usable provider
    /// yields a parser without the AI tier.
    pub fn build(self) -> Result<RecipeParser, RecipeError> {
        if self.without_ai {
            if self.extractor.is_some() {
                return Err(RecipeError::Builder(
                    "Cannot combine extractor() with without_ai()".to_string(),
                ));
            }
            return Ok(RecipeParser::offline());
        }

        if let Some(extractor) = self.extractor {
            return Ok(RecipeParser::new(extractor));
        }

        let config = match self.config {
            Some(config) => config,
            None => AppConfig::load()?,
        };
        if !config.parser.ai_tier {
            info!("AI tier disabled in configuration");
            return Ok(RecipeParser::offline());
        }
        let timeout = self.timeout.unwrap_or_else(|| config.timeout());

        let explicit = self.provider.is_some() || self.api_key.is_some() || self.model.is_some();
        let provider: Box<dyn LlmProvider> = if explicit {
            let name = self
                .provider
                .map(|kind| kind.as_str())
                .unwrap_or(config.default_provider.as_str());
            let provider_config = override_config(&config, name, self.api_key, self.model);
            let single = ProviderFactory::create(name, &provider_config, &config.retry.policy())?;
            Box::new(FallbackProvider::from_providers(vec![single], timeout))
        } else {
            match FallbackProvider::new(&config) {
                Ok(chain) => Box::new(chain.with_timeout(timeout)),
                Err(e) => {
                    warn!("No AI provider available, parsing without AI: {}", e);
                    return Ok(RecipeParser::offline());
                }
            }
        };

        let mut extractor = LlmRecipeExtractor::new(Arc::from(provider));
        if let Some(language) = self.language {
            extractor = extractor.with_language(language);
        }
        Ok(RecipeParser::new(Arc::new(extractor)))
    }
}

/// The named provider's configuration with builder overrides applied.
///
/// A provider missing from the configuration starts out enabled with the
/// default settings.
fn override_config(
    config: &AppConfig,
    name: &str,
    api_key: Option<String>,
    model: Option<String>,
) -> ProviderConfig {
    let mut provider_config = config.providers.get(name).cloned().unwrap_or_else(|| ProviderConfig {
        enabled: true,
        model: "gpt-4o-mini".to_string(),
        temperature: 0.7,
        max_tokens: 2000,
        api_key: None,
        base_url: None,
        endpoint: None,
        assistant_id: None,
        persona: None,
        max_poll_attempts: 10,
    });
    if api_key.is_some() {
        provider_config.api_key = api_key;
    }
    if let Some(model) = model {
        provider_config.model = model;
    }
    provider_config
}
