use crate::config::AppConfig;
use crate::http::RetryPolicy;
use crate::providers::{ChatCompletion, ChatRequest, LlmProvider, ProviderFactory};
use crate::RecipeError;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Tries each configured provider in order until one answers.
///
/// Every attempt is raced against `timeout`; a provider that loses the race
/// counts as failed and the chain moves on. The losing request is dropped.
pub struct FallbackProvider {
    providers: Vec<Box<dyn LlmProvider>>,
    retry_attempts: u32,
    timeout: Duration,
    backoff: RetryPolicy,
}

impl FallbackProvider {
    /// Chain the providers listed in `fallback.order`, or just the default
    /// provider when fallback is off.
    ///
    /// Entries that are missing, disabled or fail to build are skipped with a
    /// warning; an empty chain is an error.
    pub fn new(config: &AppConfig) -> Result<Self, RecipeError> {
        let backoff = config.retry.policy();
        let chain = Self::from_providers(Vec::new(), config.timeout()).with_backoff(backoff.clone());

        if !config.fallback.enabled {
            return Ok(FallbackProvider {
                providers: vec![ProviderFactory::get_default_provider(config)?],
                ..chain
            });
        }

        let providers: Vec<Box<dyn LlmProvider>> = config
            .fallback
            .order
            .iter()
            .filter_map(|name| {
                let Some(provider_config) = config.providers.get(name) else {
                    warn!("Fallback entry '{}' has no provider configuration", name);
                    return None;
                };
                if !provider_config.enabled {
                    debug!("Skipping disabled provider '{}'", name);
                    return None;
                }
                ProviderFactory::create(name, provider_config, &backoff)
                    .map_err(|e| warn!("Skipping provider '{}': {}", name, e))
                    .ok()
            })
            .collect();

        if providers.is_empty() {
            return Err(RecipeError::Provider(
                "No providers available in fallback configuration".to_string(),
            ));
        }
        info!(
            "Fallback chain: {}",
            providers
                .iter()
                .map(|p| p.provider_name())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        Ok(FallbackProvider {
            providers,
            ..chain.with_retry_attempts(config.fallback.retry_attempts)
        })
    }

    /// Build a chain from already constructed providers.
    pub fn from_providers(providers: Vec<Box<dyn LlmProvider>>, timeout: Duration) -> Self {
        FallbackProvider {
            providers,
            retry_attempts: 1,
            timeout,
            backoff: RetryPolicy::default(),
        }
    }

    pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: RetryPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Up to `retry_attempts` timed calls to one provider.
    async fn attempt(
        &self,
        provider: &dyn LlmProvider,
        request: &ChatRequest,
    ) -> Result<ChatCompletion, RecipeError> {
        let mut attempt = 1;
        loop {
            debug!(
                "Attempting completion with {} (attempt {}/{})",
                provider.provider_name(),
                attempt,
                self.retry_attempts
            );

            let error = match timeout(self.timeout, provider.complete(request)).await {
                Ok(Ok(completion)) => {
                    info!("Completion answered by {}", provider.provider_name());
                    return Ok(completion);
                }
                Ok(Err(e)) => e,
                Err(_) => RecipeError::Timeout(self.timeout),
            };

            warn!(
                "Provider {} failed (attempt {}/{}): {}",
                provider.provider_name(),
                attempt,
                self.retry_attempts,
                error
            );
            if attempt >= self.retry_attempts {
                return Err(error);
            }

            let delay = self.backoff.delay_for(attempt - 1);
            debug!("Waiting {:?} before retry", delay);
            sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl LlmProvider for FallbackProvider {
    fn provider_name(&self) -> &str {
        "fallback"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, RecipeError> {
        let mut failures = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            match self.attempt(provider.as_ref(), request).await {
                Ok(completion) => return Ok(completion),
                Err(e) => failures.push(format!("{}: {}", provider.provider_name(), e)),
            }
        }

        Err(RecipeError::Provider(format!(
            "All providers failed:\n{}",
            failures.join("\n")
        )))
    }
}
