use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::http::RetryPolicy;

/// Settings for the parser, its AI providers and the recipe store
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Provider used for the AI tier when fallback is disabled
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Provider settings keyed by factory name (`chat`, `openai`, `assistant`)
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Ordered provider chain used by the AI tier
    #[serde(default)]
    pub fallback: FallbackConfig,
    /// HTTP retry behaviour shared by every remote call
    #[serde(default)]
    pub retry: RetryConfig,
    /// Recipe parser behaviour
    #[serde(default)]
    pub parser: ParserConfig,
    /// Managed store the binary saves recipes to
    #[serde(default)]
    pub store: Option<StoreConfig>,
    /// Per-call timeout in seconds for AI providers
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// Settings for one AI provider
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    pub enabled: bool,
    /// Model identifier, e.g. "gpt-4o-mini"
    pub model: String,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Falls back to `OPENAI_API_KEY` for `openai` and `assistant`
    pub api_key: Option<String>,
    /// API root, for proxies and tests
    pub base_url: Option<String>,
    /// Full endpoint URL (chat completion functions)
    pub endpoint: Option<String>,
    /// Assistant identifier (assistant provider)
    pub assistant_id: Option<String>,
    /// Chatbot persona forwarded with every request
    pub persona: Option<String>,
    /// How often an assistant run is polled before giving up
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

/// Provider chain settings
#[derive(Debug, Deserialize, Clone)]
pub struct FallbackConfig {
    /// When false only `default_provider` is used
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub order: Vec<String>,
    /// Number of attempts per provider before moving on
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            order: Vec::new(),
            retry_attempts: default_retry_attempts(),
        }
    }
}

/// Exponential backoff settings for HTTP calls
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_jitter: Duration::from_millis(self.jitter_ms),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ParserConfig {
    /// Whether free text may be sent to an AI provider
    #[serde(default = "default_ai_tier")]
    pub ai_tier: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            ai_tier: default_ai_tier(),
        }
    }
}

/// Managed relational store (PostgREST-style REST interface)
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_provider() -> String {
    "chat".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_max_poll_attempts() -> u32 {
    10
}

fn default_retry_attempts() -> u32 {
    1
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_jitter_ms() -> u64 {
    200
}

fn default_ai_tier() -> bool {
    true
}

fn default_table() -> String {
    "recipes".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            providers: HashMap::new(),
            fallback: FallbackConfig::default(),
            retry: RetryConfig::default(),
            parser: ParserConfig::default(),
            store: None,
            timeout: default_timeout(),
        }
    }
}

impl AppConfig {
    /// Read `config.toml` from the working directory (optional), then apply
    /// `RECIPE__*` environment overrides such as `RECIPE__PROVIDERS__OPENAI__API_KEY`.
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// See [`AppConfig::load`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let settings = Config::builder()
        .add_source(File::with_name("config").required(false))
        // Use double underscore for nested: RECIPE__PROVIDERS__OPENAI__API_KEY
        .add_source(
            Environment::with_prefix("RECIPE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
