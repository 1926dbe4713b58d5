use crate::config::ProviderConfig;
use crate::http::{decode_json, ensure_success, request_with_retry, RetryPolicy};
use crate::providers::{ChatCompletion, ChatMessage, ChatRequest, LlmProvider, Usage};
use crate::RecipeError;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SERVICE: &str = "chat";

/// Client for a hosted chat-completion function.
///
/// Posts `{messages, model, temperature, max_tokens, persona?, userId?,
/// liveSelections?}` and expects `{message, usage?}` back.
pub struct ChatCompletionsProvider {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    persona: Option<String>,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    messages: &'a [ChatMessage],
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    persona: Option<&'a str>,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    #[serde(rename = "liveSelections", skip_serializing_if = "Option::is_none")]
    live_selections: Option<&'a Value>,
}

#[derive(Deserialize)]
struct CompletionReply {
    message: String,
    #[serde(default)]
    usage: Option<Usage>,
}

impl ChatCompletionsProvider {
    /// Create a provider from configuration; `endpoint` (or `base_url`) is required
    pub fn new(config: &ProviderConfig) -> Result<Self, RecipeError> {
        let endpoint = config
            .endpoint
            .clone()
            .or_else(|| {
                config
                    .base_url
                    .as_ref()
                    .map(|base| format!("{}/functions/v1/chat", base.trim_end_matches('/')))
            })
            .ok_or_else(|| RecipeError::Provider("chat provider requires an endpoint".to_string()))?;

        Ok(ChatCompletionsProvider {
            client: Client::new(),
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            persona: config.persona.clone(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_endpoint(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        ChatCompletionsProvider {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: None,
            model: model.into(),
            temperature: 0.7,
            max_tokens: 2000,
            persona: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl LlmProvider for ChatCompletionsProvider {
    fn provider_name(&self) -> &str {
        SERVICE
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, RecipeError> {
        let body = CompletionBody {
            messages: &request.messages,
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            persona: request.persona.as_deref().or(self.persona.as_deref()),
            user_id: request.user_id.as_deref(),
            live_selections: request.live_selections.as_ref(),
        };
        debug!("Sending {} messages to {}", body.messages.len(), self.endpoint);

        let response = request_with_retry(&self.retry, || {
            let builder = self.client.post(&self.endpoint).json(&body);
            match &self.api_key {
                Some(key) => builder.bearer_auth(key),
                None => builder,
            }
        })
        .await?;
        let response = ensure_success(SERVICE, response).await?;
        let reply: CompletionReply = decode_json(SERVICE, response).await?;

        if reply.message.trim().is_empty() {
            return Err(RecipeError::invalid_response(SERVICE, "empty message"));
        }
        info!("Chat completion returned {} characters", reply.message.len());

        Ok(ChatCompletion {
            message: reply.message,
            usage: reply.usage,
        })
    }
}
