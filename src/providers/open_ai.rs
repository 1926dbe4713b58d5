use crate::config::ProviderConfig;
use crate::http::{decode_json, ensure_success, request_with_retry, RetryPolicy};
use crate::providers::{ChatCompletion, ChatRequest, LlmProvider, Usage};
use crate::RecipeError;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const SERVICE: &str = "openai";

pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry: RetryPolicy,
}

#[derive(Deserialize)]
struct OpenAIReply {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider from configuration
    pub fn new(config: &ProviderConfig) -> Result<Self, RecipeError> {
        // Try config first, then fall back to environment variable
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| RecipeError::MissingCredentials("OPENAI_API_KEY".to_string()))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());

        Ok(OpenAIProvider {
            client: Client::new(),
            api_key,
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: RetryPolicy::default(),
        })
    }

    /// Create a new OpenAI provider with simple parameters
    pub fn with_api_key(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com".to_string(), model)
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        OpenAIProvider {
            client: Client::new(),
            api_key,
            base_url,
            model,
            temperature: 0.7,
            max_tokens: 2000,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn provider_name(&self) -> &str {
        SERVICE
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, RecipeError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens
        });

        let response = request_with_retry(&self.retry, || {
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;
        let response = ensure_success(SERVICE, response).await?;
        let reply: OpenAIReply = decode_json(SERVICE, response).await?;
        debug!("OpenAI returned {} choices", reply.choices.len());

        let message = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| RecipeError::invalid_response(SERVICE, "no message content"))?;

        Ok(ChatCompletion {
            message,
            usage: reply.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ChatMessage;
    use mockito::Server;

    #[tokio::test]
    async fn test_complete() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer fake_api_key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "choices": [{
                        "message": {
                            "content": "{\"title\": \"Pasta\", \"ingredients\": [\"500 g pasta\"], \"instructions\": [\"Boil\"]}"
                        }
                    }],
                    "usage": {"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30}
                }"#,
            )
            .create_async()
            .await;

        let provider = OpenAIProvider::with_base_url(
            "fake_api_key".to_string(),
            server.url(),
            "gpt-4o-mini".to_string(),
        );
        let request = ChatRequest::new(vec![ChatMessage::user("pasta please")]);

        let result = provider.complete(&request).await.unwrap();
        assert!(result.message.contains("Pasta"));
        assert_eq!(result.usage.unwrap().total_tokens, 30);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_api_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Invalid request"}"#)
            .create_async()
            .await;

        let provider = OpenAIProvider::with_base_url(
            "fake_api_key".to_string(),
            server.url(),
            "gpt-4o-mini".to_string(),
        );
        let request = ChatRequest::new(vec![ChatMessage::user("ingredient")]);

        let result = provider.complete(&request).await;
        assert!(result.is_err());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_choices_rejected() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let provider = OpenAIProvider::with_base_url(
            "fake_api_key".to_string(),
            server.url(),
            "gpt-4o-mini".to_string(),
        );
        let result = provider
            .complete(&ChatRequest::new(vec![ChatMessage::user("hi")]))
            .await;
        assert!(matches!(result, Err(RecipeError::InvalidResponse { .. })));
    }

    #[tokio::test]
    async fn test_provider_name() {
        let provider =
            OpenAIProvider::with_api_key("fake_api_key".to_string(), "gpt-4o".to_string());
        assert_eq!(provider.provider_name(), "openai");
    }
}
