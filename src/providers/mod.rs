mod assistant;
mod chat_completions;
mod factory;
mod fallback;
mod open_ai;
mod prompt;

pub use assistant::{AssistantProvider, Run, RunStatus};
pub use chat_completions::ChatCompletionsProvider;
pub use factory::ProviderFactory;
pub use fallback::FallbackProvider;
pub use open_ai::OpenAIProvider;
pub use prompt::{build_extraction_prompt, RECIPE_EXTRACTION_PROMPT};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::RecipeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A conversation to complete, plus optional per-user context.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub persona: Option<String>,
    pub user_id: Option<String>,
    pub live_selections: Option<Value>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Selections the user has made in the client, passed through untouched.
    pub fn with_live_selections(mut self, selections: Value) -> Self {
        self.live_selections = Some(selections);
        self
    }

    /// System messages joined into one block of instructions.
    pub fn system_prompt(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        (!parts.is_empty()).then(|| parts.join("\n\n"))
    }
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub message: String,
    pub usage: Option<Usage>,
}

/// Unified trait for all LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "assistant")
    fn provider_name(&self) -> &str;

    /// Produce the next assistant message for the conversation
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, RecipeError>;
}
