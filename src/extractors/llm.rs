use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value;

use crate::extractors::RecipeExtractor;
use crate::json_extract::{extract_json_value, find_fenced_json};
use crate::model::ParsedRecipe;
use crate::providers::{build_extraction_prompt, ChatMessage, ChatRequest, LlmProvider};
use crate::structured::recipe_from_value;
use crate::RecipeError;

/// Asks an [`LlmProvider`] to restate free text as a recipe JSON object.
pub struct LlmRecipeExtractor {
    provider: Arc<dyn LlmProvider>,
    language: Option<String>,
}

impl LlmRecipeExtractor {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    fn request(&self, text: &str) -> ChatRequest {
        ChatRequest::new(vec![
            ChatMessage::system(build_extraction_prompt(self.language.as_deref())),
            ChatMessage::user(text),
        ])
    }
}

/// Pull the recipe object out of a model reply, fenced or bare.
fn reply_value(reply: &str) -> Option<Value> {
    let body = find_fenced_json(reply).unwrap_or(reply);
    extract_json_value(body)
}

#[async_trait]
impl RecipeExtractor for LlmRecipeExtractor {
    fn name(&self) -> &str {
        self.provider.provider_name()
    }

    async fn extract(&self, text: &str) -> Result<ParsedRecipe, RecipeError> {
        let service = self.provider.provider_name().to_string();
        let completion = self.provider.complete(&self.request(text)).await?;
        debug!("{} replied with {} characters", service, completion.message.len());

        let value = reply_value(&completion.message)
            .ok_or_else(|| RecipeError::invalid_response(&service, "no JSON object in reply"))?;

        if let Some(error) = value.get("error").and_then(Value::as_str) {
            if !error.trim().is_empty() {
                return Err(RecipeError::NotARecipe(error.trim().to_string()));
            }
        }

        let recipe = recipe_from_value(&value)
            .map_err(|e| RecipeError::invalid_response(&service, e.to_string()))?;
        info!(
            "{} extracted {} ingredients for '{}'",
            service,
            recipe.ingredients.len(),
            recipe.title
        );
        Ok(recipe)
    }
}
