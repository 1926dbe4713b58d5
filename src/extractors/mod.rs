use async_trait::async_trait;

use crate::model::ParsedRecipe;
use crate::RecipeError;

mod llm;

pub use self::llm::LlmRecipeExtractor;

/// Turns free recipe text into a structured recipe.
///
/// Implementations return `Err` for anything that is not a recipe; the
/// tiered parser treats every error the same way and moves on.
#[async_trait]
pub trait RecipeExtractor: Send + Sync {
    fn name(&self) -> &str;
    async fn extract(&self, text: &str) -> Result<ParsedRecipe, RecipeError>;
}
