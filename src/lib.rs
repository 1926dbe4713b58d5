//! Tiered recipe text parser.
//!
//! [`RecipeParser::parse`] turns pasted or generated recipe text into a
//! [`ParsedRecipe`], trying structured JSON first, then an AI extractor,
//! then line-based pattern matching.
//!
//! ```
//! # #[tokio::main]
//! # async fn main() {
//! use recipe_parser::RecipeParser;
//!
//! let parser = RecipeParser::offline();
//! let result = parser
//!     .parse("Ingredients:\n- 2 cups flour\n- 1 egg\nInstructions:\n1. Mix\n2. Bake")
//!     .await;
//! assert_eq!(result.recipe().unwrap().ingredients, vec!["2 cups flour", "1 egg"]);
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod extractors;
pub mod fallback;
pub mod http;
pub mod ingredient;
pub mod json_extract;
pub mod model;
pub mod parser;
pub mod providers;
pub mod store;
pub mod structured;

pub use builder::{ProviderKind, RecipeParserBuilder};
pub use crate::config::AppConfig;
pub use error::RecipeError;
pub use extractors::{LlmRecipeExtractor, RecipeExtractor};
pub use fallback::try_pattern_parsing;
pub use http::{request_with_retry, retry_with_backoff, RetryPolicy};
pub use ingredient::normalize_ingredient;
pub use json_extract::extract_json_object;
pub use model::{ParsedIngredient, ParsedRecipe, RecipeParseResult};
pub use parser::{try_structured_parsing, RecipeParser, TierFailure};
pub use providers::{ChatCompletion, ChatMessage, ChatRequest, LlmProvider};
pub use store::{RecipeStore, RestRecipeStore, StoredRecipe};

use log::warn;

/// Parse recipe text with the parser described by `config.toml` and the
/// environment.
///
/// If the configuration cannot be loaded the AI tier is skipped.
pub async fn parse_recipe(content: &str) -> RecipeParseResult {
    let parser = RecipeParser::builder().build().unwrap_or_else(|e| {
        warn!("Falling back to offline parsing: {}", e);
        RecipeParser::offline()
    });
    parser.parse(content).await
}
