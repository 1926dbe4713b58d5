//! The tiered recipe parser.
//!
//! Tiers run strictly in order and the first success wins:
//! 1. structured JSON (fenced block or first valid object), no warnings
//! 2. the AI extractor, only for text with recipe vocabulary
//! 3. the pattern fallback
//!
//! A failing tier is an ordinary [`TierFailure`] value; only errors raised
//! outside the tiers are turned into a failure message at the top.

use std::fmt;
use std::sync::{Arc, LazyLock};

use log::{debug, info, warn};
use regex::Regex;

use crate::builder::RecipeParserBuilder;
use crate::extractors::RecipeExtractor;
use crate::fallback::{try_pattern_parsing, MissingSections};
use crate::json_extract::{extract_json_value, find_fenced_json};
use crate::model::{ParsedRecipe, RecipeParseResult};
use crate::structured::{titled_recipe_from_value, StructureError};
use crate::RecipeError;

/// Words whose presence makes text worth sending to the AI tier.
pub const RECIPE_INDICATORS: &[&str] = &[
    "ingredient",
    "instruction",
    "recipe",
    "cook",
    "bake",
    "mix",
    "add",
    "cup",
    "tablespoon",
    "teaspoon",
];

pub const UNABLE_TO_PARSE: &str = "Unable to parse recipe";

pub const AI_REVIEW_WARNING: &str =
    "Recipe was interpreted by AI; please review it before saving.";

pub const FALLBACK_WARNING: &str =
    "Recipe was parsed with basic pattern matching; please review it before saving.";

static INDICATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?i){}", RECIPE_INDICATORS.join("|")))
        .expect("Invalid recipe indicator regex")
});

/// Why a single tier produced nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum TierFailure {
    NoStructuredData,
    InvalidStructure(StructureError),
    NotRecipeContent,
    AiUnavailable,
    AiFailed(String),
    MissingSections(MissingSections),
}

impl fmt::Display for TierFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierFailure::NoStructuredData => f.write_str("no JSON object found"),
            TierFailure::InvalidStructure(e) => write!(f, "invalid recipe JSON: {e}"),
            TierFailure::NotRecipeContent => f.write_str("text does not look like a recipe"),
            TierFailure::AiUnavailable => f.write_str("AI tier is disabled"),
            TierFailure::AiFailed(reason) => write!(f, "AI extraction failed: {reason}"),
            TierFailure::MissingSections(missing) => write!(f, "{missing}"),
        }
    }
}

/// Structured JSON tier: a fenced ```json block if present, else the raw text.
///
/// Requires a title, ingredients and instructions.
pub fn try_structured_parsing(content: &str) -> Result<ParsedRecipe, TierFailure> {
    let body = find_fenced_json(content).unwrap_or(content);
    let value = extract_json_value(body).ok_or(TierFailure::NoStructuredData)?;
    titled_recipe_from_value(&value).map_err(TierFailure::InvalidStructure)
}

pub fn has_recipe_indicators(content: &str) -> bool {
    INDICATOR_RE.is_match(content)
}

/// Tiered recipe parser.
///
/// Holds no per-call state; one instance can serve concurrent `parse` calls.
#[derive(Clone, Default)]
pub struct RecipeParser {
    extractor: Option<Arc<dyn RecipeExtractor>>,
}

impl RecipeParser {
    pub fn new(extractor: Arc<dyn RecipeExtractor>) -> Self {
        Self {
            extractor: Some(extractor),
        }
    }

    /// A parser without the AI tier.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn builder() -> RecipeParserBuilder {
        RecipeParserBuilder::default()
    }

    pub fn has_ai_tier(&self) -> bool {
        self.extractor.is_some()
    }

    /// Parse recipe text. Never fails; problems are reported in the result.
    pub async fn parse(&self, content: &str) -> RecipeParseResult {
        match self.run_tiers(content).await {
            Ok(Some((recipe, warnings))) => RecipeParseResult::success(recipe, warnings),
            Ok(None) => RecipeParseResult::failure(format!(
                "{UNABLE_TO_PARSE}: no ingredients and instructions could be found"
            )),
            Err(e) => {
                warn!("Recipe parsing aborted: {}", e);
                RecipeParseResult::failure(format!("{UNABLE_TO_PARSE}: {e}"))
            }
        }
    }

    async fn run_tiers(
        &self,
        content: &str,
    ) -> Result<Option<(ParsedRecipe, Vec<String>)>, RecipeError> {
        if content.trim().is_empty() {
            return Err(RecipeError::EmptyInput);
        }

        match try_structured_parsing(content) {
            Ok(recipe) => {
                info!("Parsed recipe '{}' from structured JSON", recipe.title);
                return Ok(Some((recipe, Vec::new())));
            }
            Err(failure) => debug!("Structured tier: {}", failure),
        }

        match self.try_ai_parsing(content).await {
            Ok(recipe) => {
                info!("Parsed recipe '{}' with the AI tier", recipe.title);
                return Ok(Some((recipe, vec![AI_REVIEW_WARNING.to_string()])));
            }
            Err(TierFailure::AiFailed(reason)) => warn!("AI tier failed: {}", reason),
            Err(failure) => debug!("AI tier skipped: {}", failure),
        }

        match try_pattern_parsing(content).map_err(TierFailure::MissingSections) {
            Ok(recipe) => {
                info!("Parsed recipe '{}' with pattern fallback", recipe.title);
                Ok(Some((recipe, vec![FALLBACK_WARNING.to_string()])))
            }
            Err(failure) => {
                debug!("Pattern tier: {}", failure);
                Ok(None)
            }
        }
    }

    async fn try_ai_parsing(&self, content: &str) -> Result<ParsedRecipe, TierFailure> {
        let extractor = self.extractor.as_ref().ok_or(TierFailure::AiUnavailable)?;
        if !has_recipe_indicators(content) {
            return Err(TierFailure::NotRecipeContent);
        }

        debug!("Delegating to {} extractor", extractor.name());
        let recipe = extractor
            .extract(content)
            .await
            .map_err(|e| TierFailure::AiFailed(e.to_string()))?;

        if !recipe.is_complete() {
            return Err(TierFailure::AiFailed(
                "extractor returned an incomplete recipe".to_string(),
            ));
        }
        Ok(recipe)
    }
}
