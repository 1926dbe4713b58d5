use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A recipe in the normalized shape handed to callers and persisted as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedRecipe {
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Ingredient names, stripped of quantities and units by the structured tiers
    pub ingredients: Vec<String>,
    /// Instructions, one step per line
    pub instructions: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub setup: Vec<String>,
}

/// Store rows carry `null` for empty optional columns.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ParsedRecipe {
    /// A recipe is usable once it has at least one ingredient and some instructions.
    pub fn is_complete(&self) -> bool {
        !self.ingredients.is_empty() && !self.instructions.trim().is_empty()
    }
}

/// One ingredient line decomposed into its parts.
///
/// `name` is what remains of `original` once the quantity, unit, size
/// adjective and filler words are stripped. An empty `name` means the line
/// carried nothing but measurements and should be dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedIngredient {
    pub name: String,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub size: Option<String>,
    pub original: String,
}

/// Outcome of [`crate::RecipeParser::parse`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecipeParseResult {
    Success {
        recipe: ParsedRecipe,
        warnings: Vec<String>,
    },
    Failure {
        error: String,
    },
}

impl RecipeParseResult {
    pub fn success(recipe: ParsedRecipe, warnings: Vec<String>) -> Self {
        RecipeParseResult::Success { recipe, warnings }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        RecipeParseResult::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RecipeParseResult::Success { .. })
    }

    pub fn recipe(&self) -> Option<&ParsedRecipe> {
        match self {
            RecipeParseResult::Success { recipe, .. } => Some(recipe),
            RecipeParseResult::Failure { .. } => None,
        }
    }

    /// Warnings attached to a successful parse; empty for failures.
    pub fn warnings(&self) -> &[String] {
        match self {
            RecipeParseResult::Success { warnings, .. } => warnings,
            RecipeParseResult::Failure { .. } => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RecipeParseResult::Success { .. } => None,
            RecipeParseResult::Failure { error } => Some(error),
        }
    }

    pub fn into_result(self) -> Result<(ParsedRecipe, Vec<String>), String> {
        match self {
            RecipeParseResult::Success { recipe, warnings } => Ok((recipe, warnings)),
            RecipeParseResult::Failure { error } => Err(error),
        }
    }
}

// Serialized with a boolean `success` discriminant rather than serde's enum tagging.
impl Serialize for RecipeParseResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RecipeParseResult::Success { recipe, warnings } => {
                let mut state = serializer.serialize_struct("RecipeParseResult", 3)?;
                state.serialize_field("success", &true)?;
                state.serialize_field("recipe", recipe)?;
                state.serialize_field("warnings", warnings)?;
                state.end()
            }
            RecipeParseResult::Failure { error } => {
                let mut state = serializer.serialize_struct("RecipeParseResult", 2)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
                state.end()
            }
        }
    }
}
