//! Validating a recipe-shaped JSON value into a [`ParsedRecipe`].

use serde::Deserialize;
use serde_json::Value;

use crate::ingredient::ingredient_name;
use crate::model::ParsedRecipe;

/// Why a JSON value could not become a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    /// The value does not deserialize into the recipe shape at all
    Shape(String),
    MissingTitle,
    MissingIngredients,
    MissingInstructions,
}

impl std::fmt::Display for StructureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructureError::Shape(reason) => write!(f, "unexpected recipe shape: {reason}"),
            StructureError::MissingTitle => f.write_str("recipe has no title"),
            StructureError::MissingIngredients => f.write_str("recipe has no ingredients"),
            StructureError::MissingInstructions => f.write_str("recipe has no instructions"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRecipe {
    #[serde(default, alias = "name")]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    ingredients: Vec<RawIngredient>,
    #[serde(default)]
    instructions: TextOrList,
    #[serde(default)]
    notes: TextOrList,
    #[serde(default)]
    categories: TextOrList,
    #[serde(default)]
    setup: TextOrList,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawIngredient {
    Text(String),
    Structured {
        item: String,
        #[serde(default)]
        amount: Option<Value>,
    },
}

impl RawIngredient {
    fn line(&self) -> String {
        match self {
            RawIngredient::Text(text) => text.clone(),
            RawIngredient::Structured { item, amount } => {
                match amount.as_ref().and_then(scalar_text) {
                    Some(amount) => format!("{amount} {item}"),
                    None => item.clone(),
                }
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum TextOrList {
    #[default]
    Empty,
    Text(String),
    List(Vec<String>),
}

impl TextOrList {
    fn lines(&self) -> Vec<String> {
        let lines: Vec<&str> = match self {
            TextOrList::Empty => Vec::new(),
            TextOrList::Text(text) => vec![text.as_str()],
            TextOrList::List(items) => items.iter().map(String::as_str).collect(),
        };
        lines
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    /// Comma separated when given as one string.
    fn items(&self) -> Vec<String> {
        match self {
            TextOrList::Text(text) => text
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => self.lines(),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Build a recipe from `value`, normalizing every ingredient to its name.
///
/// Ingredients whose name normalizes to nothing are dropped. Fails when no
/// ingredient survives or the instructions are empty; the title may be empty.
pub fn recipe_from_value(value: &Value) -> Result<ParsedRecipe, StructureError> {
    let raw = RawRecipe::deserialize(value).map_err(|e| StructureError::Shape(e.to_string()))?;

    let ingredients: Vec<String> = raw
        .ingredients
        .iter()
        .map(|ingredient| ingredient_name(&ingredient.line()))
        .filter(|name| !name.is_empty())
        .collect();
    if ingredients.is_empty() {
        return Err(StructureError::MissingIngredients);
    }

    let instructions = raw.instructions.lines().join("\n");
    if instructions.is_empty() {
        return Err(StructureError::MissingInstructions);
    }

    Ok(ParsedRecipe {
        title: raw.title.trim().to_string(),
        description: raw.description.trim().to_string(),
        ingredients,
        instructions,
        notes: raw.notes.lines().join("\n"),
        categories: raw.categories.items(),
        setup: raw.setup.lines(),
    })
}

/// Like [`recipe_from_value`], additionally requiring a title.
pub fn titled_recipe_from_value(value: &Value) -> Result<ParsedRecipe, StructureError> {
    let recipe = recipe_from_value(value)?;
    if recipe.title.is_empty() {
        return Err(StructureError::MissingTitle);
    }
    Ok(recipe)
}
