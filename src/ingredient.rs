//! Ingredient line normalization.
//!
//! Turns a raw line such as `"2 small yellow squash, diced"` into a
//! [`ParsedIngredient`] whose `name` is the bare ingredient (`"yellow squash"`).

use std::sync::LazyLock;

use regex::Regex;

use crate::model::ParsedIngredient;

/// Volume, mass and count units recognised after a quantity (singular and plural).
pub const UNITS: &[&str] = &[
    // Volume
    "fluid ounces",
    "fluid ounce",
    "fl oz",
    "tablespoons",
    "tablespoon",
    "teaspoons",
    "teaspoon",
    "tbsp",
    "tbs",
    "tsp",
    "cups",
    "cup",
    "c",
    "pints",
    "pint",
    "pt",
    "quarts",
    "quart",
    "qt",
    "gallons",
    "gallon",
    "gal",
    "milliliters",
    "milliliter",
    "millilitres",
    "millilitre",
    "ml",
    "liters",
    "liter",
    "litres",
    "litre",
    "l",
    // Mass
    "ounces",
    "ounce",
    "oz",
    "pounds",
    "pound",
    "lbs",
    "lb",
    "grams",
    "gram",
    "g",
    "kilograms",
    "kilogram",
    "kg",
    "milligrams",
    "milligram",
    "mg",
    // Count
    "cloves",
    "clove",
    "pinches",
    "pinch",
    "dashes",
    "dash",
    "slices",
    "slice",
    "pieces",
    "piece",
    "cans",
    "can",
    "packages",
    "package",
    "sticks",
    "stick",
    "bunches",
    "bunch",
    "sprigs",
    "sprig",
    "heads",
    "head",
    "handfuls",
    "handful",
    "jars",
    "jar",
    "bags",
    "bag",
    "boxes",
    "box",
];

/// Size adjectives that may follow the quantity or unit.
pub const SIZES: &[&str] = &[
    "extra-large",
    "extra large",
    "small",
    "medium",
    "large",
    "jumbo",
];

/// Words dropped when they lead the remaining ingredient text.
pub const FILLER_WORDS: &[&str] = &["of", "about", "approximately"];

const FRACTION_CHARS: &str = "½⅓⅔¼¾⅛⅜⅝⅞";

/// Longest alternatives first so `tablespoons` wins over `tablespoon` and `t...`.
fn alternation(words: &[&str]) -> String {
    let mut sorted = words.to_vec();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()));
    sorted
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

fn quantity_pattern() -> String {
    let single = format!(
        r"(?:\d+\s+\d+/\d+|\d+/\d+|\d+\s*[{f}]|[{f}]|\d+(?:\.\d+)?)",
        f = FRACTION_CHARS
    );
    format!(r"{single}(?:\s*(?:-|–|to)\s*{single})?")
}

static INGREDIENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"(?i)^(?:(?P<quantity>{qty})\s*)?(?:(?P<lead_size>{sizes})\s+)?(?:(?P<unit>{units})\.?(?:\s+|$))?(?:(?P<size>{sizes})(?:\s+|$))?(?P<rest>.*)$",
        qty = quantity_pattern(),
        units = alternation(UNITS),
        sizes = alternation(SIZES),
    );
    Regex::new(&pattern).expect("Invalid ingredient regex")
});

static UNIT_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation(UNITS))).expect("Invalid unit regex")
});

static FILLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?:(?:{})(?:\s+|$))+",
        alternation(FILLER_WORDS)
    ))
    .expect("Invalid filler regex")
});

static PARENTHESES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("Invalid parentheses regex"));

/// Decompose an ingredient line.
///
/// Never fails: missing parts are `None`, and a line with nothing but
/// measurements produces an empty `name`.
pub fn normalize_ingredient(raw: &str) -> ParsedIngredient {
    let cleaned = clean_line(raw);
    let cleaned = strip_fillers(&cleaned);

    let mut parsed = ParsedIngredient {
        original: raw.to_string(),
        ..Default::default()
    };

    let Some(caps) = INGREDIENT_RE.captures(cleaned) else {
        parsed.name = cleaned.to_string();
        return parsed;
    };

    parsed.quantity = caps.name("quantity").map(|m| m.as_str().trim().to_string());
    parsed.unit = caps.name("unit").map(|m| m.as_str().to_string());
    // "1 large head garlic" puts the size ahead of the unit
    parsed.size = caps
        .name("size")
        .or_else(|| caps.name("lead_size"))
        .map(|m| m.as_str().to_string());

    let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or_default();
    parsed.name = collapse_whitespace(strip_fillers(rest));
    parsed
}

/// Just the ingredient name; empty when the line should be dropped.
pub fn ingredient_name(raw: &str) -> String {
    normalize_ingredient(raw).name
}

/// True when `text` mentions one of [`UNITS`] as a whole word.
pub fn contains_unit(text: &str) -> bool {
    UNIT_WORD_RE.is_match(text)
}

/// Drop parenthesized asides and the trailing comma clause.
fn clean_line(raw: &str) -> String {
    let without_parens = PARENTHESES_RE.replace_all(raw, " ");
    let head = without_parens.split(',').next().unwrap_or_default();
    collapse_whitespace(head)
}

fn strip_fillers(text: &str) -> &str {
    match FILLER_RE.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_size_and_prep_clause() {
        let parsed = normalize_ingredient("2 small yellow squash, diced");
        assert_eq!(
            parsed,
            ParsedIngredient {
                name: "yellow squash".to_string(),
                quantity: Some("2".to_string()),
                unit: None,
                size: Some("small".to_string()),
                original: "2 small yellow squash, diced".to_string(),
            }
        );
    }

    #[test]
    fn test_quantity_and_unit() {
        let parsed = normalize_ingredient("1 cup broth");
        assert_eq!(parsed.name, "broth");
        assert_eq!(parsed.quantity.as_deref(), Some("1"));
        assert_eq!(parsed.unit.as_deref(), Some("cup"));
        assert!(parsed.size.is_none());
    }

    #[test]
    fn test_fractions_and_mixed_numbers() {
        assert_eq!(normalize_ingredient("1/2 tsp salt").quantity.as_deref(), Some("1/2"));
        let mixed = normalize_ingredient("1 1/2 cups sugar");
        assert_eq!(mixed.quantity.as_deref(), Some("1 1/2"));
        assert_eq!(mixed.unit.as_deref(), Some("cups"));
        assert_eq!(mixed.name, "sugar");
        assert_eq!(normalize_ingredient("½ cup milk").name, "milk");
    }

    #[test]
    fn test_decimal_and_range() {
        let decimal = normalize_ingredient("0.5 kg potatoes");
        assert_eq!(decimal.quantity.as_deref(), Some("0.5"));
        assert_eq!(decimal.unit.as_deref(), Some("kg"));

        let range = normalize_ingredient("2-3 large eggs");
        assert_eq!(range.quantity.as_deref(), Some("2-3"));
        assert_eq!(range.size.as_deref(), Some("large"));
        assert_eq!(range.name, "eggs");
    }

    #[test]
    fn test_unit_is_case_insensitive_and_attached() {
        let parsed = normalize_ingredient("2 Tablespoons olive oil");
        assert_eq!(parsed.unit.as_deref(), Some("Tablespoons"));
        assert_eq!(parsed.name, "olive oil");

        let attached = normalize_ingredient("500g flour");
        assert_eq!(attached.quantity.as_deref(), Some("500"));
        assert_eq!(attached.unit.as_deref(), Some("g"));
        assert_eq!(attached.name, "flour");
    }

    #[test]
    fn test_fillers_and_parentheses() {
        assert_eq!(normalize_ingredient("2 cups of flour (sifted)").name, "flour");
        assert_eq!(normalize_ingredient("about 3 cloves garlic").name, "garlic");
        // Filler words inside a name are kept.
        assert_eq!(normalize_ingredient("1 can cream of mushroom soup").name, "cream of mushroom soup");
    }

    #[test]
    fn test_plain_name_is_unchanged() {
        let parsed = normalize_ingredient("fresh basil");
        assert_eq!(parsed.name, "fresh basil");
        assert!(parsed.quantity.is_none());
        assert!(parsed.unit.is_none());
        assert!(parsed.size.is_none());
    }

    #[test]
    fn test_unit_prefix_does_not_eat_words() {
        assert_eq!(normalize_ingredient("garlic powder").name, "garlic powder");
        assert_eq!(normalize_ingredient("2 limes").name, "limes");
        assert_eq!(normalize_ingredient("1 canola oil").name, "canola oil");
    }

    #[test]
    fn test_measurement_only_line_yields_empty_name() {
        assert_eq!(normalize_ingredient("2 cups of").name, "");
        assert_eq!(normalize_ingredient("   ").name, "");
    }

    #[test]
    fn test_size_before_unit() {
        let parsed = normalize_ingredient("1 large head garlic");
        assert_eq!(parsed.name, "garlic");
        assert_eq!(parsed.quantity.as_deref(), Some("1"));
        assert_eq!(parsed.unit.as_deref(), Some("head"));
        assert_eq!(parsed.size.as_deref(), Some("large"));

        let parsed = normalize_ingredient("2 large cans tomatoes");
        assert_eq!(parsed.name, "tomatoes");
        assert_eq!(parsed.unit.as_deref(), Some("cans"));
        assert_eq!(parsed.size.as_deref(), Some("large"));
    }

    #[test]
    fn test_idempotent_on_name() {
        for line in [
            "2 small yellow squash, diced",
            "1 cup broth",
            "3 large eggs (room temperature)",
            "about 1 lb ground beef",
            "1 large head garlic",
            "2 large cans tomatoes",
        ] {
            let name = ingredient_name(line);
            assert_eq!(ingredient_name(&name), name, "not idempotent for {line:?}");
        }
    }

    #[test]
    fn test_contains_unit() {
        assert!(contains_unit("2 cups flour"));
        assert!(contains_unit("a pinch of salt"));
        assert!(!contains_unit("garlic"));
        assert!(!contains_unit("Mix well"));
    }
}
