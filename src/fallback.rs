//! Line-oriented recipe recovery for text with no usable JSON.
//!
//! Lines are bucketed into title, description, ingredients and instructions
//! using keyword-bearing header lines and list formatting. Nothing is
//! invented: if no ingredients or no instructions are found the parse fails.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::ingredient::contains_unit;
use crate::model::ParsedRecipe;

/// Header keywords per section, matched as lowercase substrings.
pub const SECTION_KEYWORDS: &[(Section, &[&str])] = &[
    (Section::Ingredients, &["ingredient"]),
    (
        Section::Instructions,
        &["instruction", "step", "method", "cooking", "directions"],
    ),
    (Section::Description, &["description", "about"]),
];

/// Adjectives that mark a free-standing line as descriptive prose.
pub const SENSORY_WORDS: &[&str] = &[
    "delicious", "flavor", "taste", "perfect", "tender", "crispy", "savory", "sweet", "spicy",
    "rich", "fresh",
];

/// Verbs that mark an unformatted line as an instruction step.
pub const COOKING_VERBS: &[&str] = &["heat", "add", "cook", "mix", "stir", "bake"];

const TITLE_PREFIXES: &[&str] = &["recipe:", "title:"];

/// Longest line still treated as a section header.
const MAX_HEADER_LEN: usize = 40;
/// Shortest line kept inside an explicit description section.
const MIN_DESCRIPTION_LEN: usize = 10;

static LIST_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*]\s+|•\s*|\d+[.)]\s*)").expect("Invalid list marker regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    None,
    Description,
    Ingredients,
    Instructions,
}

/// Why the fallback parser gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSections {
    pub ingredients: usize,
    pub instructions: usize,
}

impl std::fmt::Display for MissingSections {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "found {} ingredient lines and {} instruction lines",
            self.ingredients, self.instructions
        )
    }
}

#[derive(Default)]
struct Collected {
    title: String,
    description: Vec<String>,
    ingredients: Vec<String>,
    instructions: Vec<String>,
}

/// Best-effort section parse of free text.
pub fn try_pattern_parsing(content: &str) -> Result<ParsedRecipe, MissingSections> {
    let mut section = Section::None;
    let mut section_seen = false;
    let mut first_line = true;
    let mut out = Collected::default();

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lower = line.to_lowercase();
        let is_first = std::mem::take(&mut first_line);

        if let Some(next) = section_header(line, &lower) {
            debug!("Fallback parser entering {:?} at {:?}", next, line);
            section = next;
            section_seen = true;
            continue;
        }

        if !section_seen {
            if let Some(title) = prefixed_title(line, &lower) {
                out.title = title.to_string();
                continue;
            }
            if is_first && out.title.is_empty() && looks_like_title(line) {
                out.title = line.to_string();
                continue;
            }
        }

        match section {
            Section::Ingredients => {
                if is_list_item(line) || contains_unit(&lower) {
                    out.ingredients.push(strip_list_marker(line).to_string());
                }
            }
            Section::Instructions => {
                if is_list_item(line) || contains_any(&lower, COOKING_VERBS) {
                    out.instructions.push(strip_list_marker(line).to_string());
                }
            }
            Section::Description => {
                if line.chars().count() > MIN_DESCRIPTION_LEN {
                    out.description.push(line.to_string());
                }
            }
            Section::None => {
                if out.ingredients.is_empty() && looks_like_description(line, &lower) {
                    out.description.push(line.to_string());
                }
            }
        }
    }

    if out.ingredients.is_empty() || out.instructions.is_empty() {
        return Err(MissingSections {
            ingredients: out.ingredients.len(),
            instructions: out.instructions.len(),
        });
    }

    Ok(ParsedRecipe {
        title: out.title,
        description: out.description.join(" "),
        ingredients: out.ingredients,
        instructions: out.instructions.join("\n"),
        ..Default::default()
    })
}

/// A short, unformatted line naming a section switches to that section.
fn section_header(line: &str, lower: &str) -> Option<Section> {
    if line.chars().count() > MAX_HEADER_LEN
        || is_list_item(line)
        || line.starts_with(|c: char| c.is_ascii_digit())
    {
        return None;
    }
    SECTION_KEYWORDS
        .iter()
        .find(|(_, keywords)| contains_any(lower, keywords))
        .map(|(section, _)| *section)
}

fn prefixed_title<'a>(line: &'a str, lower: &str) -> Option<&'a str> {
    TITLE_PREFIXES
        .iter()
        .find(|prefix| lower.starts_with(**prefix))
        .and_then(|prefix| line.get(prefix.len()..))
        .map(str::trim)
        .filter(|title| !title.is_empty())
}

fn looks_like_title(line: &str) -> bool {
    let len = line.chars().count();
    (5..100).contains(&len) && !line.contains(':')
}

fn looks_like_description(line: &str, lower: &str) -> bool {
    let len = line.chars().count();
    (20..200).contains(&len)
        && !line.contains(':')
        && !is_list_item(line)
        && contains_any(lower, SENSORY_WORDS)
}

fn is_list_item(line: &str) -> bool {
    LIST_MARKER_RE.is_match(line)
}

fn strip_list_marker(line: &str) -> &str {
    match LIST_MARKER_RE.find(line) {
        Some(m) => line[m.end()..].trim(),
        None => line,
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
