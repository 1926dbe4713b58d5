/// System prompt asking for a single recipe JSON object, kept in `prompt.txt`.
pub const RECIPE_EXTRACTION_PROMPT: &str = include_str!("prompt.txt");

/// Build the system prompt, optionally annotating the recipe language.
pub fn build_extraction_prompt(language: Option<&str>) -> String {
    match language.map(str::trim).filter(|lang| !lang.is_empty()) {
        Some(lang) => format!(
            "{}\n\nThe recipe text is written in {lang}. Keep titles, ingredients and steps in {lang}.",
            RECIPE_EXTRACTION_PROMPT
        ),
        None => RECIPE_EXTRACTION_PROMPT.to_string(),
    }
}
