//! Locating JSON objects inside free text (chat replies, pasted markdown).

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static FENCED_JSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```json\s*(.*?)```").expect("Invalid fenced block regex"));

/// Body of the first ```` ```json ```` fenced block, if any.
pub fn find_fenced_json(text: &str) -> Option<&str> {
    FENCED_JSON_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// First balanced `{...}` span that parses as a JSON object.
///
/// Spans are tried in order of their opening brace. A span that fails to
/// parse is discarded and scanning resumes at the next `{`, so the first
/// valid span wins even when a longer one follows. Braces inside JSON
/// strings do not count towards depth.
pub fn extract_json_object(text: &str) -> Option<&str> {
    // Closing brace for every opening brace seen by an earlier scan.
    let mut closing: HashMap<usize, Option<usize>> = HashMap::new();

    for (start, _) in text.match_indices('{') {
        if !closing.contains_key(&start) {
            closing.extend(pair_braces(text, start));
        }
        let Some(Some(end)) = closing.get(&start).copied() else {
            continue;
        };

        let candidate = &text[start..=end];
        if matches!(serde_json::from_str::<Value>(candidate), Ok(Value::Object(_))) {
            return Some(candidate);
        }
    }

    None
}

/// Parsed form of [`extract_json_object`].
pub fn extract_json_value(text: &str) -> Option<Value> {
    extract_json_object(text).and_then(|span| serde_json::from_str(span).ok())
}

/// Pairs each `{` outside a string, from `start` on, with its closing `}`.
///
/// Stops once the brace at `start` closes. Braces still open at the end of
/// the text pair with `None`, as they would when scanned on their own.
fn pair_braces(text: &str, start: usize) -> Vec<(usize, Option<usize>)> {
    let mut pairs: Vec<(usize, Option<usize>)> = Vec::new();
    let mut open = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => {
                open.push(pairs.len());
                pairs.push((start + idx, None));
            }
            '}' => {
                if let Some(slot) = open.pop() {
                    pairs[slot].1 = Some(start + idx);
                }
                if open.is_empty() {
                    break;
                }
            }
            _ => {}
        }
    }

    pairs
}
