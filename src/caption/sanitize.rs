// Defensive cleanup of model output: the prompt asks for clean text, this makes sure of it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

static HASHTAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#[\p{L}\p{N}_]+").unwrap());

static EMOJI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x{1F000}-\x{1FAFF}\x{2600}-\x{27BF}\x{2B00}-\x{2BFF}\x{FE0F}\x{200D}\x{1F1E6}-\x{1F1FF}]")
        .unwrap()
});

static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const QUOTE_CHARS: &[char] = &['"', '\'', '`', '«', '»', '“', '”', '„', '‘', '’'];

// Strip hashtags, emoji, surrounding quotes and redundant whitespace from one caption.
pub fn clean_caption(raw: &str) -> String {
    let no_tags = HASHTAG_RE.replace_all(raw, "");
    let no_emoji = EMOJI_RE.replace_all(&no_tags, "");
    let collapsed = SPACES_RE.replace_all(&no_emoji, " ");
    collapsed
        .trim()
        .trim_matches(QUOTE_CHARS)
        .trim()
        .to_string()
}

/// Normalise a JSON array of captions.
///
/// In order: drop non-strings, clean, drop empties, de-duplicate
/// case-insensitively keeping the first occurrence, truncate to `limit`.
pub fn normalize_captions(items: &[Value], limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(Value::as_str)
        .map(clean_caption)
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(c.to_lowercase()))
        .take(limit)
        .collect()
}

/// Parse model text as a JSON object, tolerating code fences and leading/trailing prose.
pub fn parse_json_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    let trimmed = text.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Some(map);
    }

    // Fall back to the outermost {...} span.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_caption_strips_decorations() {
        assert_eq!(clean_caption("  \"Salt in the air\"  "), "Salt in the air");
        assert_eq!(clean_caption("«Quiet Sunday» #mood #sea"), "Quiet Sunday");
        assert_eq!(clean_caption("Golden hour 🌅 again"), "Golden hour again");
        assert_eq!(clean_caption("“ ”"), "");
    }

    #[test]
    fn duplicates_are_removed_case_insensitively() {
        let items = vec![json!("Hello there"), json!("hello there "), json!("Other")];
        assert_eq!(normalize_captions(&items, 10), vec!["Hello there", "Other"]);
    }

    #[test]
    fn non_strings_and_empties_are_dropped_then_truncated() {
        let items = vec![
            json!(1),
            json!(""),
            json!("  "),
            json!(null),
            json!("a"),
            json!("b"),
            json!("c"),
        ];
        assert_eq!(normalize_captions(&items, 2), vec!["a", "b"]);
    }

    #[test]
    fn parse_json_object_tolerates_fences() {
        let text = "Sure!\n```json\n{\"captions\": [\"x\"]}\n```";
        let map = parse_json_object(text).unwrap();
        assert!(map.contains_key("captions"));
    }

    #[test]
    fn parse_json_object_rejects_arrays_and_garbage() {
        assert!(parse_json_object("[1,2,3]").is_none());
        assert!(parse_json_object("no json here").is_none());
        assert!(parse_json_object("} oops {").is_none());
    }
}
