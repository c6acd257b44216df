// src/utils.rs
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn fenced_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("fenced block regex is valid")
    })
}

/// Finds a JSON object in free text.
///
/// Tries, in order: the whole text, each fenced ```json block, and the span
/// between the first `{` and the last `}`.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Some(value) = parse_object(trimmed) {
        return Some(value);
    }

    for caps in fenced_block_regex().captures_iter(trimmed) {
        if let Some(value) = caps.get(1).and_then(|m| parse_object(m.as_str().trim())) {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&trimmed[start..=end])
}

fn parse_object(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(Value::is_object)
}

/// Cuts a string to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push_str("...");
    out
}

/// Joins a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_object() {
        let value = extract_json_object(r#" {"score": 7} "#).unwrap();
        assert_eq!(value["score"], 7);
    }

    #[test]
    fn test_extract_fenced_object() {
        let text = "Here you go:\n```json\n{\"score\": 85, \"summary\": \"solid\"}\n```\nThanks";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["summary"], "solid");
    }

    #[test]
    fn test_extract_embedded_object() {
        let text = "The result is {\"score\": 3, \"notes\": {\"a\": 1}} as requested.";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["notes"]["a"], 1);
    }

    #[test]
    fn test_extract_rejects_non_objects() {
        assert!(extract_json_object("[1, 2, 3]").is_none());
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("} backwards {").is_none());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("héllo world", 5), "héllo...");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://x/", "/api/v1"), "http://x/api/v1");
        assert_eq!(join_url("http://x", "api"), "http://x/api");
    }
}
