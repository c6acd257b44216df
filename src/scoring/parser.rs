// src/scoring/parser.rs
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::sync::OnceLock;

use crate::utils::extract_json_object;

fn leading_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(-?\d+(?:\.\d+)?)").expect("score regex is valid"))
}

fn prose_score_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bscore\b\s*(?:of|is|:|=)?\s*(\d+(?:\.\d+)?)").expect("prose score regex is valid")
    })
}

/// Turns LLM output into the stored job result.
///
/// A JSON object found in the text becomes the result; otherwise the text is kept
/// under `analysis`. `parsed` records which path was taken.
pub fn parse_result(text: &str) -> Map<String, Value> {
    match extract_json_object(text) {
        Some(Value::Object(mut map)) => {
            normalize_score(&mut map);
            map.insert("parsed".to_string(), Value::Bool(true));
            map
        }
        _ => {
            let mut map = Map::new();
            map.insert("analysis".to_string(), Value::String(text.trim().to_string()));
            if let Some(score) = prose_score_regex()
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| score_number(m.as_str()))
            {
                map.insert("score".to_string(), score);
            }
            map.insert("parsed".to_string(), Value::Bool(false));
            map
        }
    }
}

/// `"85"`, `"8.5/10"` and `"85%"` become numbers; the original string moves to `score_raw`.
fn normalize_score(map: &mut Map<String, Value>) {
    let Some(Value::String(raw)) = map.get("score") else {
        return;
    };
    let raw = raw.clone();
    if let Some(number) = leading_number_regex()
        .captures(&raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| score_number(m.as_str()))
    {
        map.insert("score".to_string(), number);
        map.insert("score_raw".to_string(), Value::String(raw));
    }
}

fn score_number(raw: &str) -> Option<Value> {
    if let Ok(int) = raw.parse::<i64>() {
        return Some(Value::Number(int.into()));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plain_json() {
        let result = parse_result(r#"{"score": 82, "summary": "Strong backend profile"}"#);
        assert_eq!(result["score"], 82);
        assert_eq!(result["parsed"], true);
        assert!(!result.contains_key("score_raw"));
    }

    #[test]
    fn test_parse_fenced_json_with_string_score() {
        let text = "Sure!\n```json\n{\"score\": \"8.5/10\", \"strengths\": [\"Rust\"]}\n```";
        let result = parse_result(text);
        assert_eq!(result["score"], json!(8.5));
        assert_eq!(result["score_raw"], "8.5/10");
        assert_eq!(result["strengths"], json!(["Rust"]));
    }

    #[test]
    fn test_percentage_and_unparseable_scores() {
        let result = parse_result(r#"{"score": "85%"}"#);
        assert_eq!(result["score"], 85);
        assert_eq!(result["score_raw"], "85%");

        let result = parse_result(r#"{"score": "high"}"#);
        assert_eq!(result["score"], "high");
        assert!(!result.contains_key("score_raw"));
    }

    #[test]
    fn test_fallback_keeps_text() {
        let result = parse_result("The candidate looks solid. Overall score: 74.");
        assert_eq!(result["parsed"], false);
        assert_eq!(result["score"], 74);
        assert_eq!(result["analysis"], "The candidate looks solid. Overall score: 74.");

        let result = parse_result("No numbers here");
        assert!(!result.contains_key("score"));
    }
}
