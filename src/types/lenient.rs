// src/types/lenient.rs
//! Per-field coercions for Cassidy payloads.
//!
//! Upstream workflow versions disagree on field types (`start_year` may be `2019`,
//! `"2019"`, `""` or missing). Each helper here accepts every shape seen so far
//! and turns anything unusable into `None` instead of failing the whole record.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Integer from a number, numeric string (`"1,234"`, `"500+"`), or nothing.
pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_i64))
}

/// Same as [`opt_i64`] but only keeps values in `1..=12`.
pub fn opt_month<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_month))
}

/// Year from a number or string; zero and empty values become `None`.
pub fn opt_year<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_year))
}

/// String from a string or a number; blank strings become `None`.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_string))
}

/// List of strings from an array, a comma-separated string, or nothing.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(value_list).unwrap_or_default())
}

/// Vec that tolerates `null` and a JSON-encoded string in place of an array.
pub fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    use serde::de;
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(ref s)) if s.trim().is_empty() => Ok(Vec::new()),
        Some(Value::String(ref s)) => serde_json::from_str(s).map_err(de::Error::custom),
        Some(value @ Value::Array(_)) => serde_json::from_value(value).map_err(de::Error::custom),
        Some(_) => Err(de::Error::custom("expected an array or JSON string")),
    }
}

pub fn value_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => parse_count(s),
        _ => None,
    }
}

pub fn value_year(value: &Value) -> Option<i64> {
    value_i64(value).filter(|y| *y > 0)
}

pub fn value_month(value: &Value) -> Option<i64> {
    value_i64(value).filter(|m| (1..=12).contains(m))
}

pub fn value_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn value_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(map) => map.get("name").and_then(value_string),
                other => value_string(other),
            })
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

pub fn value_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Parses strings like `"2019"`, `"1,234"`, `"500+"` or `" 12 "`.
pub fn parse_count(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('+')
        .chars()
        .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<i64>()
        .ok()
        .or_else(|| {
            cleaned
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| f.round() as i64)
        })
}

/// Field lookup over a raw JSON object, trying several historical key names.
///
/// The first key whose value coerces successfully wins, so a payload carrying
/// both `company` and `company_name` never fails on the duplicate.
#[derive(Clone, Copy)]
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    pub fn from_value(value: &'a Value) -> Option<Self> {
        value.as_object().map(Self::new)
    }

    fn first<T>(&self, keys: &[&str], coerce: impl Fn(&Value) -> Option<T>) -> Option<T> {
        keys.iter()
            .filter_map(|key| self.map.get(*key))
            .find_map(coerce)
    }

    pub fn string(&self, keys: &[&str]) -> Option<String> {
        self.first(keys, value_string)
    }

    pub fn int(&self, keys: &[&str]) -> Option<i64> {
        self.first(keys, value_i64)
    }

    pub fn year(&self, keys: &[&str]) -> Option<i64> {
        self.first(keys, value_year)
    }

    pub fn month(&self, keys: &[&str]) -> Option<i64> {
        self.first(keys, value_month)
    }

    pub fn bool(&self, keys: &[&str]) -> Option<bool> {
        self.first(keys, value_bool)
    }

    pub fn list(&self, keys: &[&str]) -> Vec<String> {
        self.first(keys, |v| {
            let items = value_list(v);
            (!items.is_empty()).then_some(items)
        })
        .unwrap_or_default()
    }

    /// Nested object, also accepting a JSON-encoded string.
    pub fn object(&self, keys: &[&str]) -> Option<Value> {
        self.first(keys, |v| match v {
            Value::Object(_) => Some(v.clone()),
            Value::String(s) => serde_json::from_str::<Value>(s)
                .ok()
                .filter(|parsed| parsed.is_object()),
            _ => None,
        })
    }

    /// Array of objects, also accepting a JSON-encoded string or a single object.
    pub fn objects(&self, keys: &[&str]) -> Vec<Value> {
        self.first(keys, |v| {
            let items: Vec<Value> = match v {
                Value::Array(items) => items.iter().filter(|i| i.is_object()).cloned().collect(),
                Value::Object(_) => vec![v.clone()],
                Value::String(s) => match serde_json::from_str::<Value>(s) {
                    Ok(Value::Array(items)) => {
                        items.into_iter().filter(|i| i.is_object()).collect()
                    }
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            };
            (!items.is_empty()).then_some(items)
        })
        .unwrap_or_default()
    }
}
