// src/web/compat.rs
//! Adds the legacy field names older API consumers still read.
//!
//! The core records only carry canonical names; aliases exist solely in responses.

use serde_json::{Map, Value};

use crate::types::Profile;

const PROFILE_ALIASES: &[(&str, &str)] = &[
    ("profile_id", "id"),
    ("name", "full_name"),
    ("url", "linkedin_url"),
    ("company", "current_company"),
    ("position", "job_title"),
    ("followers", "follower_count"),
    ("connections", "connection_count"),
];

const EXPERIENCE_ALIASES: &[(&str, &str)] = &[("position", "title"), ("company_name", "company")];

fn add_aliases(map: &mut Map<String, Value>, aliases: &[(&str, &str)]) {
    for (alias, canonical) in aliases {
        if let Some(value) = map.get(*canonical).cloned() {
            map.entry(alias.to_string()).or_insert(value);
        }
    }
}

/// Profile JSON with canonical fields plus legacy aliases.
pub fn profile_json(profile: &Profile) -> Value {
    let mut value = serde_json::to_value(profile).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        add_aliases(map, PROFILE_ALIASES);
        if let Some(Value::Array(experiences)) = map.get_mut("experiences") {
            for experience in experiences.iter_mut() {
                if let Value::Object(exp) = experience {
                    add_aliases(exp, EXPERIENCE_ALIASES);
                }
            }
        }
    }
    value
}
