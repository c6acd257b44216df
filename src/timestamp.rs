// src/timestamp.rs
//! Timestamp formatting with exactly six fractional-second digits.
//!
//! Every timestamp the service writes goes through [`format_micros`]. Reads go
//! through [`parse_lenient`], which also accepts the malformed variants found
//! in older rows (missing fraction, 7+ digits, `Z` or `+HHMM` offsets, space
//! separator) so a bad row never takes a request down.

use chrono::{DateTime, SubsecRound, Utc};
use regex::Regex;
use std::sync::OnceLock;

const FRACTION_DIGITS: usize = 6;

fn timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{4}-\d{2}-\d{2})[Tt ](\d{2}:\d{2}:\d{2})(?:\.(\d+))?\s*(Z|z|[+-]\d{2}(?::?\d{2})?)?$",
        )
        .expect("timestamp regex is valid")
    })
}

/// Current time truncated to microseconds, so it survives a storage round trip.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(FRACTION_DIGITS as u16)
}

/// Canonical storage form: `2024-05-01T12:00:00.123456+00:00`.
pub fn format_micros(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Rewrites a timestamp string so its fraction has exactly six digits.
///
/// Returns `None` when the value cannot be turned into a valid timestamp.
pub fn normalize_fraction(raw: &str) -> Option<String> {
    let caps = timestamp_regex().captures(raw.trim())?;
    let date = &caps[1];
    let time = &caps[2];

    let mut fraction: String = caps
        .get(3)
        .map(|m| m.as_str().chars().take(FRACTION_DIGITS).collect())
        .unwrap_or_default();
    while fraction.len() < FRACTION_DIGITS {
        fraction.push('0');
    }

    let offset = match caps.get(4).map(|m| m.as_str()) {
        None | Some("Z") | Some("z") => "+00:00".to_string(),
        Some(o) => normalize_offset(o),
    };

    let candidate = format!("{}T{}.{}{}", date, time, fraction, offset);
    DateTime::parse_from_rfc3339(&candidate).ok()?;
    Some(candidate)
}

fn normalize_offset(offset: &str) -> String {
    let (sign, digits) = offset.split_at(1);
    let digits: String = digits.chars().filter(|c| c.is_ascii_digit()).collect();
    let hours = &digits[..2];
    let minutes = if digits.len() >= 4 { &digits[2..4] } else { "00" };
    format!("{}{}:{}", sign, hours, minutes)
}

/// True when the string carries a fraction of exactly six digits.
pub fn has_six_digit_fraction(raw: &str) -> bool {
    timestamp_regex()
        .captures(raw.trim())
        .and_then(|caps| caps.get(3).map(|m| m.as_str().len() == FRACTION_DIGITS))
        .unwrap_or(false)
}

/// Parses any timestamp [`normalize_fraction`] can repair.
pub fn parse_lenient(raw: &str) -> Option<DateTime<Utc>> {
    let normalized = normalize_fraction(raw)?;
    DateTime::parse_from_rfc3339(&normalized)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Serde adapter writing six-digit fractions and reading leniently.
pub mod micros {
    use super::{format_micros, parse_lenient};
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_micros(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse_lenient(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}

/// Optional variant of [`micros`].
pub mod option_micros {
    use super::{format_micros, parse_lenient};
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => s.serialize_some(&format_micros(dt)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse_lenient(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw))),
        }
    }
}
