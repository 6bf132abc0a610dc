//! Human friendly [`Duration`] (de)serialization.
//!
//! Accepts plain integers (seconds) or strings with a `ms`, `s` or `m` suffix, e.g. `500ms` or
//! `2m`. Serializes whole seconds as an integer and anything else as milliseconds.

use serde::{Deserialize, Deserializer, Serializer, de::Error};
use std::time::Duration;

/// Serializes a [`Duration`] as seconds, or as a `<n>ms` string for sub-second precision.
pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if duration.subsec_nanos() == 0 {
        serializer.serialize_u64(duration.as_secs())
    } else {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }
}

/// Deserializes seconds or a suffixed duration string into a [`Duration`].
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse(&text).map_err(D::Error::custom),
    }
}

/// Parses `120`, `120s`, `500ms` or `2m`.
pub fn parse(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    let (digits, unit) = match text.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => text.split_at(idx),
        None => (text, "s"),
    };
    let value: u64 = digits.parse().map_err(|_| format!("invalid duration `{text}`"))?;

    match unit.trim() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        other => Err(format!("unknown duration unit `{other}` in `{text}`")),
    }
}
