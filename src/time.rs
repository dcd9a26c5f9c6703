//! Millisecond timestamps
//!
//! Timestamps are Unix milliseconds everywhere. Older clients submit
//! RFC 3339 strings instead, so the serde helpers accept both shapes on
//! input and always write integers back out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Current time in Unix milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Float(f64),
    Text(String),
}

impl RawTimestamp {
    fn into_millis(self) -> Result<i64, String> {
        match self {
            Self::Millis(ms) => Ok(ms),
            Self::Float(ms) => Ok(ms.round() as i64),
            Self::Text(text) => parse_millis(&text),
        }
    }
}

/// Parse a timestamp given either as decimal milliseconds or RFC 3339
pub fn parse_millis(text: &str) -> Result<i64, String> {
    let trimmed = text.trim();
    if let Ok(ms) = trimmed.parse::<i64>() {
        return Ok(ms);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| format!("invalid timestamp '{}': {}", text, e))
}

/// `deserialize_with` helper for required timestamps
pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    RawTimestamp::deserialize(deserializer)?
        .into_millis()
        .map_err(serde::de::Error::custom)
}

/// `deserialize_with` helper for optional timestamps
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawTimestamp>::deserialize(deserializer)?
        .map(RawTimestamp::into_millis)
        .transpose()
        .map_err(serde::de::Error::custom)
}
