//! Lenient decoding of server timestamps.
//!
//! The backend stores naive UTC datetimes and echoes them back without an
//! offset (`2025-03-01T10:00:00.123000`). Both that form and RFC 3339 are
//! accepted; naive values are read as UTC. Serialization is left to chrono.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer};

/// Parse an RFC 3339 or offset-less ISO-8601 timestamp.
#[must_use]
pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc()))
}

/// `deserialize_with` target for `DateTime<Utc>` fields.
pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp `{raw}`")))
}

/// `deserialize_with` target for `Option<DateTime<Utc>>` fields.
///
/// Pair with `#[serde(default)]` so a missing field stays `None`.
pub(crate) mod option {
    use super::{de, parse, DateTime, Deserialize, Deserializer, Utc};

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp `{raw}`"))),
        }
    }
}
