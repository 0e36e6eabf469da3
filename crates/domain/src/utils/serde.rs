//! Serialization utilities for API timestamps
//!
//! The client decodes date fields as seconds since the Unix epoch. Servers
//! that emit RFC 3339 strings instead are accepted too, so the same models
//! decode against both shapes.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

/// Serde serialization result type
type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawTimestamp {
    fn into_datetime(self) -> Result<DateTime<Utc>, String> {
        match self {
            Self::Integer(secs) => {
                Utc.timestamp_opt(secs, 0).single().ok_or_else(|| format!("timestamp {secs} out of range"))
            }
            Self::Float(secs) => {
                let whole = secs.trunc();
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let nanos = ((secs - whole) * 1e9).round() as u32;
                #[allow(clippy::cast_possible_truncation)]
                let whole_secs = whole as i64;
                Utc.timestamp_opt(whole_secs, nanos)
                    .single()
                    .ok_or_else(|| format!("timestamp {secs} out of range"))
            }
            Self::Text(text) => match text.parse::<i64>() {
                Ok(secs) => Self::Integer(secs).into_datetime(),
                Err(_) => DateTime::parse_from_rfc3339(&text)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| format!("invalid timestamp '{text}': {e}")),
            },
        }
    }
}

/// `DateTime<Utc>` as seconds since the Unix epoch.
///
/// # Usage
/// ```rust
/// use chrono::{DateTime, Utc};
/// use serde::Deserialize;
/// use starlight_domain::utils::serde::epoch_seconds;
///
/// #[derive(Deserialize)]
/// struct Example {
///     #[serde(with = "epoch_seconds")]
///     created_at: DateTime<Utc>,
/// }
///
/// let example: Example = serde_json::from_str(r#"{"created_at": 1700000000}"#).unwrap();
/// assert_eq!(example.created_at.timestamp(), 1_700_000_000);
/// ```
pub mod epoch_seconds {
    use super::{DateTime, Deserialize, Deserializer, Error, RawTimestamp, SerializeResult, Serializer, Utc};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        serializer.serialize_i64(value.timestamp())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawTimestamp::deserialize(deserializer)?.into_datetime().map_err(D::Error::custom)
    }
}

/// Optional variant of [`epoch_seconds`]; `null` and missing fields decode to
/// `None` (pair with `#[serde(default)]`).
pub mod epoch_seconds_option {
    use super::{DateTime, Deserialize, Deserializer, Error, RawTimestamp, SerializeResult, Serializer, Utc};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_some(&dt.timestamp()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<RawTimestamp>::deserialize(deserializer)?
            .map(RawTimestamp::into_datetime)
            .transpose()
            .map_err(D::Error::custom)
    }
}
