//! Event - the canonical, normalized record
//!
//! Produced by the ingestion normalizer, routed by the dispatcher and
//! persisted by exactly one shard backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Untyped record exactly as received from the transport.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Unique document key of an event.
pub type EventId = Uuid;

/// Kind of analytics event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Impression,
    Click,
    Completion,
    /// Missing or unrecognized type in the raw record
    #[serde(rename = "undetected event type")]
    Undetected,
}

impl EventType {
    /// Match an already lower-cased name against the known types.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "impression" => Some(Self::Impression),
            "click" => Some(Self::Click),
            "completion" => Some(Self::Completion),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Impression => "impression",
            Self::Click => "click",
            Self::Completion => "completion",
            Self::Undetected => "undetected event type",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical event, immutable once built.
///
/// Serialized as the stored document: the id goes under `_id` and
/// optional fields are left out entirely when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Generated once at normalization
    #[serde(rename = "_id")]
    pub id: EventId,

    pub event_type: EventType,

    /// Lower-cased, trimmed
    pub user_id: String,

    /// Lower-cased, trimmed; the sharding key
    pub transaction_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_type: Option<String>,

    /// UTC, stored with millisecond precision
    #[serde(with = "millis_rfc3339")]
    pub date_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_click: Option<serde_json::Number>,
}

mod millis_rfc3339 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(de::Error::custom)
    }
}
