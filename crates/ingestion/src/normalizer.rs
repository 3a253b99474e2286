//! Event normalizer
//!
//! Turns one `RawRecord` into a canonical `Event`. Missing or malformed
//! fields degrade to defaults; only an unparseable `date_time` rejects
//! the record.

use chrono::{DateTime, Utc};
use contracts::{Event, EventType, RawRecord};
use serde_json::{Number, Value};
use tracing::debug;
use uuid::Uuid;

use crate::datetime::parse_event_time;
use crate::error::NormalizationError;

/// Normalize a raw record, stamping missing dates with the current time.
pub fn normalize(raw: &RawRecord) -> Result<Event, NormalizationError> {
    normalize_at(raw, Utc::now())
}

/// Normalize a raw record against a fixed clock reading.
pub fn normalize_at(raw: &RawRecord, now: DateTime<Utc>) -> Result<Event, NormalizationError> {
    Ok(Event {
        id: Uuid::new_v4(),
        event_type: event_type(raw),
        user_id: text_field(raw, "user_id").unwrap_or_else(generated_id),
        transaction_id: text_field(raw, "transaction_id").unwrap_or_else(generated_id),
        ad_type: text_field(raw, "ad_type"),
        date_time: date_time(raw, now)?,
        time_to_click: time_to_click(raw),
    })
}

fn generated_id() -> String {
    Uuid::new_v4().to_string()
}

fn event_type(raw: &RawRecord) -> EventType {
    raw.get("event_type")
        .and_then(Value::as_str)
        .and_then(|name| EventType::from_name(&name.trim().to_lowercase()))
        .unwrap_or(EventType::Undetected)
}

/// Canonical form of an identifier, as stored and routed on.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Lower-cased, trimmed text; `None` when absent, null, blank or not text-like.
fn text_field(raw: &RawRecord, key: &str) -> Option<String> {
    let text = match raw.get(key)? {
        Value::String(s) => normalize_key(s),
        Value::Number(n) => n.to_string(),
        Value::Null => return None,
        other => {
            debug!(field = key, value = %other, "ignoring non-text field value");
            return None;
        }
    };
    (!text.is_empty()).then_some(text)
}

fn date_time(raw: &RawRecord, now: DateTime<Utc>) -> Result<DateTime<Utc>, NormalizationError> {
    match raw.get("date_time") {
        None | Some(Value::Null) => Ok(now),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(now),
        Some(Value::String(s)) => {
            parse_event_time(s.trim()).ok_or_else(|| NormalizationError::unparseable_date(s.as_str()))
        }
        Some(other) => Err(NormalizationError::unparseable_date(other.to_string())),
    }
}

/// Passed through only when it is a non-zero number.
fn time_to_click(raw: &RawRecord) -> Option<Number> {
    match raw.get("time_to_click") {
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => Some(n.clone()),
        _ => None,
    }
}
