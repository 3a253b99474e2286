//! `date_time` parsing
//!
//! The strict wire format is tried first since nearly every SDK sends it;
//! the lenient chain only runs on a miss.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc, Weekday};

/// ISO-8601 with fractional seconds and a literal `Z`, e.g. `2012-05-29T19:30:03.283Z`
pub const STRICT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Formats carrying an explicit offset
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Formats without offset, read as UTC
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y%m%dT%H%M%S",
    // asctime once the weekday is gone
    "%B %d %H:%M:%S %Y",
    "%B %d %Y %H:%M:%S",
    "%B %d, %Y %H:%M:%S",
    "%d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M",
];

/// Date-only formats, read as midnight UTC
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
];

/// Zone names that mean UTC when written as a separate word
const UTC_ZONE_NAMES: &[&str] = &["UTC", "GMT", "Z"];

/// Parse a trimmed, non-empty `date_time` string.
pub fn parse_event_time(value: &str) -> Option<DateTime<Utc>> {
    parse_strict(value).or_else(|| parse_lenient(value))
}

pub fn parse_strict(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, STRICT_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// General-purpose fallback accepting the common shapes clients send.
///
/// Offset-carrying forms are tried on the raw value. Everything else is
/// matched after [`simplify`] drops weekday and UTC zone words.
pub fn parse_lenient(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(value, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }

    let value = simplify(value);
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(&value, fmt).ok())
                .or_else(|| parse_compact_date(&value))
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Collapse whitespace, drop a leading weekday and any UTC zone word.
fn simplify(value: &str) -> String {
    let mut words: Vec<&str> = value
        .split_whitespace()
        .filter(|word| !UTC_ZONE_NAMES.iter().any(|z| word.eq_ignore_ascii_case(z)))
        .collect();

    let leading_weekday = words
        .first()
        .is_some_and(|word| word.trim_end_matches(',').parse::<Weekday>().is_ok());
    if leading_weekday {
        words.remove(0);
    }

    words.join(" ")
}

/// `YYYYMMDD`
fn parse_compact_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y%m%d").ok()
}
