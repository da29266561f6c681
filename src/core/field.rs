//! Field value types and query-string coercion

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

/// Declared kind of a catalog attribute
///
/// Query-string values arrive as text; the kind decides how they are
/// coerced before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Timestamp,
}

/// A polymorphic field value used in filter clauses
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Float(f64),
    DateTime(DateTime<Utc>),
}

impl FieldValue {
    /// Coerce a raw query-string value into the given kind
    ///
    /// Returns `None` when the text cannot represent the kind, e.g. `"abc"`
    /// for a number.
    pub fn coerce(raw: &str, kind: FieldKind) -> Option<Self> {
        let raw = raw.trim();
        match kind {
            FieldKind::Text => Some(FieldValue::String(raw.to_string())),
            FieldKind::Number => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FieldValue::Float),
            FieldKind::Timestamp => parse_timestamp(raw).map(FieldValue::DateTime),
        }
    }

    /// Compare against a stored JSON value
    ///
    /// `None` means the two are not comparable (different types, missing).
    pub fn compare_json(&self, stored: &Value) -> Option<Ordering> {
        match (self, stored) {
            (FieldValue::Float(a), Value::Number(b)) => b.as_f64().and_then(|b| b.partial_cmp(a)),
            (FieldValue::String(a), Value::String(b)) => Some(b.as_str().cmp(a.as_str())),
            (FieldValue::DateTime(a), Value::String(b)) => {
                parse_timestamp(b).map(|b| b.cmp(a))
            }
            _ => None,
        }
    }
}

/// Canonical timestamp text: RFC 3339, millisecond precision, `Z` suffix
///
/// Fixed width keeps lexicographic order equal to chronological order, which
/// the document store relies on when sorting by `createdAt`.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Accept RFC 3339 timestamps or bare `YYYY-MM-DD` dates
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Serde adapter writing timestamps with [`format_timestamp`]
pub mod timestamp {
    use super::{format_timestamp, parse_timestamp};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}
