//! Schema-less records.
//!
//! The engine never looks inside a record beyond its identifiers and audit
//! fields. Typed views are built at the edges with [`record_view`] and
//! [`record_from`].

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CrudError, CrudResult};

/// One backend row.
pub type Record = Map<String, Value>;

/// Primary identifier column.
pub const UUID_FIELD: &str = "uuid";
/// Human-readable identifier column used by some resources.
pub const ENTRY_ID_FIELD: &str = "entry_id";
/// Audit column holding the last write time.
pub const UPDATED_AT_FIELD: &str = "updated_at";
/// Audit column holding the last writer.
pub const UPDATED_BY_FIELD: &str = "updated_by";

static UUID_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$").ok()
});

/// Whether `value` is a hyphenated UUID.
#[must_use]
pub fn is_uuid(value: &str) -> bool {
    UUID_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(value))
}

fn non_empty_str<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

/// The record's `uuid`, when present and non-empty.
#[must_use]
pub fn record_uuid(record: &Record) -> Option<&str> {
    non_empty_str(record, UUID_FIELD)
}

/// The record's `entry_id`, when present and non-empty.
#[must_use]
pub fn record_entry_id(record: &Record) -> Option<&str> {
    non_empty_str(record, ENTRY_ID_FIELD)
}

/// Identifier shown to users: `entry_id`, else `uuid`.
#[must_use]
pub fn display_id(record: &Record) -> Option<&str> {
    record_entry_id(record).or_else(|| record_uuid(record))
}

/// First row of a response: index 0 of an array, or the object itself.
#[must_use]
pub fn first_record(value: Value) -> Option<Record> {
    match value {
        Value::Array(rows) => match rows.into_iter().next() {
            Some(Value::Object(record)) => Some(record),
            _ => None,
        },
        Value::Object(record) => Some(record),
        _ => None,
    }
}

/// All object rows of a response.
#[must_use]
pub fn all_records(value: Value) -> Vec<Record> {
    match value {
        Value::Array(rows) => rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(record) => Some(record),
                _ => None,
            })
            .collect(),
        Value::Object(record) => vec![record],
        _ => Vec::new(),
    }
}

/// Decode a record into a typed view.
///
/// # Errors
///
/// Returns [`CrudError::Shape`] when the record does not match `T`.
pub fn record_view<T: DeserializeOwned>(record: &Record) -> CrudResult<T> {
    serde_json::from_value(Value::Object(record.clone())).map_err(|source| CrudError::Shape { source })
}

/// Encode a typed value as a record.
///
/// # Errors
///
/// Returns [`CrudError::Shape`] when `value` does not serialise to a JSON object.
pub fn record_from<T: Serialize>(value: &T) -> CrudResult<Record> {
    match serde_json::to_value(value).map_err(|source| CrudError::Shape { source })? {
        Value::Object(record) => Ok(record),
        _ => Err(CrudError::Shape {
            source: <serde_json::Error as serde::de::Error>::custom("expected a JSON object"),
        }),
    }
}

/// Audit columns written on every save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFields {
    /// Last write time, ISO-8601.
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Id of the last writer.
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl AuditFields {
    /// Audit fields for a write happening at `now` by `actor`.
    ///
    /// The timestamp is moved past `previous` when the clock has not advanced
    /// beyond it, so stored values strictly increase.
    #[must_use]
    pub fn stamp(now: DateTime<Utc>, previous: Option<&str>, actor: Option<&str>) -> Self {
        let previous = previous
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|value| value.with_timezone(&Utc));
        let at = match previous {
            Some(previous) if previous >= now => previous + Duration::milliseconds(1),
            _ => now,
        };
        Self {
            updated_at: Some(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            updated_by: actor.map(str::to_string),
        }
    }

    /// Read the audit fields of a record.
    #[must_use]
    pub fn of(record: &Record) -> Self {
        Self {
            updated_at: non_empty_str(record, UPDATED_AT_FIELD).map(str::to_string),
            updated_by: non_empty_str(record, UPDATED_BY_FIELD).map(str::to_string),
        }
    }

    /// Copy of `record` with these fields written (`updated_by` as null when unset).
    #[must_use]
    pub fn apply_to(&self, record: &Record) -> Record {
        let mut stamped = record.clone();
        stamped.insert(
            UPDATED_AT_FIELD.to_string(),
            self.updated_at.clone().map_or(Value::Null, Value::String),
        );
        stamped.insert(
            UPDATED_BY_FIELD.to_string(),
            self.updated_by.clone().map_or(Value::Null, Value::String),
        );
        stamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record(value: Value) -> Record {
        first_record(value).unwrap_or_default()
    }

    #[test]
    fn uuid_detection_is_strict() {
        assert!(is_uuid("5b0f3a52-9c1e-4d27-8a41-0f6d2c9e7b13"));
        assert!(is_uuid("5B0F3A52-9C1E-4D27-8A41-0F6D2C9E7B13"));
        assert!(!is_uuid("5b0f3a529c1e4d278a410f6d2c9e7b13"));
        assert!(!is_uuid("A-2024-0117"));
    }

    #[test]
    fn display_id_prefers_entry_id() {
        let find = record(json!({"uuid": "u1", "entry_id": "A-1"}));
        assert_eq!(display_id(&find), Some("A-1"));
        let context = record(json!({"uuid": "u2", "entry_id": ""}));
        assert_eq!(display_id(&context), Some("u2"));
        assert_eq!(display_id(&Record::new()), None);
    }

    #[test]
    fn first_record_takes_index_zero() {
        let rows = json!([{"uuid": "a"}, {"uuid": "b"}]);
        assert_eq!(first_record(rows).as_ref().and_then(record_uuid), Some("a"));
        assert_eq!(first_record(json!([])), None);
        assert_eq!(first_record(json!([3, {"uuid": "b"}])), None);
        assert_eq!(first_record(Value::Null), None);
        assert_eq!(all_records(json!([{"uuid": "a"}, 3, {"uuid": "b"}])).len(), 2);
    }

    #[test]
    fn stamps_advance_past_the_stored_value() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).single().unwrap_or_default();
        let fresh = AuditFields::stamp(now, Some("2024-04-30T08:00:00.000Z"), Some("actor"));
        assert_eq!(fresh.updated_at.as_deref(), Some("2024-05-01T10:00:00.000Z"));
        assert_eq!(fresh.updated_by.as_deref(), Some("actor"));

        let skewed = AuditFields::stamp(now, Some("2024-05-01T10:00:00.000Z"), None);
        assert_eq!(skewed.updated_at.as_deref(), Some("2024-05-01T10:00:00.001Z"));
        assert_eq!(skewed.updated_by, None);
    }

    #[test]
    fn apply_writes_null_for_anonymous_actors() {
        let stamped = AuditFields {
            updated_at: Some("2024-05-01T10:00:00.000Z".into()),
            updated_by: None,
        }
        .apply_to(&record(json!({"uuid": "u1", "title": "new"})));
        assert_eq!(stamped["title"], json!("new"));
        assert_eq!(stamped[UPDATED_BY_FIELD], Value::Null);
        assert_eq!(AuditFields::of(&stamped).updated_at.as_deref(), Some("2024-05-01T10:00:00.000Z"));
    }

    #[test]
    fn typed_views_decode_and_encode() -> CrudResult<()> {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Find {
            uuid: String,
            weight_g: f64,
        }
        let row = record(json!({"uuid": "u1", "weight_g": 4.5, "extra": true}));
        let find: Find = record_view(&row)?;
        assert_eq!(find, Find { uuid: "u1".into(), weight_g: 4.5 });
        assert_eq!(record_from(&find)?["uuid"], json!("u1"));
        assert!(record_from(&3).is_err());
        Ok(())
    }
}
