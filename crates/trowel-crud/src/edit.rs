//! Local field edits made by a form before the record is saved.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone};
use serde_json::{Map, Value};

use crate::record::Record;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Set `name` from a raw text input.
///
/// The text is stored as JSON when it parses as JSON (numbers, booleans,
/// arrays), otherwise as a string. An empty input clears the field to null.
pub fn apply_input(record: &mut Record, name: &str, raw: &str) {
    let value = if raw.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };
    record.insert(name.to_string(), value);
}

/// Set a checkbox field.
pub fn apply_checked(record: &mut Record, name: &str, checked: bool) {
    record.insert(name.to_string(), Value::Bool(checked));
}

/// Set a timestamp field in ISO-8601 with the date's own offset.
pub fn apply_date<Tz: TimeZone>(record: &mut Record, name: &str, date: &DateTime<Tz>)
where
    Tz::Offset: std::fmt::Display,
{
    record.insert(
        name.to_string(),
        Value::String(date.to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
}

/// Format a PostgreSQL date range (`[2012-06-01,2013-09-15)`); missing
/// bounds are left empty.
#[must_use]
pub fn format_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> String {
    let bound = |date: Option<NaiveDate>| {
        date.map(|date| date.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
    };
    format!("[{},{})", bound(start), bound(end))
}

/// Set a date range field.
pub fn apply_date_range(
    record: &mut Record,
    name: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) {
    record.insert(
        name.to_string(),
        Value::String(format_date_range(start, end)),
    );
}

/// Parse a PostgreSQL date range into its bounds. Unparsable bounds are `None`.
#[must_use]
pub fn parse_date_range(range: &str) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let stripped: String = range
        .chars()
        .filter(|ch| !matches!(ch, '[' | ']' | '(' | ')'))
        .collect();
    let mut bounds = stripped.splitn(2, ',').map(|bound| {
        let bound = bound.trim().trim_matches('"');
        NaiveDate::parse_from_str(bound, DATE_FORMAT).ok()
    });
    let start = bounds.next().flatten();
    let end = bounds.next().flatten();
    (start, end)
}

fn choice_value(option: &Value) -> Value {
    match option {
        Value::Object(fields) => fields
            .get("uuid")
            .filter(|uuid| truthy(uuid))
            .or_else(|| fields.get("value"))
            .cloned()
            .unwrap_or(Value::Null),
        other if truthy(other) => other.clone(),
        _ => Value::Null,
    }
}

/// Set a field from a single-choice picker.
///
/// An option object contributes its `uuid`, else its `value`. A bare value is
/// stored as is; an empty choice clears the field.
pub fn apply_choice(record: &mut Record, name: &str, choice: Option<&Value>) {
    let value = choice.map_or(Value::Null, choice_value);
    record.insert(name.to_string(), value);
}

/// Set a field from a multi-choice picker. `None` clears the field.
pub fn apply_choices(record: &mut Record, name: &str, choices: Option<&[Value]>) {
    let value = choices.map_or(Value::Null, |options| {
        Value::Array(options.iter().map(choice_value).collect())
    });
    record.insert(name.to_string(), value);
}

/// Replace an array field.
pub fn apply_array(record: &mut Record, name: &str, values: Vec<Value>) {
    record.insert(name.to_string(), Value::Array(values));
}

/// Replace `record[parent][key]` with `local`, keeping the parent's other keys.
pub fn apply_nested(record: &mut Record, parent: &str, key: &str, local: Map<String, Value>) {
    let mut nested = match record.remove(parent) {
        Some(Value::Object(existing)) => existing,
        _ => Map::new(),
    };
    nested.insert(key.to_string(), Value::Object(local));
    record.insert(parent.to_string(), Value::Object(nested));
}
