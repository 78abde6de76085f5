//! Sample records and environment lookups.

use std::collections::HashMap;

use serde_json::{Map, Value, json};

/// Id of the sample find record.
pub const FIND_UUID: &str = "5b0f3a52-9c1e-4d27-8a41-0f6d2c9e7b13";
/// Human-readable id of the sample find record.
pub const FIND_ENTRY_ID: &str = "A-2024-0117";
/// Id of the sample context record (no entry id).
pub const CONTEXT_UUID: &str = "0d9c6e1a-3f42-4b8e-9d17-6a2b5c8e4f90";
/// Id of the sample actor.
pub const ACTOR_UUID: &str = "c3a1e7d4-2b6f-4a09-8e35-71d9f0b2a6c8";
/// E-mail of the sample actor.
pub const ACTOR_EMAIL: &str = "ann.digger@example.org";

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// A find row as returned by the view path.
#[must_use]
pub fn find_record() -> Map<String, Value> {
    object(json!({
        "uuid": FIND_UUID,
        "entry_id": FIND_ENTRY_ID,
        "title": "Rim sherd",
        "material": "ceramic",
        "weight_g": 42.5,
        "updated_at": "2024-05-01T10:00:00.000Z",
        "updated_by": null
    }))
}

/// A context row without an entry id.
#[must_use]
pub fn context_record() -> Map<String, Value> {
    object(json!({
        "uuid": CONTEXT_UUID,
        "name": "Fill of pit 12",
        "trench": "T3"
    }))
}

/// The sample actor row.
#[must_use]
pub fn actor_record() -> Map<String, Value> {
    object(json!({
        "uuid": ACTOR_UUID,
        "email": ACTOR_EMAIL,
        "name": "Ann Digger"
    }))
}

/// Wrap records the way list endpoints return them.
#[must_use]
pub fn rows(records: impl IntoIterator<Item = Map<String, Value>>) -> Value {
    Value::Array(records.into_iter().map(Value::Object).collect())
}

/// Key lookup over fixed pairs, for loading configuration without touching
/// the process environment.
#[must_use]
pub fn env_lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let values: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect();
    move |key| values.get(key).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_carry_their_identifiers() {
        assert_eq!(find_record().get("uuid"), Some(&json!(FIND_UUID)));
        assert!(context_record().get("entry_id").is_none());
        assert_eq!(rows([actor_record()])[0]["email"], json!(ACTOR_EMAIL));
    }

    #[test]
    fn env_lookup_returns_only_given_keys() {
        let lookup = env_lookup(&[("A", "1")]);
        assert_eq!(lookup("A").as_deref(), Some("1"));
        assert_eq!(lookup("B"), None);
    }
}
