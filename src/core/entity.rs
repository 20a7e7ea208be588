//! Record trait - common interface for the ledger's record types

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Text stored in place of an unset string field
pub const NOT_AVAILABLE: &str = "N/A";

/// `serde(default)` helper for string fields that default to [`NOT_AVAILABLE`]
pub fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

/// Common trait for top-level records (items and tasks)
pub trait Record: Serialize + DeserializeOwned {
    /// Name of the section holding this record type in `data.json`
    const SECTION: &'static str;

    /// Human-readable singular label ("item", "task")
    const LABEL: &'static str;

    /// Display name of the record
    fn name(&self) -> &str;

    /// Render a field for table output, looked up by its JSON key
    fn field(&self, key: &str) -> Option<String> {
        json_field(self, key)
    }
}

/// Common trait for nested sub-records (materials, work materials, steps)
pub trait SubRecord {
    /// The id stored inside the record
    fn id(&self) -> u32;

    /// Overwrite the id stored inside the record
    fn set_id(&mut self, id: u32);
}

/// `deserialize_with` helper for nested sub-record maps
///
/// A record without an inner `id` takes the id of its map key.
pub fn keyed_sub_records<'de, D, T>(deserializer: D) -> Result<BTreeMap<u32, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = BTreeMap::<u32, Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, mut value)| {
            if let Value::Object(fields) = &mut value {
                fields.entry("id").or_insert_with(|| Value::from(key));
            }
            serde_json::from_value(value)
                .map(|record| (key, record))
                .map_err(D::Error::custom)
        })
        .collect()
}

/// Look up a top-level JSON key of any serializable value and render it as text
pub fn json_field<T: Serialize + ?Sized>(value: &T, key: &str) -> Option<String> {
    let value = serde_json::to_value(value).ok()?;
    value.get(key).map(render_value)
}

/// Render a JSON value as a single table cell
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format_amount(f),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        // Nested sub-record maps show as a count
        Value::Object(map) => map.len().to_string(),
    }
}

/// Format a money/decimal amount with two decimal places
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!(null)), "-");
        assert_eq!(render_value(&json!(3)), "3");
        assert_eq!(render_value(&json!(2.5)), "2.50");
        assert_eq!(render_value(&json!("oak")), "oak");
        assert_eq!(render_value(&json!({"0": {}, "1": {}})), "2");
        assert_eq!(render_value(&json!(["a", "b"])), "a, b");
    }

    #[test]
    fn test_json_field() {
        let v = json!({"name": "Stool", "sell_cost": 120.0});
        assert_eq!(json_field(&v, "name").as_deref(), Some("Stool"));
        assert_eq!(json_field(&v, "sell_cost").as_deref(), Some("120.00"));
        assert_eq!(json_field(&v, "missing"), None);
    }
}
