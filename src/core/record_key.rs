//! Record keys in the `id_<n>` form used by the ledger document

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Prefix every top-level record key carries in `data.json`
pub const KEY_PREFIX: &str = "id_";

/// Key of an item or task record (`id_1`, `id_2`, ...)
///
/// Ordering is numeric so that `id_10` sorts after `id_9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey(u32);

impl RecordKey {
    /// Create a key from its number
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    /// The numeric part of the key
    pub fn number(&self) -> u32 {
        self.0
    }

    /// Parse a key from a string
    pub fn parse(s: &str) -> Result<Self, KeyParseError> {
        s.parse()
    }

    /// The key following the highest of `existing`, or `id_1` when there is none
    ///
    /// `None` once the highest key is `id_4294967295`.
    pub fn next_after<'a>(existing: impl IntoIterator<Item = &'a RecordKey>) -> Option<Self> {
        match existing.into_iter().max() {
            Some(k) => k.0.checked_add(1).map(Self),
            None => Some(Self(1)),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", KEY_PREFIX, self.0)
    }
}

impl FromStr for RecordKey {
    type Err = KeyParseError;

    /// Accepts `id_3`, `3` and the short form `@3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix(KEY_PREFIX)
            .or_else(|| trimmed.strip_prefix('@'))
            .unwrap_or(trimmed);

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(KeyParseError::Malformed(s.to_string()));
        }

        digits
            .parse::<u32>()
            .map(Self)
            .map_err(|_| KeyParseError::OutOfRange(s.to_string()))
    }
}

impl Serialize for RecordKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Next free sub-record id (materials, work materials, steps start at 0)
pub fn next_sub_id<'a>(existing: impl IntoIterator<Item = &'a u32>) -> Option<u32> {
    match existing.into_iter().max() {
        Some(n) => n.checked_add(1),
        None => Some(0),
    }
}

/// Errors that can occur when parsing record keys
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("invalid record key '{0}' (expected id_<n>, <n> or @<n>)")]
    Malformed(String),

    #[error("record key '{0}' is out of range")]
    OutOfRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        assert_eq!(RecordKey::new(7).to_string(), "id_7");
    }

    #[test]
    fn test_key_parse_forms() {
        assert_eq!(RecordKey::parse("id_12").unwrap(), RecordKey::new(12));
        assert_eq!(RecordKey::parse("12").unwrap(), RecordKey::new(12));
        assert_eq!(RecordKey::parse("@12").unwrap(), RecordKey::new(12));
        assert_eq!(RecordKey::parse(" id_3 ").unwrap(), RecordKey::new(3));
    }

    #[test]
    fn test_key_parse_rejects_garbage() {
        assert!(matches!(
            RecordKey::parse("id_").unwrap_err(),
            KeyParseError::Malformed(_)
        ));
        assert!(matches!(
            RecordKey::parse("item_3").unwrap_err(),
            KeyParseError::Malformed(_)
        ));
        assert!(matches!(
            RecordKey::parse("id_-1").unwrap_err(),
            KeyParseError::Malformed(_)
        ));
        assert!(matches!(
            RecordKey::parse("id_99999999999").unwrap_err(),
            KeyParseError::OutOfRange(_)
        ));
    }

    #[test]
    fn test_key_ordering_is_numeric() {
        let mut keys = vec![
            RecordKey::new(10),
            RecordKey::new(2),
            RecordKey::new(9),
        ];
        keys.sort();
        assert_eq!(
            keys.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
            vec!["id_2", "id_9", "id_10"]
        );
    }

    #[test]
    fn test_next_after() {
        assert_eq!(RecordKey::next_after(&[]), Some(RecordKey::new(1)));
        let keys = [RecordKey::new(3), RecordKey::new(10), RecordKey::new(9)];
        assert_eq!(RecordKey::next_after(&keys), Some(RecordKey::new(11)));
    }

    #[test]
    fn test_next_after_highest_possible_key() {
        let last: RecordKey = "id_4294967295".parse().unwrap();
        assert_eq!(RecordKey::next_after(&[last]), None);
    }

    #[test]
    fn test_next_sub_id() {
        assert_eq!(next_sub_id(&[]), Some(0));
        assert_eq!(next_sub_id(&[0, 1, 4]), Some(5));
        assert_eq!(next_sub_id(&[u32::MAX]), None);
    }

    #[test]
    fn test_key_serde_as_string() {
        let json = serde_json::to_string(&RecordKey::new(4)).unwrap();
        assert_eq!(json, "\"id_4\"");
        let back: RecordKey = serde_json::from_str("\"id_4\"").unwrap();
        assert_eq!(back, RecordKey::new(4));
    }
}
