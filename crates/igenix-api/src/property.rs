// ── Raw property values ──
//
// Devices expose their state as "data points" (DPS): small integer keys
// mapped to JSON scalars. A `Snapshot` is the full set, always fetched
// as one unit.

use std::collections::{BTreeMap, btree_map};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A raw data point key as the device numbers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DpsKey(u16);

impl DpsKey {
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u16 {
        self.0
    }
}

impl From<u16> for DpsKey {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl FromStr for DpsKey {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl fmt::Display for DpsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single data point value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Text(_) => "string",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for PropertyValue {
    fn from(n: i32) -> Self {
        Self::Integer(n.into())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

/// The full property state of a device at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    values: BTreeMap<DpsKey, PropertyValue>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a device status payload of the form `{"dps": {"1": true, "2": 24}}`.
    pub fn from_dps_json(payload: &serde_json::Value) -> Result<Self, Error> {
        let dps = payload
            .get("dps")
            .and_then(serde_json::Value::as_object)
            .ok_or_else(|| Error::Deserialization {
                message: "status payload has no `dps` object".into(),
                body: payload.to_string(),
            })?;

        let mut values = BTreeMap::new();
        for (raw_key, raw_value) in dps {
            let key: DpsKey = raw_key.parse().map_err(|e| Error::Deserialization {
                message: format!("invalid data point key '{raw_key}': {e}"),
                body: payload.to_string(),
            })?;
            let value: PropertyValue =
                serde_json::from_value(raw_value.clone()).map_err(|e| Error::Deserialization {
                    message: format!("unsupported value for data point {key}: {e}"),
                    body: payload.to_string(),
                })?;
            values.insert(key, value);
        }

        Ok(Self { values })
    }

    pub fn get(&self, key: DpsKey) -> Option<&PropertyValue> {
        self.values.get(&key)
    }

    pub fn insert(&mut self, key: DpsKey, value: PropertyValue) -> Option<PropertyValue> {
        self.values.insert(key, value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, DpsKey, PropertyValue> {
        self.values.iter()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a DpsKey, &'a PropertyValue);
    type IntoIter = btree_map::Iter<'a, DpsKey, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl FromIterator<(DpsKey, PropertyValue)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (DpsKey, PropertyValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Acknowledgement of a single-property write.
///
/// Carries whatever data points the device reported back in its reply,
/// which may be none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteAck {
    pub reported: Snapshot,
}

impl WriteAck {
    pub fn new(reported: Snapshot) -> Self {
        Self { reported }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_status_payload() {
        let payload = json!({
            "devId": "bf00aa11",
            "dps": { "1": true, "2": 24, "4": "cold", "5": "2", "104": false }
        });

        let snapshot = Snapshot::from_dps_json(&payload).unwrap();

        assert_eq!(snapshot.len(), 5);
        assert_eq!(snapshot.get(DpsKey::new(1)), Some(&PropertyValue::Bool(true)));
        assert_eq!(snapshot.get(DpsKey::new(2)).and_then(PropertyValue::as_i64), Some(24));
        assert_eq!(snapshot.get(DpsKey::new(4)).and_then(PropertyValue::as_str), Some("cold"));
        assert_eq!(snapshot.get(DpsKey::new(104)), Some(&PropertyValue::Bool(false)));
        assert_eq!(snapshot.get(DpsKey::new(3)), None);
    }

    #[test]
    fn rejects_payload_without_dps() {
        let err = Snapshot::from_dps_json(&json!({ "devId": "x" })).unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
    }

    #[test]
    fn rejects_non_numeric_key() {
        let err = Snapshot::from_dps_json(&json!({ "dps": { "mode": "cold" } })).unwrap_err();
        let Error::Deserialization { message, .. } = err else {
            panic!("expected deserialization error");
        };
        assert!(message.contains("'mode'"));
    }

    #[test]
    fn rejects_nested_values() {
        let err = Snapshot::from_dps_json(&json!({ "dps": { "1": { "on": true } } })).unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
    }

    #[test]
    fn value_accessors_are_strict() {
        let value = PropertyValue::from("2");
        assert_eq!(value.as_str(), Some("2"));
        assert_eq!(value.as_i64(), None);
        assert_eq!(value.as_bool(), None);
        assert_eq!(value.kind(), "string");
        assert_eq!(value.to_string(), "\"2\"");
    }

    #[test]
    fn snapshot_iterates_in_key_order() {
        let snapshot: Snapshot = [
            (DpsKey::new(104), PropertyValue::Bool(true)),
            (DpsKey::new(1), PropertyValue::Bool(false)),
            (DpsKey::new(19), PropertyValue::from("C")),
        ]
        .into_iter()
        .collect();

        let keys: Vec<u16> = snapshot.iter().map(|(k, _)| k.get()).collect();
        assert_eq!(keys, vec![1, 19, 104]);
    }
}
