//! Tri-state attribute values and the marshaling primitives around them.
//!
//! The host orchestrator distinguishes a set value, an explicit null and a
//! value that is not known until apply. Reconcilers only ever see
//! `Option`s; conversion happens here.

use std::hash::Hash;

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// JSON key marking an unknown value: `{"$unknown": true}`.
pub const UNKNOWN_MARKER: &str = "$unknown";

/// An attribute value as exchanged with the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Value<T> {
    Known(T),
    #[default]
    Null,
    Unknown,
}

impl<T> Value<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, Value::Known(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    /// `None` for null and unknown: the caller did not specify the field.
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Value::Known(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Value::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Unknown becomes null. State written back to the host never carries
    /// unknowns.
    pub fn settled(self) -> Self {
        match self {
            Value::Unknown => Value::Null,
            other => other,
        }
    }
}

impl<T> From<Option<T>> for Value<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Value::Known(v),
            None => Value::Null,
        }
    }
}

impl Value<String> {
    /// Borrow an optional string field.
    pub fn optional_str(&self) -> Option<&str> {
        self.as_option().map(String::as_str)
    }
}

/// Copy out a list field, `None` when null or unknown.
pub fn unpack_list<T: Clone>(value: &Value<Vec<T>>) -> Option<Vec<T>> {
    value.as_option().cloned()
}

/// A list that is always known after a read.
pub fn known_list<T>(items: impl IntoIterator<Item = T>) -> Value<Vec<T>> {
    Value::Known(items.into_iter().collect())
}

/// Order-insensitive list equality, ignoring duplicates.
pub fn same_elements<T: Eq + Hash>(a: &[T], b: &[T]) -> bool {
    use std::collections::HashSet;
    a.iter().collect::<HashSet<_>>() == b.iter().collect::<HashSet<_>>()
}

/// Keep `prior`'s ordering for elements still present in `current`, then
/// append new elements in `current` order.
///
/// Remote listings come back in server order; persisting that order would
/// show spurious diffs for lists the user wrote in a different order.
pub fn reorder_like<T: Eq + Clone>(prior: &[T], current: Vec<T>) -> Vec<T> {
    let mut ordered: Vec<T> = prior
        .iter()
        .filter(|item| current.contains(item))
        .cloned()
        .collect();
    for item in current {
        if !ordered.contains(&item) {
            ordered.push(item);
        }
    }
    ordered
}

impl<T: Serialize> Serialize for Value<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Known(v) => v.serialize(serializer),
            Value::Null => serializer.serialize_none(),
            Value::Unknown => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(UNKNOWN_MARKER, &true)?;
                map.end()
            }
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Value<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        if is_unknown(&raw) {
            return Ok(Value::Unknown);
        }
        match raw {
            serde_json::Value::Null => Ok(Value::Null),
            other => T::deserialize(other)
                .map(Value::Known)
                .map_err(D::Error::custom),
        }
    }
}

/// Whether a raw JSON value is the unknown marker.
pub fn is_unknown(raw: &serde_json::Value) -> bool {
    match raw.as_object() {
        Some(map) => map.len() == 1 && map.get(UNKNOWN_MARKER) == Some(&serde_json::Value::Bool(true)),
        None => false,
    }
}
