//! Open-ended field mapping attached to entries.
//!
//! Values are converted to JSON when they are attached. A value that has no
//! JSON representation is kept as [`FieldValue::Unserializable`] so the
//! failure shows up when the record is serialized, not when it is built.

use std::collections::btree_map::{self, BTreeMap};

use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A value with a JSON representation
    Json(Value),

    /// A value whose conversion to JSON failed, with the reason
    Unserializable(String),
}

impl FieldValue {
    /// Convert any serializable value into a field value.
    pub fn new<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => FieldValue::Json(v),
            Err(e) => FieldValue::Unserializable(e.to_string()),
        }
    }

    /// The JSON value, if the conversion succeeded.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            FieldValue::Json(v) => Some(v),
            FieldValue::Unserializable(_) => None,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Json(value)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Json(v) => v.serialize(serializer),
            FieldValue::Unserializable(reason) => Err(S::Error::custom(reason)),
        }
    }
}

/// Field name to value mapping.
///
/// Keys are kept sorted, so serialized records have a stable key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Fields(BTreeMap<String, FieldValue>);

impl Fields {
    /// Create an empty mapping. Does not allocate.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert a serializable value, returning the previous value for the key.
    pub fn insert<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Option<FieldValue> {
        self.0.insert(key.into(), FieldValue::new(value))
    }

    /// Insert an already converted value.
    pub fn insert_value(&mut self, key: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.0.insert(key.into(), value)
    }

    /// Builder form of [`Fields::insert`].
    pub fn with<T: Serialize + ?Sized>(mut self, key: impl Into<String>, value: &T) -> Self {
        self.insert(key, value);
        self
    }

    /// Merge `other` into `self`. On duplicate keys the value from `other` wins.
    pub fn merge(&mut self, other: Fields) {
        self.0.extend(other.0);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FieldValue> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for Fields {
    fn from(map: Map<String, Value>) -> Self {
        Self(map.into_iter().map(|(k, v)| (k, FieldValue::Json(v))).collect())
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl IntoIterator for Fields {
    type Item = (String, FieldValue);
    type IntoIter = btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = btree_map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
