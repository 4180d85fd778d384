//! In-memory document model produced by the block parser.
//!
//! A [`Document`] is an insertion-ordered map from key to [`Value`]. Keys keep
//! the order of their first occurrence; emitters rely on that for diff-stable
//! output. A key seen more than once at the same level is promoted to
//! [`Value::Repeated`] on its second occurrence.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(String),
    /// A key that appeared with no `=`.
    Flag,
    Block(Document),
    /// Every occurrence of a recurring key, first to last.
    Repeated(Vec<Value>),
}

impl Value {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&Document> {
        match self {
            Value::Block(d) => Some(d),
            _ => None,
        }
    }

    /// Each occurrence of the key this value is stored under. A non-repeated
    /// value yields itself once.
    pub fn occurrences(&self) -> std::slice::Iter<'_, Value> {
        match self {
            Value::Repeated(items) => items.iter(),
            other => std::slice::from_ref(other).iter(),
        }
    }

    fn push(&mut self, next: Value) {
        match self {
            Value::Repeated(items) => items.push(next),
            _ => {
                let first = std::mem::replace(self, Value::Flag);
                *self = Value::Repeated(vec![first, next]);
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, promoting to [`Value::Repeated`] when the
    /// key is already present.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1.push(value),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// The value under `key` if it is a single scalar.
    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_scalar)
    }

    /// The value under `key` if it is a single block.
    pub fn block(&self, key: &str) -> Option<&Document> {
        self.get(key).and_then(Value::as_block)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Scalar(s) => serializer.serialize_str(s),
            Value::Flag => serializer.serialize_bool(true),
            Value::Block(d) => d.serialize(serializer),
            Value::Repeated(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
