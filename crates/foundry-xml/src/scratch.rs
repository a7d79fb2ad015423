//! Per-parse scratch store shared by every context of one document.
//!
//! The store is filled by the caller before [`crate::XmlLoader::parse`] and
//! read by handlers during the parse. Values are a caller-defined tagged
//! type, so grammars never downcast untyped values. Keys are written once
//! per loading session by convention; [`Scratch::insert`] reports the value
//! it replaced so callers can notice accidental rewrites.

use std::collections::HashMap;

/// String-keyed bag of caller-defined values.
#[derive(Debug, Clone)]
pub struct Scratch<V> {
    values: HashMap<String, V>,
}

impl<V> Default for Scratch<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Scratch<V> {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Store `value` under `key`, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        self.values.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
