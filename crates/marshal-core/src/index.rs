//! # Secondary Index
//!
//! Per-field mapping from normalized field value to the identities holding
//! that value. Buckets keep insertion order; empty buckets are pruned.
//!
//! The index remembers which bucket each identity was filed under, so an
//! identity can always be pulled out even after the entity's field was
//! changed behind the index's back.

use crate::types::{Key, Value};
use indexmap::IndexSet;
use std::collections::BTreeMap;

/// Secondary index over one field.
#[derive(Debug, Clone, Default)]
pub struct Index {
    field: String,
    /// Field value -> identities, in insertion order.
    buckets: BTreeMap<Key, IndexSet<Key>>,
    /// Identity -> the bucket it was filed under.
    placed: BTreeMap<Key, Key>,
}

impl Index {
    /// Create a new empty index for a field.
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    /// The indexed field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// File an identity under a value, moving it if it was filed elsewhere.
    pub fn insert(&mut self, identity: Key, value: &Value) {
        let bucket = Key::from(value);
        if self.placed.get(&identity) == Some(&bucket) {
            return;
        }
        self.remove(&identity);
        self.buckets
            .entry(bucket.clone())
            .or_default()
            .insert(identity.clone());
        self.placed.insert(identity, bucket);
    }

    /// Remove an identity from its bucket. Returns `false` if it was not indexed.
    pub fn remove(&mut self, identity: &Key) -> bool {
        let Some(bucket) = self.placed.remove(identity) else {
            return false;
        };
        if let Some(identities) = self.buckets.get_mut(&bucket) {
            identities.shift_remove(identity);
            if identities.is_empty() {
                self.buckets.remove(&bucket);
            }
        }
        true
    }

    /// Identities filed under a value (loosely compared), in insertion order.
    pub fn lookup(&self, value: &Value) -> impl Iterator<Item = &Key> + '_ {
        self.buckets.get(&Key::from(value)).into_iter().flatten()
    }

    /// First identity filed under a value.
    #[must_use]
    pub fn first(&self, value: &Value) -> Option<&Key> {
        self.buckets.get(&Key::from(value))?.first()
    }

    /// Check if an identity is indexed.
    #[must_use]
    pub fn contains(&self, identity: &Key) -> bool {
        self.placed.contains_key(identity)
    }

    /// Number of indexed identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.placed.len()
    }

    /// Check if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    /// All buckets in deterministic key order.
    pub fn buckets(&self) -> impl Iterator<Item = (&Key, &IndexSet<Key>)> {
        self.buckets.iter()
    }
}
