//! # Collection
//!
//! An ordered group of shared entity handles, e.g. the result of a lookup
//! or a has-many relation. A collection never copies an entity.

use crate::entity::EntityRef;
use crate::types::Value;

/// Ordered, restartable sequence of entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    entities: Vec<EntityRef>,
}

impl Collection {
    /// Create a new empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity.
    pub fn push(&mut self, entity: EntityRef) {
        self.entities.push(entity);
    }

    /// Append an entity unless the same instance is already present.
    /// Returns `true` if it was appended.
    pub fn push_unique(&mut self, entity: EntityRef) -> bool {
        if self.contains(&entity) {
            return false;
        }
        self.entities.push(entity);
        true
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get the entity at a position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&EntityRef> {
        self.entities.get(index)
    }

    /// Get the first entity.
    #[must_use]
    pub fn first(&self) -> Option<&EntityRef> {
        self.entities.first()
    }

    /// Iterate in order.
    pub fn iter(&self) -> std::slice::Iter<'_, EntityRef> {
        self.entities.iter()
    }

    /// Check if this exact instance is a member.
    #[must_use]
    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.entities.iter().any(|e| e.ptr_eq(entity))
    }

    /// Values of one field across all members, in order. Absent fields read as null.
    #[must_use]
    pub fn field_values(&self, field: &str) -> Vec<Value> {
        self.entities.iter().map(|e| e.value(field)).collect()
    }

    /// Borrow the members as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[EntityRef] {
        &self.entities
    }
}

impl FromIterator<EntityRef> for Collection {
    fn from_iter<I: IntoIterator<Item = EntityRef>>(iter: I) -> Self {
        Self {
            entities: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Collection {
    type Item = EntityRef;
    type IntoIter = std::vec::IntoIter<EntityRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a EntityRef;
    type IntoIter = std::slice::Iter<'a, EntityRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}
