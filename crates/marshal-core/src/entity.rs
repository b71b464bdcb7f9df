//! # Entity
//!
//! A mutable record wrapping one row's fields.
//!
//! Entities are handed out as [`EntityRef`] handles. The owning
//! [`EntityType`](crate::EntityType) keeps one handle per identity, and every
//! lookup, collection and resolved relation shares that same instance.
//!
//! Writing a field through an `EntityRef` does not touch any index. Route the
//! write through `EntityType::set_field` when the field is indexed.

use crate::relation::{CachedRelated, Related};
use crate::types::{Row, Value};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Where the entity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Created by the caller, not yet persisted, no identity required.
    New,
    /// Materialized from a row that already has an identity.
    Loaded,
}

// =============================================================================
// ENTITY
// =============================================================================

/// One record: current data, the snapshot it started from, and a cache of
/// resolved relations.
#[derive(Debug)]
pub struct Entity {
    data: Row,
    initial: Row,
    state: EntityState,
    /// Relation name -> memoized result, held weakly.
    related: BTreeMap<String, CachedRelated>,
}

impl Entity {
    pub(crate) fn new(row: Row, state: EntityState) -> Self {
        Self {
            initial: row.clone(),
            data: row,
            state,
            related: BTreeMap::new(),
        }
    }

    /// Get a field's current value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Get a field's current value, treating an absent field as null.
    #[must_use]
    pub fn value(&self, field: &str) -> Value {
        self.data.get(field).cloned().unwrap_or_default()
    }

    /// Check if the field is present.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.data.contains_key(field)
    }

    /// Set a field, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(field.into(), value.into())
    }

    /// Remove a field, returning its last value.
    pub fn unset(&mut self, field: &str) -> Option<Value> {
        self.data.shift_remove(field)
    }

    /// Field names in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// All current data.
    #[must_use]
    pub fn data(&self) -> &Row {
        &self.data
    }

    /// The data the entity was created with.
    #[must_use]
    pub fn initial_data(&self) -> &Row {
        &self.initial
    }

    /// Get the entity state.
    #[must_use]
    pub fn state(&self) -> EntityState {
        self.state
    }

    /// Check if a relation result is memoized on this entity.
    #[must_use]
    pub fn is_related_cached(&self, relation: &str) -> bool {
        self.related.contains_key(relation)
    }

    /// Drop every memoized relation result.
    pub fn clear_related(&mut self) {
        self.related.clear();
    }

    pub(crate) fn cached_related(&self, relation: &str) -> Option<Related> {
        self.related.get(relation)?.upgrade()
    }

    pub(crate) fn cache_related(&mut self, relation: &str, related: &Related) {
        self.related
            .insert(relation.to_string(), CachedRelated::from(related));
    }
}

// =============================================================================
// ENTITY HANDLE
// =============================================================================

/// Shared handle to an [`Entity`].
///
/// Cloning the handle never clones the entity. Equality is reference
/// identity: two handles are equal only if they point at the same instance.
///
/// The handle is single-threaded (`Rc`, not `Arc`). A host that needs
/// concurrency must put the whole owning type behind one lock.
#[derive(Clone)]
#[repr(transparent)]
pub struct EntityRef(Rc<RefCell<Entity>>);

impl EntityRef {
    pub(crate) fn new(entity: Entity) -> Self {
        Self(Rc::new(RefCell::new(entity)))
    }

    pub(crate) fn from_weak(weak: &Weak<RefCell<Entity>>) -> Option<Self> {
        weak.upgrade().map(Self)
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<Entity>> {
        Rc::downgrade(&self.0)
    }

    /// Borrow the entity immutably.
    ///
    /// # Panics
    /// Panics if the entity is currently mutably borrowed.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, Entity> {
        self.0.borrow()
    }

    /// Borrow the entity mutably.
    ///
    /// # Panics
    /// Panics if the entity is currently borrowed.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, Entity> {
        self.0.borrow_mut()
    }

    /// Check if both handles point at the same entity.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Get a copy of a field's current value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        self.borrow().get(field).cloned()
    }

    /// Get a copy of a field's current value, null when absent.
    #[must_use]
    pub fn value(&self, field: &str) -> Value {
        self.borrow().value(field)
    }

    /// Set a field without index maintenance.
    pub fn set(&self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.borrow_mut().set(field, value)
    }

    /// Get the entity state.
    #[must_use]
    pub fn state(&self) -> EntityState {
        self.borrow().state()
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for EntityRef {}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(entity) => f.debug_tuple("EntityRef").field(entity.data()).finish(),
            Err(_) => f.write_str("EntityRef(<borrowed>)"),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> Row {
        let mut row = Row::new();
        row.insert("id".to_string(), Value::from(1));
        row.insert("title".to_string(), Value::from("hello"));
        row
    }

    #[test]
    fn snapshot_is_kept_apart_from_data() {
        let entity = EntityRef::new(Entity::new(post(), EntityState::Loaded));
        entity.set("title", "changed");

        assert_eq!(entity.get("title"), Some(Value::from("changed")));
        assert_eq!(
            entity.borrow().initial_data().get("title"),
            Some(&Value::from("hello"))
        );
    }

    #[test]
    fn absent_field_reads_as_null() {
        let entity = Entity::new(post(), EntityState::New);
        assert!(entity.get("missing").is_none());
        assert!(entity.value("missing").is_null());
        assert!(!entity.has("missing"));
    }

    #[test]
    fn unset_removes_field_keeping_order() {
        let mut entity = Entity::new(post(), EntityState::Loaded);
        entity.set("body", "text");
        assert_eq!(entity.unset("title"), Some(Value::from("hello")));
        let fields: Vec<_> = entity.fields().collect();
        assert_eq!(fields, vec!["id", "body"]);
    }

    #[test]
    fn handles_compare_by_identity() {
        let a = EntityRef::new(Entity::new(post(), EntityState::Loaded));
        let b = EntityRef::new(Entity::new(post(), EntityState::Loaded));
        let a2 = a.clone();

        assert_eq!(a, a2);
        assert_ne!(a, b);
        a2.set("title", "shared");
        assert_eq!(a.get("title"), Some(Value::from("shared")));
    }
}
