//! # Entity Type (Identity Map)
//!
//! Owns every entity of one logical kind, keyed by identity, plus:
//! - one secondary [`Index`] per configured index field
//! - the `new` list (entities created by the caller, no identity required)
//! - the `removed` map (evicted from the identity map, kept for inspection)
//! - the relations whose native side is this type
//!
//! ## Invariants
//!
//! - At most one entity per identity; lookups hand out the same instance.
//! - Every entity in the identity map is filed in every index, and every
//!   indexed identity is in the identity map.
//! - An identity is never in the identity map and the `removed` map at once.
//! - Loading an identity that is already present is a no-op.
//!
//! ## Lookup paths
//!
//! Field lookups dispatch on the field: the identity field goes straight to
//! the identity map, an indexed field goes through its bucket, and anything
//! else falls back to an O(n) scan of the identity map. [`LookupPath`]
//! reports which path a field takes.

use crate::collection::Collection;
use crate::config::TypeConfig;
use crate::entity::{Entity, EntityRef, EntityState};
use crate::index::Index;
use crate::relation::Relation;
use crate::types::{Key, MarshalError, Row, Value};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Which algorithm a field lookup uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupPath {
    /// Direct identity-map hit.
    Identity,
    /// Secondary index bucket.
    Index,
    /// Linear scan over the identity map.
    Scan,
}

/// Lifecycle position of a tracked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityStatus {
    /// Created with `new_entity`.
    New,
    /// Loaded and unchanged since.
    Clean,
    /// Loaded and changed since.
    Dirty,
    /// Evicted with `remove_entity`.
    Removed,
}

// =============================================================================
// ENTITY TYPE
// =============================================================================

/// Identity map for one type of entity.
#[derive(Debug)]
pub struct EntityType {
    name: String,
    identity_field: String,
    index_fields: Vec<String>,

    /// Identity -> entity, in load order.
    entities: IndexMap<Key, EntityRef>,

    /// Index field -> index.
    indexes: BTreeMap<String, Index>,

    /// Entities created by the caller, in creation order.
    new_entities: Vec<EntityRef>,

    /// Identity -> evicted entity, in removal order.
    removed: IndexMap<Key, EntityRef>,

    /// Relation name -> relation.
    relations: IndexMap<String, Relation>,
}

impl EntityType {
    /// Create a new empty type.
    ///
    /// Duplicate index fields are collapsed and an index on the identity
    /// field is ignored.
    pub fn new(name: impl Into<String>, config: &TypeConfig) -> Result<Self, MarshalError> {
        let name = name.into();
        if config.identity_field.is_empty() {
            return Err(MarshalError::MissingIdentityField(name));
        }

        let mut index_fields: Vec<String> = Vec::new();
        for field in &config.index_fields {
            if *field != config.identity_field && !index_fields.contains(field) {
                index_fields.push(field.clone());
            }
        }
        let indexes = index_fields
            .iter()
            .map(|field| (field.clone(), Index::new(field.clone())))
            .collect();

        Ok(Self {
            name,
            identity_field: config.identity_field.clone(),
            index_fields,
            entities: IndexMap::new(),
            indexes,
            new_entities: Vec::new(),
            removed: IndexMap::new(),
            relations: IndexMap::new(),
        })
    }

    /// The type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The identity field name.
    #[must_use]
    pub fn identity_field(&self) -> &str {
        &self.identity_field
    }

    /// The secondary index field names.
    #[must_use]
    pub fn index_fields(&self) -> &[String] {
        &self.index_fields
    }

    /// The secondary index for a field, if there is one.
    #[must_use]
    pub fn index(&self, field: &str) -> Option<&Index> {
        self.indexes.get(field)
    }

    /// Number of entities in the identity map (new and removed excluded).
    #[must_use]
    pub fn count(&self) -> usize {
        self.entities.len()
    }

    /// Check if the identity map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Check if an identity is in the identity map.
    #[must_use]
    pub fn contains(&self, identity: impl Into<Value>) -> bool {
        self.entities.contains_key(&Key::from(identity.into()))
    }

    // =========================================================================
    // LOADING
    // =========================================================================

    /// Bulk-load rows into the identity map.
    ///
    /// Rows whose identity is already present are skipped. Every row must
    /// carry a non-null identity; the whole call fails before any mutation
    /// otherwise. Returns the number of entities inserted.
    pub fn load<I>(&mut self, rows: I) -> Result<usize, MarshalError>
    where
        I: IntoIterator<Item = Row>,
    {
        let rows: Vec<Row> = rows.into_iter().collect();
        let keys = self.identity_keys(&rows)?;
        let total = rows.len();

        let mut inserted = 0usize;
        for (key, row) in keys.into_iter().zip(rows) {
            if self.entities.contains_key(&key) {
                continue;
            }
            self.insert_loaded(key, row);
            inserted += 1;
        }

        debug!(type_name = %self.name, rows = total, inserted, "loaded rows");
        Ok(inserted)
    }

    /// Load a single row and return its entity.
    ///
    /// If the identity is already present the existing entity is returned
    /// untouched.
    pub fn load_entity(&mut self, row: Row) -> Result<EntityRef, MarshalError> {
        let key = self.identity_key(&row, 0)?;
        if let Some(existing) = self.entities.get(&key) {
            return Ok(existing.clone());
        }
        Ok(self.insert_loaded(key, row))
    }

    /// Load rows and return their entities as a collection, in row order.
    pub fn load_collection<I>(&mut self, rows: I) -> Result<Collection, MarshalError>
    where
        I: IntoIterator<Item = Row>,
    {
        let rows: Vec<Row> = rows.into_iter().collect();
        let keys = self.identity_keys(&rows)?;

        let mut collection = Collection::new();
        for (key, row) in keys.into_iter().zip(rows) {
            let entity = match self.entities.get(&key) {
                Some(existing) => existing.clone(),
                None => self.insert_loaded(key, row),
            };
            collection.push_unique(entity);
        }
        Ok(collection)
    }

    /// Create a new entity. It goes on the `new` list only; the identity
    /// map and indexes are untouched.
    pub fn new_entity(&mut self, fields: Row) -> EntityRef {
        let entity = EntityRef::new(Entity::new(fields, EntityState::New));
        self.new_entities.push(entity.clone());
        entity
    }

    fn identity_key(&self, row: &Row, position: usize) -> Result<Key, MarshalError> {
        match row.get(&self.identity_field) {
            Some(value) if !value.is_null() => Ok(Key::from(value)),
            _ => Err(MarshalError::MissingIdentityValue {
                type_name: self.name.clone(),
                row: position,
            }),
        }
    }

    fn identity_keys(&self, rows: &[Row]) -> Result<Vec<Key>, MarshalError> {
        rows.iter()
            .enumerate()
            .map(|(position, row)| self.identity_key(row, position))
            .collect()
    }

    fn insert_loaded(&mut self, key: Key, row: Row) -> EntityRef {
        for index in self.indexes.values_mut() {
            let value = row.get(index.field()).cloned().unwrap_or_default();
            index.insert(key.clone(), &value);
        }
        let entity = EntityRef::new(Entity::new(row, EntityState::Loaded));
        self.removed.shift_remove(&key);
        self.entities.insert(key, entity.clone());
        entity
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Get an entity by identity. Values are compared loosely (`"3"` finds `3`).
    #[must_use]
    pub fn get_entity(&self, identity: impl Into<Value>) -> Option<EntityRef> {
        self.entities.get(&Key::from(identity.into())).cloned()
    }

    /// Which lookup path `field` takes.
    #[must_use]
    pub fn lookup_path(&self, field: &str) -> LookupPath {
        if field == self.identity_field {
            LookupPath::Identity
        } else if self.indexes.contains_key(field) {
            LookupPath::Index
        } else {
            LookupPath::Scan
        }
    }

    /// Get the first entity whose `field` loosely equals `value`.
    #[must_use]
    pub fn get_entity_by_field(&self, field: &str, value: impl Into<Value>) -> Option<EntityRef> {
        let value = value.into();
        match self.lookup_path(field) {
            LookupPath::Identity => self.entities.get(&Key::from(&value)).cloned(),
            LookupPath::Index => {
                let identity = self.indexes.get(field)?.first(&value)?;
                self.entities.get(identity).cloned()
            }
            LookupPath::Scan => {
                trace!(type_name = %self.name, field, "linear scan for entity");
                self.entities
                    .values()
                    .find(|entity| field_matches(entity, field, std::slice::from_ref(&value)))
                    .cloned()
            }
        }
    }

    /// Get the entities for a sequence of identities, in input order.
    /// Unknown identities are skipped; repeated ones appear once.
    #[must_use]
    pub fn get_collection<I>(&self, identities: I) -> Collection
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.collect_keys(
            identities
                .into_iter()
                .map(|identity| Key::from(identity.into())),
        )
    }

    /// Get every entity whose `field` loosely equals one of `values`.
    ///
    /// An array argument is taken as the list of target values. Identity
    /// and index lookups return matches value by value in input order; the
    /// scan returns matches in identity-map order. Either way each entity
    /// appears once.
    #[must_use]
    pub fn get_collection_by_field(&self, field: &str, values: impl Into<Value>) -> Collection {
        let targets = match values.into() {
            Value::Array(items) => items,
            value => vec![value],
        };

        match self.lookup_path(field) {
            LookupPath::Identity => self.collect_keys(targets.iter().map(Key::from)),
            LookupPath::Index => match self.indexes.get(field) {
                Some(index) => self.collect_keys(
                    targets
                        .iter()
                        .flat_map(|value| index.lookup(value).cloned()),
                ),
                None => Collection::new(),
            },
            LookupPath::Scan => {
                trace!(type_name = %self.name, field, "linear scan for collection");
                self.entities
                    .values()
                    .filter(|entity| field_matches(entity, field, &targets))
                    .cloned()
                    .collect()
            }
        }
    }

    fn collect_keys(&self, keys: impl IntoIterator<Item = Key>) -> Collection {
        let mut seen = BTreeSet::new();
        keys.into_iter()
            .filter(|key| seen.insert(key.clone()))
            .filter_map(|key| self.entities.get(&key).cloned())
            .collect()
    }

    /// All identities in the identity map, in load order.
    #[must_use]
    pub fn get_identity_values(&self) -> Vec<Value> {
        self.entities.keys().map(Key::to_value).collect()
    }

    /// Identity -> current value of `field`, for every entity in the map.
    #[must_use]
    pub fn get_field_values(&self, field: &str) -> IndexMap<Key, Value> {
        self.entities
            .iter()
            .map(|(key, entity)| (key.clone(), entity.value(field)))
            .collect()
    }

    // =========================================================================
    // MUTATION
    // =========================================================================

    /// Evict an entity from the identity map and every index.
    ///
    /// Returns `false` if the identity is not in the map, which includes
    /// identities that were already removed. Loading a row for a removed
    /// identity puts a fresh entity back in the map and forgets the removal,
    /// so that identity can be removed (and this returns `true`) again.
    pub fn remove_entity(&mut self, identity: impl Into<Value>) -> bool {
        let key = Key::from(identity.into());
        let Some(entity) = self.entities.shift_remove(&key) else {
            return false;
        };
        for index in self.indexes.values_mut() {
            index.remove(&key);
        }
        debug!(type_name = %self.name, identity = %key, "removed entity");
        self.removed.insert(key, entity);
        true
    }

    /// Set a field and keep the indexes in step.
    ///
    /// The identity field of a loaded or removed entity cannot be changed.
    /// Returns the previous value.
    pub fn set_field(
        &mut self,
        entity: &EntityRef,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, MarshalError> {
        let key = self.map_key(entity);
        if field == self.identity_field && (key.is_some() || self.is_removed(entity)) {
            return Err(MarshalError::IdentityImmutable {
                type_name: self.name.clone(),
                field: field.to_string(),
            });
        }

        let value = value.into();
        if let (Some(key), Some(index)) = (key, self.indexes.get_mut(field)) {
            index.insert(key, &value);
        }
        Ok(entity.set(field, value))
    }

    // =========================================================================
    // DIRTY TRACKING
    // =========================================================================

    /// The data an entity was created with, or `None` if this type does not
    /// track the entity.
    #[must_use]
    pub fn get_initial_data(&self, entity: &EntityRef) -> Option<Row> {
        self.status(entity)?;
        Some(entity.borrow().initial_data().clone())
    }

    /// Fields whose current value differs from the initial data, with their
    /// new values. Untracked entities report no changes.
    ///
    /// Values are compared loosely: `"69"` -> `69` is not a change, while
    /// `null` -> `0` and `"69"` -> `null` are.
    #[must_use]
    pub fn get_changed_fields(&self, entity: &EntityRef) -> Row {
        if self.status(entity).is_none() {
            return Row::new();
        }
        changed_fields(&entity.borrow())
    }

    /// Loaded entities with at least one changed field, keyed by identity.
    #[must_use]
    pub fn get_changed_entities(&self) -> IndexMap<Key, EntityRef> {
        self.entities
            .iter()
            .filter(|(_, entity)| !changed_fields(&entity.borrow()).is_empty())
            .map(|(key, entity)| (key.clone(), entity.clone()))
            .collect()
    }

    /// Entities created with `new_entity`, in creation order.
    #[must_use]
    pub fn get_new_entities(&self) -> &[EntityRef] {
        &self.new_entities
    }

    /// Entities evicted with `remove_entity`, keyed by identity.
    #[must_use]
    pub fn get_removed_entities(&self) -> &IndexMap<Key, EntityRef> {
        &self.removed
    }

    /// Where the entity sits in its lifecycle, or `None` if untracked.
    #[must_use]
    pub fn status(&self, entity: &EntityRef) -> Option<EntityStatus> {
        if self.map_key(entity).is_some() {
            let dirty = !changed_fields(&entity.borrow()).is_empty();
            return Some(if dirty {
                EntityStatus::Dirty
            } else {
                EntityStatus::Clean
            });
        }
        if self.new_entities.iter().any(|e| e.ptr_eq(entity)) {
            return Some(EntityStatus::New);
        }
        if self.is_removed(entity) {
            return Some(EntityStatus::Removed);
        }
        None
    }

    /// Identity-map slot of this exact instance. Tries the entity's current
    /// identity first, then scans in case the identity field was changed.
    fn map_key(&self, entity: &EntityRef) -> Option<Key> {
        find_slot(&self.entities, entity, &self.identity_field)
    }

    fn is_removed(&self, entity: &EntityRef) -> bool {
        find_slot(&self.removed, entity, &self.identity_field).is_some()
    }

    // =========================================================================
    // RELATIONS
    // =========================================================================

    /// Register a relation under a name. Fails without mutation if the name
    /// is taken.
    pub fn set_relation(
        &mut self,
        name: impl Into<String>,
        relation: Relation,
    ) -> Result<(), MarshalError> {
        let name = name.into();
        if self.relations.contains_key(&name) {
            return Err(MarshalError::DuplicateRelation {
                type_name: self.name.clone(),
                relation: name,
            });
        }
        debug!(type_name = %self.name, relation = %name, "registered relation");
        self.relations.insert(name, relation);
        Ok(())
    }

    /// Get a relation by name.
    #[must_use]
    pub fn get_relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    /// All relations, in registration order.
    pub fn relations(&self) -> impl Iterator<Item = (&str, &Relation)> {
        self.relations.iter().map(|(name, r)| (name.as_str(), r))
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn field_matches(entity: &EntityRef, field: &str, targets: &[Value]) -> bool {
    let entity = entity.borrow();
    let current = entity.get(field);
    targets
        .iter()
        .any(|target| current.map_or(target.is_null(), |value| value.loose_eq(target)))
}

fn changed_fields(entity: &Entity) -> Row {
    let initial = entity.initial_data();
    entity
        .data()
        .iter()
        .filter(|(field, new)| match initial.get(*field) {
            Some(old) => !new.loose_eq(old),
            None => !new.is_null(),
        })
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}

fn find_slot(map: &IndexMap<Key, EntityRef>, entity: &EntityRef, identity_field: &str) -> Option<Key> {
    let key = Key::from(entity.value(identity_field));
    if map.get(&key).is_some_and(|e| e.ptr_eq(entity)) {
        return Some(key);
    }
    map.iter()
        .find(|(_, e)| e.ptr_eq(entity))
        .map(|(key, _)| key.clone())
}

// =============================================================================
// TESTS
// =============================================================================
