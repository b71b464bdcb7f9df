//! # Manager
//!
//! Registry of every entity type by name. It is the only place types and
//! relations are registered, and the only way a relation reaches its
//! foreign type.
//!
//! There is no global instance: callers own a `Manager` and pass it to
//! whatever needs to resolve relations.

use crate::config::{RelationDescriptor, SchemaConfig, TypeConfig};
use crate::entity::EntityRef;
use crate::entity_type::EntityType;
use crate::relation::{Related, Relation};
use crate::types::{MarshalError, Row};
use indexmap::IndexMap;
use tracing::{debug, trace};

/// Registry of entity types and the relation graph between them.
#[derive(Debug, Default)]
pub struct Manager {
    types: IndexMap<String, EntityType>,
}

impl Manager {
    /// Create a new empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manager from a full schema.
    ///
    /// Every type is registered before any relation is wired, so a
    /// relation may name a type declared after its native type.
    pub fn from_schema(schema: &SchemaConfig) -> Result<Self, MarshalError> {
        let mut manager = Self::new();
        for (name, type_schema) in &schema.types {
            manager.register_type(name, &type_schema.config)?;
        }
        for (native, type_schema) in &schema.types {
            for (relation, descriptor) in &type_schema.relations {
                manager.register_relation(native, relation, descriptor)?;
            }
        }
        Ok(manager)
    }

    /// Register a new, empty type.
    pub fn register_type(
        &mut self,
        name: &str,
        config: &TypeConfig,
    ) -> Result<&mut EntityType, MarshalError> {
        if self.types.contains_key(name) {
            return Err(MarshalError::DuplicateType(name.to_string()));
        }
        let entity_type = EntityType::new(name, config)?;
        debug!(type_name = name, identity_field = %config.identity_field, "registered type");
        Ok(self
            .types
            .entry(name.to_string())
            .or_insert(entity_type))
    }

    /// Wire a relation onto its native type.
    ///
    /// Native, foreign and through types must all be registered already.
    pub fn register_relation(
        &mut self,
        native_type: &str,
        name: &str,
        descriptor: &RelationDescriptor,
    ) -> Result<(), MarshalError> {
        self.get_type(native_type)?;
        let relation = Relation::from_descriptor(native_type, name, descriptor)?;
        for type_name in relation.referenced_types() {
            self.get_type(type_name)?;
        }
        debug!(
            type_name = native_type,
            relation = name,
            foreign_type = relation.foreign_type(),
            "wired relation"
        );
        self.get_type_mut(native_type)?.set_relation(name, relation)
    }

    /// Get a type by name.
    ///
    /// An unregistered name is a wiring mistake, reported as
    /// `UnknownType` rather than as absence.
    pub fn get_type(&self, name: &str) -> Result<&EntityType, MarshalError> {
        self.types
            .get(name)
            .ok_or_else(|| MarshalError::UnknownType(name.to_string()))
    }

    /// Get a type by name, mutably.
    pub fn get_type_mut(&mut self, name: &str) -> Result<&mut EntityType, MarshalError> {
        self.types
            .get_mut(name)
            .ok_or_else(|| MarshalError::UnknownType(name.to_string()))
    }

    /// Check if a type is registered.
    #[must_use]
    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names, in registration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// All types, in registration order.
    pub fn types(&self) -> impl Iterator<Item = &EntityType> {
        self.types.values()
    }

    /// Bulk-load rows into a type. Returns the number inserted.
    pub fn load<I>(&mut self, type_name: &str, rows: I) -> Result<usize, MarshalError>
    where
        I: IntoIterator<Item = Row>,
    {
        self.get_type_mut(type_name)?.load(rows)
    }

    /// Unregister a type and hand it back.
    ///
    /// Fails if a relation on another type still references it.
    pub fn unset_type(&mut self, name: &str) -> Result<EntityType, MarshalError> {
        self.get_type(name)?;
        for other in self.types.values().filter(|t| t.name() != name) {
            for (relation_name, relation) in other.relations() {
                if relation.referenced_types().any(|t| t == name) {
                    return Err(MarshalError::TypeInUse {
                        type_name: name.to_string(),
                        relation: format!("{}.{}", other.name(), relation_name),
                    });
                }
            }
        }
        self.types
            .shift_remove(name)
            .ok_or_else(|| MarshalError::UnknownType(name.to_string()))
    }

    /// Look up a relation on a type.
    pub fn get_relation(&self, type_name: &str, relation: &str) -> Result<&Relation, MarshalError> {
        self.get_type(type_name)?
            .get_relation(relation)
            .ok_or_else(|| MarshalError::UnknownRelation {
                type_name: type_name.to_string(),
                relation: relation.to_string(),
            })
    }

    /// Resolve a relation for an entity, without caching.
    pub fn resolve(
        &self,
        type_name: &str,
        relation: &str,
        entity: &EntityRef,
    ) -> Result<Related, MarshalError> {
        self.get_relation(type_name, relation)?.resolve(self, entity)
    }

    /// Resolve a relation for an entity, at most once.
    ///
    /// The first call resolves and memoizes the result on the entity;
    /// later calls return the memoized result without touching the foreign
    /// type. A memo whose targets have since been dropped is resolved again.
    pub fn related(
        &self,
        type_name: &str,
        relation: &str,
        entity: &EntityRef,
    ) -> Result<Related, MarshalError> {
        if let Some(cached) = entity.borrow().cached_related(relation) {
            trace!(type_name, relation, "relation cache hit");
            return Ok(cached);
        }
        let related = self.resolve(type_name, relation, entity)?;
        entity.borrow_mut().cache_related(relation, &related);
        Ok(related)
    }
}

// =============================================================================
// TESTS
// =============================================================================
