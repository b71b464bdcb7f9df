//! # Relation
//!
//! A named edge from a native type to a foreign type. Types are referenced
//! by name and looked up through the [`Manager`] at resolution time, so a
//! relation never holds on to a type directly.
//!
//! Resolution is pull-based: nothing is resolved on load. [`Relation::resolve`]
//! reads the foreign side every time it is called; [`Manager::related`]
//! memoizes the result on the native entity.

use crate::collection::Collection;
use crate::config::{RelationDescriptor, Relationship};
use crate::entity::{Entity, EntityRef};
use crate::manager::Manager;
use crate::types::MarshalError;
use std::cell::RefCell;
use std::rc::Weak;

/// The associative type of a has-many-through relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Through {
    pub type_name: String,
    /// Field on the through type matching the native entity.
    pub native_field: String,
    /// Field on the through type pointing at the foreign entity.
    pub foreign_field: String,
}

/// Result of resolving a relation for one native entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Related {
    One(Option<EntityRef>),
    Many(Collection),
}

impl Related {
    /// The single entity, for one-to-one relations.
    #[must_use]
    pub fn entity(&self) -> Option<&EntityRef> {
        match self {
            Self::One(entity) => entity.as_ref(),
            Self::Many(_) => None,
        }
    }

    /// The collection, for collection-valued relations.
    #[must_use]
    pub fn collection(&self) -> Option<&Collection> {
        match self {
            Self::Many(collection) => Some(collection),
            Self::One(_) => None,
        }
    }

    /// Check if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(entity) => entity.is_none(),
            Self::Many(collection) => collection.is_empty(),
        }
    }

    /// Matched entities as a collection, whatever the cardinality.
    #[must_use]
    pub fn into_collection(self) -> Collection {
        match self {
            Self::One(entity) => entity.into_iter().collect(),
            Self::Many(collection) => collection,
        }
    }
}

/// Weak copy of a `Related` kept on the native entity.
///
/// Holding strong handles would form `Rc` cycles whenever two entities
/// cache each other.
#[derive(Debug)]
pub(crate) enum CachedRelated {
    One(Option<Weak<RefCell<Entity>>>),
    Many(Vec<Weak<RefCell<Entity>>>),
}

impl CachedRelated {
    /// Rebuild the strong result. `None` if any target has been dropped.
    pub(crate) fn upgrade(&self) -> Option<Related> {
        match self {
            Self::One(None) => Some(Related::One(None)),
            Self::One(Some(weak)) => EntityRef::from_weak(weak).map(|e| Related::One(Some(e))),
            Self::Many(weaks) => weaks
                .iter()
                .map(EntityRef::from_weak)
                .collect::<Option<Collection>>()
                .map(Related::Many),
        }
    }
}

impl From<&Related> for CachedRelated {
    fn from(related: &Related) -> Self {
        match related {
            Related::One(entity) => Self::One(entity.as_ref().map(EntityRef::downgrade)),
            Related::Many(collection) => {
                Self::Many(collection.iter().map(EntityRef::downgrade).collect())
            }
        }
    }
}

// =============================================================================
// RELATION
// =============================================================================

/// A named, typed edge between two entity types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    name: String,
    relationship: Relationship,
    native_type: String,
    native_field: String,
    foreign_type: String,
    foreign_field: String,
    through: Option<Through>,
}

impl Relation {
    /// Build a relation from its descriptor.
    ///
    /// The foreign type defaults to the relation name. Has-many-through
    /// requires the through type and both through fields.
    pub fn from_descriptor(
        native_type: &str,
        name: &str,
        descriptor: &RelationDescriptor,
    ) -> Result<Self, MarshalError> {
        let invalid = |reason: &str| MarshalError::InvalidRelation {
            relation: format!("{native_type}.{name}"),
            reason: reason.to_string(),
        };

        if descriptor.native_field.is_empty() {
            return Err(invalid("native_field is empty"));
        }
        if descriptor.foreign_field.is_empty() {
            return Err(invalid("foreign_field is empty"));
        }

        let through = match descriptor.relationship {
            Relationship::HasManyThrough => {
                let (Some(type_name), Some(native_field), Some(foreign_field)) = (
                    descriptor.through_type.as_deref(),
                    descriptor.through_native_field.as_deref(),
                    descriptor.through_foreign_field.as_deref(),
                ) else {
                    return Err(invalid(
                        "has_many_through needs through_type, through_native_field and through_foreign_field",
                    ));
                };
                Some(Through {
                    type_name: type_name.to_string(),
                    native_field: native_field.to_string(),
                    foreign_field: foreign_field.to_string(),
                })
            }
            _ => None,
        };

        Ok(Self {
            name: name.to_string(),
            relationship: descriptor.relationship,
            native_type: native_type.to_string(),
            native_field: descriptor.native_field.clone(),
            foreign_type: descriptor
                .foreign_type
                .clone()
                .unwrap_or_else(|| name.to_string()),
            foreign_field: descriptor.foreign_field.clone(),
            through,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn relationship(&self) -> Relationship {
        self.relationship
    }

    #[must_use]
    pub fn native_type(&self) -> &str {
        &self.native_type
    }

    #[must_use]
    pub fn native_field(&self) -> &str {
        &self.native_field
    }

    #[must_use]
    pub fn foreign_type(&self) -> &str {
        &self.foreign_type
    }

    #[must_use]
    pub fn foreign_field(&self) -> &str {
        &self.foreign_field
    }

    #[must_use]
    pub fn through(&self) -> Option<&Through> {
        self.through.as_ref()
    }

    /// Every type name this relation depends on.
    pub fn referenced_types(&self) -> impl Iterator<Item = &str> {
        [Some(self.native_type.as_str()), Some(self.foreign_type.as_str())]
            .into_iter()
            .chain(std::iter::once(self.through.as_ref().map(|t| t.type_name.as_str())))
            .flatten()
    }

    /// The "nothing matched" result for this cardinality.
    #[must_use]
    pub fn empty(&self) -> Related {
        if self.relationship.is_single() {
            Related::One(None)
        } else {
            Related::Many(Collection::new())
        }
    }

    /// Resolve the relation for one native entity.
    ///
    /// No match is not an error: single-valued relations give `One(None)`,
    /// the others an empty collection. A null or absent native field
    /// short-circuits to that empty result. Errors only come from
    /// unregistered type names.
    pub fn resolve(&self, manager: &Manager, entity: &EntityRef) -> Result<Related, MarshalError> {
        let value = entity.value(&self.native_field);
        if value.is_null() {
            return Ok(self.empty());
        }

        let foreign = manager.get_type(&self.foreign_type)?;
        match (self.relationship, &self.through) {
            (Relationship::BelongsTo | Relationship::HasOne, _) => Ok(Related::One(
                foreign.get_entity_by_field(&self.foreign_field, value),
            )),
            (Relationship::HasMany, _) => Ok(Related::Many(
                foreign.get_collection_by_field(&self.foreign_field, value),
            )),
            (Relationship::HasManyThrough, Some(through)) => {
                let through_type = manager.get_type(&through.type_name)?;
                let links = through_type.get_collection_by_field(&through.native_field, value);

                // One lookup per link keeps the foreign side in link order,
                // whatever lookup path the foreign field takes.
                let mut collection = Collection::new();
                for target in links.field_values(&through.foreign_field) {
                    if target.is_null() {
                        continue;
                    }
                    for foreign_entity in foreign.get_collection_by_field(&self.foreign_field, target) {
                        collection.push_unique(foreign_entity);
                    }
                }
                Ok(Related::Many(collection))
            }
            (Relationship::HasManyThrough, None) => Err(MarshalError::InvalidRelation {
                relation: format!("{}.{}", self.native_type, self.name),
                reason: "has_many_through without a through type".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_type_defaults_to_relation_name() {
        let descriptor = RelationDescriptor {
            foreign_type: None,
            ..RelationDescriptor::new(Relationship::HasMany, "", "id", "post_id")
        };
        let relation = Relation::from_descriptor("posts", "comments", &descriptor).expect("relation");
        assert_eq!(relation.foreign_type(), "comments");
        assert!(relation.through().is_none());
    }

    #[test]
    fn through_fields_are_required() {
        let descriptor = RelationDescriptor::new(Relationship::HasManyThrough, "tags", "id", "id");
        let result = Relation::from_descriptor("posts", "tags", &descriptor);
        assert!(matches!(result, Err(MarshalError::InvalidRelation { .. })));
    }

    #[test]
    fn referenced_types_include_through() {
        let descriptor = RelationDescriptor::new(Relationship::HasManyThrough, "tags", "id", "id")
            .through("posts_tags", "post_id", "tag_id");
        let relation = Relation::from_descriptor("posts", "tags", &descriptor).expect("relation");
        let names: Vec<_> = relation.referenced_types().collect();
        assert_eq!(names, vec!["posts", "tags", "posts_tags"]);
    }

    #[test]
    fn empty_result_matches_cardinality() {
        let one = Relation::from_descriptor(
            "posts",
            "author",
            &RelationDescriptor::new(Relationship::BelongsTo, "authors", "author_id", "id"),
        )
        .expect("relation");
        assert_eq!(one.empty(), Related::One(None));
        assert!(one.empty().is_empty());

        let many = Relation::from_descriptor(
            "authors",
            "posts",
            &RelationDescriptor::new(Relationship::HasMany, "posts", "id", "author_id"),
        )
        .expect("relation");
        assert!(many.empty().collection().is_some_and(Collection::is_empty));
    }
}
