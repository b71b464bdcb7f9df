//! # Schema Configuration
//!
//! Serde-friendly descriptions of types and relations. The core never reads
//! files; the app parses these from TOML and hands them to the `Manager`.
//!
//! ```toml
//! [types.posts]
//! identity_field = "id"
//! index_fields = ["author_id"]
//!
//! [types.posts.relations.author]
//! relationship = "belongs_to"
//! foreign_type = "authors"
//! native_field = "author_id"
//! foreign_field = "id"
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Shape of an association between two types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    /// The native row holds the foreign key. Resolves to one entity.
    BelongsTo,
    /// The foreign row holds the key. Resolves to one entity.
    HasOne,
    /// The foreign rows hold the key. Resolves to a collection.
    HasMany,
    /// Joined through an associative type. Resolves to a collection.
    HasManyThrough,
}

impl Relationship {
    /// Check if the relation resolves to a single entity.
    #[must_use]
    pub fn is_single(self) -> bool {
        matches!(self, Self::BelongsTo | Self::HasOne)
    }
}

/// How to build one relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    pub relationship: Relationship,
    /// Defaults to the relation name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_type: Option<String>,
    pub native_field: String,
    pub foreign_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through_native_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through_foreign_field: Option<String>,
}

impl RelationDescriptor {
    /// Descriptor for a direct (non-through) relation.
    #[must_use]
    pub fn new(
        relationship: Relationship,
        foreign_type: impl Into<String>,
        native_field: impl Into<String>,
        foreign_field: impl Into<String>,
    ) -> Self {
        Self {
            relationship,
            foreign_type: Some(foreign_type.into()),
            native_field: native_field.into(),
            foreign_field: foreign_field.into(),
            through_type: None,
            through_native_field: None,
            through_foreign_field: None,
        }
    }

    /// Add the associative type of a has-many-through relation.
    #[must_use]
    pub fn through(
        mut self,
        through_type: impl Into<String>,
        through_native_field: impl Into<String>,
        through_foreign_field: impl Into<String>,
    ) -> Self {
        self.through_type = Some(through_type.into());
        self.through_native_field = Some(through_native_field.into());
        self.through_foreign_field = Some(through_foreign_field.into());
        self
    }
}

/// Identity and index settings for one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeConfig {
    pub identity_field: String,
    #[serde(default)]
    pub index_fields: Vec<String>,
}

impl TypeConfig {
    /// Config with an identity field and no indexes.
    #[must_use]
    pub fn new(identity_field: impl Into<String>) -> Self {
        Self {
            identity_field: identity_field.into(),
            index_fields: Vec::new(),
        }
    }

    /// Add secondary index fields.
    #[must_use]
    pub fn with_index_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.index_fields.extend(fields.into_iter().map(Into::into));
        self
    }
}

/// A type together with the relations whose native side it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSchema {
    #[serde(flatten)]
    pub config: TypeConfig,
    #[serde(default)]
    pub relations: IndexMap<String, RelationDescriptor>,
}

/// Every type of an application, keyed by type name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub types: IndexMap<String, TypeSchema>,
}
