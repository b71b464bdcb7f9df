//! # marshal-core
//!
//! In-memory identity map and relation resolver for rows fetched from a
//! data source.
//!
//! Rows are loaded into per-type identity maps, where each row becomes a
//! single shared entity instance keyed by its identity field. Secondary
//! indexes speed up field lookups, and a dirty tracker reports which loaded
//! entities have changed. Named relations between types are resolved on
//! demand against whatever is currently loaded.
//!
//! ## Architectural Constraints
//!
//! - No I/O: rows come in already fetched, nothing is written back
//! - Single-threaded: entities are shared through `Rc<RefCell<_>>`
//! - Deterministic: identity maps, buckets and relation results keep
//!   insertion order
//! - No globals: every type lives in a caller-owned [`Manager`]

// =============================================================================
// MODULES
// =============================================================================

pub mod collection;
pub mod config;
pub mod entity;
pub mod entity_type;
pub mod index;
pub mod manager;
pub mod relation;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Key, MarshalError, Row, Value};

// =============================================================================
// RE-EXPORTS: Identity Map
// =============================================================================

pub use collection::Collection;
pub use entity::{Entity, EntityRef, EntityState};
pub use entity_type::{EntityStatus, EntityType, LookupPath};
pub use index::Index;
pub use manager::Manager;
pub use relation::{Related, Relation, Through};

// =============================================================================
// RE-EXPORTS: Configuration
// =============================================================================

pub use config::{RelationDescriptor, Relationship, SchemaConfig, TypeConfig, TypeSchema};
