//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the identity map:
//! - Field values and rows (`Value`, `Row`)
//! - Normalized lookup keys (`Key`)
//! - Error types (`MarshalError`)
//!
//! ## Equality
//!
//! Every comparison the identity map makes between field values goes
//! through [`Value::loose_eq`] or its hashable twin [`Key`]. The coercion
//! table lives in `value.rs` and nowhere else.

mod value;

pub use value::{Key, Row, Value};

use thiserror::Error;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while wiring or mutating the identity map.
///
/// Absence is never an error: a missing identity, an empty index bucket or
/// an unmatched relation all come back as `None` or an empty `Collection`.
/// Every variant here is a configuration or programmer mistake that the
/// caller must fix.
#[derive(Debug, Error)]
pub enum MarshalError {
    /// A type was configured without an identity field.
    #[error("No identity field specified for type '{0}'")]
    MissingIdentityField(String),

    /// A row handed to `load` has no usable identity value.
    #[error("Row {row} for type '{type_name}' has no identity value")]
    MissingIdentityValue { type_name: String, row: usize },

    /// The identity field cannot be changed through the type.
    #[error("Identity field '{field}' of type '{type_name}' is immutable")]
    IdentityImmutable { type_name: String, field: String },

    /// A type with this name is already registered.
    #[error("Type '{0}' is already registered")]
    DuplicateType(String),

    /// A relation with this name already exists on the type.
    #[error("Relation '{relation}' already exists on type '{type_name}'")]
    DuplicateRelation { type_name: String, relation: String },

    /// The requested type was never registered.
    #[error("Type '{0}' is not registered")]
    UnknownType(String),

    /// The requested relation does not exist on the type.
    #[error("Relation '{relation}' does not exist on type '{type_name}'")]
    UnknownRelation { type_name: String, relation: String },

    /// A relation descriptor is incomplete or inconsistent.
    #[error("Invalid relation '{relation}': {reason}")]
    InvalidRelation { relation: String, reason: String },

    /// A type cannot be dropped while a relation still points at it.
    #[error("Type '{type_name}' is still referenced by relation '{relation}'")]
    TypeInUse { type_name: String, relation: String },

    /// Schema or row data could not be parsed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
