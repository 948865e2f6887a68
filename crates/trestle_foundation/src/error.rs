//! Error types for the Trestle storage engine.
//!
//! Uses `thiserror` for ergonomic error definition. All engine failures are
//! local and synchronous; nothing is retried internally.

use thiserror::Error;

use crate::entity::EntityId;
use crate::symbolic::SymbolicEntityId;
use crate::value::ValueType;

/// Convenient result alias for Trestle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Trestle operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a missing-type-metadata error.
    #[must_use]
    pub fn missing_type_metadata(type_fqn: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingTypeMetadata {
            type_fqn: type_fqn.into(),
        })
    }

    /// Creates a schema-mismatch error.
    #[must_use]
    pub fn schema_mismatch(type_fqn: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaMismatch {
            type_fqn: type_fqn.into(),
            detail: detail.into(),
        })
    }

    /// Creates a symbolic-id collision error.
    #[must_use]
    pub fn symbolic_id_collision(symbolic_id: SymbolicEntityId, existing: EntityId) -> Self {
        Self::new(ErrorKind::SymbolicIdCollision {
            symbolic_id,
            existing,
        })
    }

    /// Creates an entity-not-found error.
    #[must_use]
    pub fn entity_not_found(id: EntityId) -> Self {
        Self::new(ErrorKind::EntityNotFound(id))
    }

    /// Creates an unknown-property error.
    #[must_use]
    pub fn unknown_property(type_fqn: impl Into<String>, property: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownProperty {
            type_fqn: type_fqn.into(),
            property: property.into(),
        })
    }

    /// Creates a missing-required-property error.
    #[must_use]
    pub fn missing_required_property(
        type_fqn: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::MissingRequiredProperty {
            type_fqn: type_fqn.into(),
            property: property.into(),
        })
    }

    /// Creates a property-type-mismatch error.
    #[must_use]
    pub fn property_type_mismatch(
        property: impl Into<String>,
        expected: ValueType,
        actual: ValueType,
    ) -> Self {
        Self::new(ErrorKind::PropertyTypeMismatch {
            property: property.into(),
            expected,
            actual,
        })
    }

    /// Creates a reference-target-mismatch error.
    #[must_use]
    pub fn reference_target_mismatch(
        property: impl Into<String>,
        expected_fqn: impl Into<String>,
        actual_fqn: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::ReferenceTargetMismatch {
            property: property.into(),
            expected_fqn: expected_fqn.into(),
            actual_fqn: actual_fqn.into(),
        })
    }

    /// Creates an invalid-parent error.
    #[must_use]
    pub fn invalid_parent(parent: EntityId, detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParent {
            parent,
            detail: detail.into(),
        })
    }

    /// Creates a required-member-removal error.
    #[must_use]
    pub fn required_member_removal(member: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequiredMemberRemoval(member.into()))
    }

    /// Creates a persisted-format error.
    #[must_use]
    pub fn persist_format(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::PersistFormat(detail.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// No metadata descriptor is registered for a type name.
    #[error("no metadata registered for type: {type_fqn}")]
    MissingTypeMetadata {
        /// The fully-qualified type name that was looked up.
        type_fqn: String,
    },

    /// Persisted metadata for a type differs from the live registry.
    #[error("schema mismatch for type {type_fqn}: {detail}")]
    SchemaMismatch {
        /// The type whose descriptor differs.
        type_fqn: String,
        /// Description of the difference.
        detail: String,
    },

    /// An entity with the same symbolic id already exists.
    #[error("symbolic id already exists: {symbolic_id} (held by {existing:?})")]
    SymbolicIdCollision {
        /// The colliding symbolic id.
        symbolic_id: SymbolicEntityId,
        /// The entity currently holding that id.
        existing: EntityId,
    },

    /// Entity was not found in storage.
    #[error("entity not found: {0:?}")]
    EntityNotFound(EntityId),

    /// A property name is not declared in the type's metadata.
    #[error("unknown property {property} on type {type_fqn}")]
    UnknownProperty {
        /// The entity type that was being built or modified.
        type_fqn: String,
        /// The undeclared property name.
        property: String,
    },

    /// A non-optional property was not supplied.
    #[error("missing required property {property} on type {type_fqn}")]
    MissingRequiredProperty {
        /// The entity type that was being built or modified.
        type_fqn: String,
        /// The missing property name.
        property: String,
    },

    /// A property value does not match its declared type.
    #[error("type mismatch for property {property}: expected {expected}, got {actual}")]
    PropertyTypeMismatch {
        /// The property being set.
        property: String,
        /// The declared value type.
        expected: ValueType,
        /// The value type actually supplied.
        actual: ValueType,
    },

    /// A reference property points at an entity of the wrong type.
    #[error("reference {property} expects type {expected_fqn}, got {actual_fqn}")]
    ReferenceTargetMismatch {
        /// The reference property being set.
        property: String,
        /// The declared target type.
        expected_fqn: String,
        /// The type of the entity actually referenced.
        actual_fqn: String,
    },

    /// An owning parent is absent or not allowed to own this entity type.
    #[error("invalid parent {parent:?}: {detail}")]
    InvalidParent {
        /// The supplied parent id.
        parent: EntityId,
        /// Why the parent was rejected.
        detail: String,
    },

    /// A required member of a [`RequiredSet`](crate::RequiredSet) was removed.
    #[error("cannot remove required member: {0}")]
    RequiredMemberRemoval(String),

    /// Persisted data could not be decoded or carries an unsupported version.
    #[error("persisted format error: {0}")]
    PersistFormat(String),
}
