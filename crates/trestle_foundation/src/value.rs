//! Field values carried by entities.

use std::fmt;
use std::sync::Arc;

use crate::collections::TrVec;
use crate::entity::EntityId;

/// A scalar or reference value stored in an entity property.
///
/// Values are immutable; collection variants use persistent vectors so
/// cloning an entity's field map is cheap.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// Immutable string.
    Str(Arc<str>),
    /// Ordered list of values.
    List(TrVec<Value>),
    /// Non-owning reference to another entity.
    EntityRef(EntityId),
}

impl Value {
    /// Creates a string value.
    #[must_use]
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Self::Str(s.into())
    }

    /// Returns the type tag of this value.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Str(_) => ValueType::Str,
            Self::List(_) => ValueType::List,
            Self::EntityRef(_) => ValueType::EntityRef,
        }
    }

    /// Returns the referenced entity id, if this is an [`Value::EntityRef`].
    #[must_use]
    pub fn as_entity_ref(&self) -> Option<EntityId> {
        match self {
            Self::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the string content, if this is a [`Value::Str`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.into())
    }
}

impl From<EntityId> for Value {
    fn from(id: EntityId) -> Self {
        Self::EntityRef(id)
    }
}

/// Type tag for schema validation of property values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Boolean.
    Bool,
    /// Integer.
    Int,
    /// String.
    Str,
    /// List of values.
    List,
    /// Entity reference.
    EntityRef,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Str => "str",
            Self::List => "list",
            Self::EntityRef => "entity-ref",
        };
        write!(f, "{name}")
    }
}
