//! Stable, content-derived entity identity.

use std::fmt;
use std::sync::Arc;

/// Symbolic identity usable to resolve an entity without knowing its
/// internal [`EntityId`](crate::EntityId).
///
/// Required for entities that must stay referenceable across structural
/// rewrites (module or library identity). Within one snapshot the mapping
/// symbolic id -> entity is a bijection over entities that declare one.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct SymbolicEntityId {
    type_fqn: Arc<str>,
    name: Arc<str>,
}

impl SymbolicEntityId {
    /// Creates a symbolic id for the given entity type and name.
    #[must_use]
    pub fn new(type_fqn: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            type_fqn: type_fqn.into(),
            name: name.into(),
        }
    }

    /// The fully-qualified name of the entity type this id belongs to.
    #[must_use]
    pub fn type_fqn(&self) -> &str {
        &self.type_fqn
    }

    /// The content-derived name (e.g. a module name).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for SymbolicEntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolicEntityId({}:{})", self.type_fqn, self.name)
    }
}

impl fmt::Display for SymbolicEntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_fqn, self.name)
    }
}
