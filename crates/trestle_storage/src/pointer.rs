//! Lazy, non-owning entity references.

use std::fmt;
use std::sync::Arc;

use trestle_foundation::{EntityId, SymbolicEntityId};

use crate::entity_data::Entity;
use crate::instrumentation::EntityStorageInstrumentation;

/// A lazy, non-owning reference to an entity.
///
/// Stores a direct id or a symbolic id plus the expected entity type;
/// [`EntityPointer::resolve`] looks the target up in a supplied storage and
/// returns none if absent. A pointer never extends the lifetime of its
/// target and never itself owns the relationship: after the target is
/// removed, resolution simply yields none.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EntityPointer {
    target: PointerTarget,
    expected_type_fqn: Arc<str>,
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum PointerTarget {
    Direct(EntityId),
    Symbolic(SymbolicEntityId),
}

impl EntityPointer {
    /// Creates a pointer to a specific entity by its internal id.
    #[must_use]
    pub fn to_entity(entity: &Entity) -> Self {
        Self {
            target: PointerTarget::Direct(entity.id()),
            expected_type_fqn: Arc::from(entity.type_fqn()),
        }
    }

    /// Creates a pointer resolved through a symbolic id.
    ///
    /// Symbolic pointers survive structural rewrites that reassign internal
    /// ids, as long as the target keeps its symbolic identity.
    #[must_use]
    pub fn symbolic(id: SymbolicEntityId) -> Self {
        let expected_type_fqn = Arc::from(id.type_fqn());
        Self {
            target: PointerTarget::Symbolic(id),
            expected_type_fqn,
        }
    }

    /// The type the pointer expects its target to have.
    #[must_use]
    pub fn expected_type_fqn(&self) -> &str {
        &self.expected_type_fqn
    }

    /// Resolves the pointer against the supplied storage.
    ///
    /// Returns none when the target is absent or its type does not match
    /// the expectation. Unresolvable pointers are a normal outcome, not an
    /// error.
    #[must_use]
    pub fn resolve<S: EntityStorageInstrumentation>(&self, storage: &S) -> Option<Entity> {
        let entity = match &self.target {
            PointerTarget::Direct(id) => storage.resolve(*id)?,
            PointerTarget::Symbolic(id) => storage.resolve_symbolic(id)?,
        };
        if entity.type_fqn() == self.expected_type_fqn.as_ref() {
            Some(entity)
        } else {
            None
        }
    }

    /// Returns true if this pointer designates the given entity.
    #[must_use]
    pub fn is_pointer_to(&self, entity: &Entity) -> bool {
        match &self.target {
            PointerTarget::Direct(id) => *id == entity.id(),
            PointerTarget::Symbolic(id) => entity.symbolic_id() == Some(id),
        }
    }
}

impl fmt::Debug for EntityPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            PointerTarget::Direct(id) => write!(f, "EntityPointer({id:?})"),
            PointerTarget::Symbolic(id) => write!(f, "EntityPointer({id})"),
        }
    }
}
