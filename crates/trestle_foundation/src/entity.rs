//! Entity identifiers addressing dense per-type storage.

use std::fmt;

/// Dense identifier for an entity type.
///
/// Assigned by the metadata registry at build time, in registration order.
/// A `TypeId` is only meaningful relative to the registry that produced it.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TypeId(u32);

impl TypeId {
    /// Creates a type id from a raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this type.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Entity identifier addressing one slot in a per-type backing array.
///
/// Slots are append-allocated and never recycled within a builder lineage:
/// once an entity is removed its slot stays vacant, so a stale `EntityId`
/// resolves to none instead of aliasing an unrelated entity.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct EntityId {
    /// The entity's type, as assigned by the metadata registry.
    pub type_id: TypeId,
    /// Slot index inside the per-type backing array.
    pub slot: u32,
}

impl EntityId {
    /// Creates an entity id from a type id and slot.
    #[must_use]
    pub const fn new(type_id: TypeId, slot: u32) -> Self {
        Self { type_id, slot }
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}:{})", self.type_id.index(), self.slot)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}:{})", self.type_id.index(), self.slot)
    }
}
