//! The entity construction interception seam.

use trestle_foundation::{EntityId, SymbolicEntityId};

use crate::entity_data::Entity;

/// Interception layer shared by snapshots and builders.
///
/// Cross-cutting behavior (lazy-materialization caching, validation,
/// tracing) hooks in here, keeping the copy-on-write graph logic free of
/// auxiliary concerns. [`EntityPointer::resolve`](crate::EntityPointer::resolve)
/// works against any implementor, so pointers behave uniformly whether a
/// snapshot or an in-flight builder is supplied.
pub trait EntityStorageInstrumentation {
    /// O(1) lookup by internal id; none for vacated or unknown slots.
    fn resolve(&self, id: EntityId) -> Option<Entity>;

    /// Identity lookup; none if no entity declares `id` in this storage.
    fn resolve_symbolic(&self, id: &SymbolicEntityId) -> Option<Entity>;

    /// Returns a materialized entity for `id`, invoking `factory` only when
    /// no cached instance exists.
    ///
    /// Factories must be pure and idempotent: implementations may race
    /// concurrent first materializations and tolerate duplicate
    /// construction, converging on exactly one cached instance. Which racer
    /// wins is unspecified; all returned values are value-equal.
    fn initialize_entity(&self, id: EntityId, factory: impl FnOnce() -> Entity) -> Entity;
}
