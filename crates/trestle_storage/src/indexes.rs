//! Secondary indexes over entity records.

use trestle_foundation::{EntityId, EntitySource, SymbolicEntityId, TrMap, TrSet};

/// Symbolic-id and entity-source indexes.
///
/// The symbolic index enforces the bijection between declared symbolic ids
/// and entities within one storage state; the source index backs
/// provenance-filtered traversal. Persistent maps keep both O(1) to clone.
#[derive(Clone, Debug, Default)]
pub(crate) struct StorageIndexes {
    symbolic_ids: TrMap<SymbolicEntityId, EntityId>,
    sources: TrMap<EntitySource, TrSet<EntityId>>,
}

impl StorageIndexes {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn entity_by_symbolic_id(&self, id: &SymbolicEntityId) -> Option<EntityId> {
        self.symbolic_ids.get(id).copied()
    }

    pub(crate) fn entity_added(
        &mut self,
        id: EntityId,
        symbolic_id: Option<&SymbolicEntityId>,
        source: &EntitySource,
    ) {
        if let Some(symbolic) = symbolic_id {
            self.symbolic_ids = self.symbolic_ids.insert(symbolic.clone(), id);
        }
        let bucket = self
            .sources
            .get(source)
            .cloned()
            .unwrap_or_default()
            .insert(id);
        self.sources = self.sources.insert(source.clone(), bucket);
    }

    pub(crate) fn entity_removed(
        &mut self,
        id: EntityId,
        symbolic_id: Option<&SymbolicEntityId>,
        source: &EntitySource,
    ) {
        if let Some(symbolic) = symbolic_id {
            // Only drop the entry if it still points at this entity
            if self.symbolic_ids.get(symbolic) == Some(&id) {
                self.symbolic_ids = self.symbolic_ids.remove(symbolic);
            }
        }
        if let Some(bucket) = self.sources.get(source) {
            let remaining = bucket.remove(&id);
            self.sources = if remaining.is_empty() {
                self.sources.remove(source)
            } else {
                self.sources.insert(source.clone(), remaining)
            };
        }
    }

    pub(crate) fn symbolic_id_changed(
        &mut self,
        id: EntityId,
        before: Option<&SymbolicEntityId>,
        after: Option<&SymbolicEntityId>,
    ) {
        if before == after {
            return;
        }
        if let Some(old) = before {
            if self.symbolic_ids.get(old) == Some(&id) {
                self.symbolic_ids = self.symbolic_ids.remove(old);
            }
        }
        if let Some(new) = after {
            self.symbolic_ids = self.symbolic_ids.insert(new.clone(), id);
        }
    }

    pub(crate) fn sources(&self) -> impl Iterator<Item = (&EntitySource, &TrSet<EntityId>)> {
        self.sources.iter()
    }
}
