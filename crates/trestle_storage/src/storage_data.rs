//! The shared internal state of snapshots and builders.

use std::sync::Arc;

use trestle_foundation::{EntityId, SymbolicEntityId, TrMap, TypeId};

use crate::entity_data::{Entity, EntityData};
use crate::family::EntityFamily;
use crate::indexes::StorageIndexes;
use crate::metadata::MetadataRegistry;
use crate::refs::RefsTable;

/// All state reachable from one storage revision.
///
/// Every container inside is persistent, so cloning the whole thing is
/// O(number of types) and a derived revision shares every untouched
/// sub-structure with its baseline.
#[derive(Clone, Debug)]
pub(crate) struct StorageData {
    pub(crate) registry: Arc<MetadataRegistry>,
    pub(crate) families: TrMap<TypeId, EntityFamily>,
    pub(crate) refs: RefsTable,
    pub(crate) indexes: StorageIndexes,
}

impl StorageData {
    pub(crate) fn empty(registry: Arc<MetadataRegistry>) -> Self {
        Self {
            registry,
            families: TrMap::new(),
            refs: RefsTable::new(),
            indexes: StorageIndexes::new(),
        }
    }

    /// Looks up the backing record for an id.
    pub(crate) fn entity_data(&self, id: EntityId) -> Option<&Arc<EntityData>> {
        self.families.get(&id.type_id)?.get(id.slot)
    }

    /// Wraps a record into the public entity view.
    pub(crate) fn make_entity(&self, data: &Arc<EntityData>) -> Entity {
        let metadata = self
            .registry
            .metadata_by_type_id(data.id.type_id)
            .expect("record carries a type id unknown to its own registry");
        Entity::new(Arc::clone(data), Arc::clone(metadata))
    }

    pub(crate) fn entity_by_symbolic_id(&self, id: &SymbolicEntityId) -> Option<&Arc<EntityData>> {
        let entity_id = self.indexes.entity_by_symbolic_id(id)?;
        self.entity_data(entity_id)
    }

    /// Live records of one type, in slot order.
    pub(crate) fn entities_of_type_id(
        &self,
        type_id: TypeId,
    ) -> impl Iterator<Item = &Arc<EntityData>> {
        self.families
            .get(&type_id)
            .into_iter()
            .flat_map(EntityFamily::iter)
    }

    /// Total live entity count across all types.
    pub(crate) fn entity_count(&self) -> usize {
        self.families.values().map(EntityFamily::live_count).sum()
    }
}
