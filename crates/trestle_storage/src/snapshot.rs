//! Immutable point-in-time storage snapshots.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use trestle_foundation::{EntityId, EntitySource, SymbolicEntityId};

use crate::entity_data::Entity;
use crate::instrumentation::EntityStorageInstrumentation;
use crate::metadata::MetadataRegistry;
use crate::storage_data::StorageData;

/// An immutable, internally-consistent view of the entity graph.
///
/// Snapshots never change after creation: a reader holding one observes the
/// same graph for as long as it keeps the reference, regardless of later
/// edits elsewhere. Cloning is O(1), and snapshots derived through a builder
/// share every untouched record with their baseline.
///
/// Entity views are materialized lazily on first access and cached. The
/// cache is shared by all clones of one snapshot and is safe to hit from
/// multiple threads; racing first accesses converge on a single instance.
#[derive(Clone)]
pub struct EntityStorageSnapshot {
    data: Arc<StorageData>,
    entity_cache: Arc<RwLock<HashMap<EntityId, Entity>>>,
}

impl EntityStorageSnapshot {
    /// Creates an empty snapshot over the given registry.
    #[must_use]
    pub fn empty(registry: Arc<MetadataRegistry>) -> Self {
        Self::from_data(Arc::new(StorageData::empty(registry)))
    }

    pub(crate) fn from_data(data: Arc<StorageData>) -> Self {
        Self {
            data,
            entity_cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub(crate) fn data(&self) -> &Arc<StorageData> {
        &self.data
    }

    /// The metadata registry this snapshot was built against.
    #[must_use]
    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.data.registry
    }

    /// The number of live entities across all types.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.data.entity_count()
    }

    /// Returns true if no entities are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entity_count() == 0
    }

    /// Live entities of one type, in allocation order.
    ///
    /// An unregistered type name yields an empty iterator.
    pub fn entities_of_type<'a>(&'a self, type_fqn: &str) -> impl Iterator<Item = Entity> + 'a {
        let type_id = self
            .data
            .registry
            .metadata_by_type_fqn_or_null(type_fqn)
            .map(|m| m.type_id());
        type_id.into_iter().flat_map(move |tid| {
            self.data
                .entities_of_type_id(tid)
                .map(move |record| self.initialize_entity(record.id, || self.data.make_entity(record)))
        })
    }

    /// Live entities whose source satisfies the filter.
    pub fn entities_by_source<'a, F>(&'a self, filter: F) -> impl Iterator<Item = Entity> + 'a
    where
        F: Fn(&EntitySource) -> bool + 'a,
    {
        self.data
            .indexes
            .sources()
            .filter(move |(source, _)| filter(source))
            .flat_map(|(_, bucket)| bucket.iter())
            .filter_map(move |id| self.resolve(*id))
    }

    /// The owned children of an entity, in attachment order.
    pub fn children(&self, id: EntityId) -> impl Iterator<Item = Entity> + '_ {
        self.data
            .refs
            .children_of(id)
            .filter_map(move |child| self.resolve(child))
    }

    /// The owning parent of an entity, if any.
    #[must_use]
    pub fn parent(&self, id: EntityId) -> Option<Entity> {
        self.resolve(self.data.refs.parent_of(id)?)
    }
}

fn read_cache(
    cache: &RwLock<HashMap<EntityId, Entity>>,
) -> std::sync::RwLockReadGuard<'_, HashMap<EntityId, Entity>> {
    cache.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_cache(
    cache: &RwLock<HashMap<EntityId, Entity>>,
) -> std::sync::RwLockWriteGuard<'_, HashMap<EntityId, Entity>> {
    cache.write().unwrap_or_else(PoisonError::into_inner)
}

impl EntityStorageInstrumentation for EntityStorageSnapshot {
    fn resolve(&self, id: EntityId) -> Option<Entity> {
        let record = self.data.entity_data(id)?;
        Some(self.initialize_entity(id, || self.data.make_entity(record)))
    }

    fn resolve_symbolic(&self, id: &SymbolicEntityId) -> Option<Entity> {
        let record = self.data.entity_by_symbolic_id(id)?;
        Some(self.initialize_entity(record.id, || self.data.make_entity(record)))
    }

    fn initialize_entity(&self, id: EntityId, factory: impl FnOnce() -> Entity) -> Entity {
        if let Some(found) = read_cache(&self.entity_cache).get(&id) {
            return found.clone();
        }
        // Construct outside the write lock; the first insert wins the race.
        let created = factory();
        write_cache(&self.entity_cache)
            .entry(id)
            .or_insert(created)
            .clone()
    }
}

impl std::fmt::Debug for EntityStorageSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStorageSnapshot")
            .field("entities", &self.entity_count())
            .field("types", &self.data.registry.type_count())
            .finish()
    }
}
