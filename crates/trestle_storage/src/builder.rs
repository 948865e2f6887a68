//! The mutable edit session over a snapshot.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use trestle_foundation::{
    EntityId, EntitySource, Error, Result, SymbolicEntityId, TrMap, TrVec, Value, ValueType,
};

use crate::entity_data::{Entity, EntityData};
use crate::instrumentation::EntityStorageInstrumentation;
use crate::metadata::{MetadataRegistry, PropertyKind, PropertyMetadata};
use crate::snapshot::EntityStorageSnapshot;
use crate::storage_data::StorageData;

/// A mutable edit session derived from a snapshot.
///
/// Edits are validated eagerly and applied atomically per operation: a
/// rejected operation leaves the session exactly as it was. The baseline
/// snapshot is never affected. [`MutableEntityStorage::to_snapshot`]
/// freezes the accumulated state into a new immutable snapshot that shares
/// every untouched record with the baseline.
pub struct MutableEntityStorage {
    data: StorageData,
    change_log: ChangeLog,
    modification_count: u64,
}

impl MutableEntityStorage {
    /// Starts an edit session on top of a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &EntityStorageSnapshot) -> Self {
        Self {
            data: (**snapshot.data()).clone(),
            change_log: ChangeLog::default(),
            modification_count: 0,
        }
    }

    /// The metadata registry this session validates against.
    #[must_use]
    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.data.registry
    }

    /// The number of live entities in the session's current state.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.data.entity_count()
    }

    /// Incremented once per successful mutating operation.
    #[must_use]
    pub fn modification_count(&self) -> u64 {
        self.modification_count
    }

    /// Returns true if the session holds uncommitted changes.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.change_log.is_empty()
    }

    /// Adds a new entity, returning its allocated id.
    ///
    /// The whole request is validated before any state changes; on error
    /// the session is untouched.
    ///
    /// # Errors
    ///
    /// Fails when the type is unregistered, a property is undeclared or
    /// mistyped, a required property or symbolic id is missing, the
    /// symbolic id is already taken, or the parent is absent or not a
    /// permitted owner.
    pub fn add_entity(&mut self, new: NewEntity) -> Result<EntityId> {
        let metadata = Arc::clone(self.data.registry.metadata_by_type_fqn(&new.type_fqn)?);

        let mut fields: TrMap<u32, Value> = TrMap::new();
        for (name, value) in &new.fields {
            let index = metadata
                .property_index(name)
                .ok_or_else(|| Error::unknown_property(metadata.fqn(), name.as_ref()))?;
            let prop = &metadata.properties()[index as usize];
            validate_value(&self.data.registry, prop, value)?;
            fields = fields.insert(index, value.clone());
        }
        for (i, prop) in metadata.properties().iter().enumerate() {
            let index = u32::try_from(i).unwrap_or(u32::MAX);
            if !prop.is_optional() && !fields.contains_key(&index) {
                return Err(Error::missing_required_property(metadata.fqn(), prop.name()));
            }
        }

        let symbolic_id = match (&new.symbolic_name, metadata.has_symbolic_id()) {
            (Some(name), true) => {
                let symbolic = SymbolicEntityId::new(metadata.fqn(), name.as_ref());
                if let Some(existing) = self.data.indexes.entity_by_symbolic_id(&symbolic) {
                    return Err(Error::symbolic_id_collision(symbolic, existing));
                }
                Some(symbolic)
            }
            (None, true) => {
                return Err(Error::missing_required_property(
                    metadata.fqn(),
                    "symbolic id",
                ));
            }
            (Some(_), false) => {
                return Err(Error::unknown_property(metadata.fqn(), "symbolic id"));
            }
            (None, false) => None,
        };

        if let Some(parent) = new.parent {
            if self.data.entity_data(parent).is_none() {
                return Err(Error::invalid_parent(parent, "parent entity not found"));
            }
            let parent_fqn = self
                .data
                .registry
                .metadata_by_type_id(parent.type_id)
                .map_or("<unregistered>", |m| m.fqn());
            if !metadata.owners().iter().any(|o| o.as_ref() == parent_fqn) {
                return Err(Error::invalid_parent(
                    parent,
                    format!("{parent_fqn} may not own {}", metadata.fqn()),
                ));
            }
        }

        // Validation complete; commit.
        let type_id = metadata.type_id();
        let mut family = self
            .data
            .families
            .get(&type_id)
            .cloned()
            .unwrap_or_default();
        let id = EntityId::new(type_id, family.next_slot());
        let record = Arc::new(EntityData {
            id,
            source: new.source.clone(),
            symbolic_id,
            fields,
        });
        family.add(Arc::clone(&record));
        self.data.families = self.data.families.insert(type_id, family);
        self.data
            .indexes
            .entity_added(id, record.symbolic_id.as_ref(), &record.source);
        if let Some(parent) = new.parent {
            self.data.refs.attach(parent, id);
        }
        self.change_log.record_added(Entity::new(record, metadata));
        self.modification_count += 1;
        Ok(id)
    }

    /// Modifies an existing entity through an [`EntityUpdater`].
    ///
    /// All requested operations are validated against the current state and
    /// applied as one atomic replacement; on error nothing changes. The
    /// entity source is not editable. Returns the updated entity view.
    ///
    /// # Errors
    ///
    /// Fails when the entity is absent, an operation names an undeclared
    /// property, a value is mistyped, a required property is cleared, or a
    /// symbolic id change collides with another entity.
    pub fn modify_entity(
        &mut self,
        id: EntityId,
        mutate: impl FnOnce(&mut EntityUpdater),
    ) -> Result<Entity> {
        let old_record = self
            .data
            .entity_data(id)
            .cloned()
            .ok_or_else(|| Error::entity_not_found(id))?;
        let metadata = Arc::clone(
            self.data
                .registry
                .metadata_by_type_id(id.type_id)
                .ok_or_else(|| Error::entity_not_found(id))?,
        );

        let mut updater = EntityUpdater { ops: Vec::new() };
        mutate(&mut updater);

        let mut fields = old_record.fields.clone();
        let mut symbolic_id = old_record.symbolic_id.clone();
        for op in updater.ops {
            match op {
                UpdateOp::SetField(name, value) => {
                    let index = metadata
                        .property_index(&name)
                        .ok_or_else(|| Error::unknown_property(metadata.fqn(), name.as_ref()))?;
                    let prop = &metadata.properties()[index as usize];
                    validate_value(&self.data.registry, prop, &value)?;
                    fields = fields.insert(index, value);
                }
                UpdateOp::ClearField(name) => {
                    let index = metadata
                        .property_index(&name)
                        .ok_or_else(|| Error::unknown_property(metadata.fqn(), name.as_ref()))?;
                    let prop = &metadata.properties()[index as usize];
                    if !prop.is_optional() {
                        return Err(Error::missing_required_property(
                            metadata.fqn(),
                            prop.name(),
                        ));
                    }
                    fields = fields.remove(&index);
                }
                UpdateOp::SetSymbolicName(name) => {
                    if !metadata.has_symbolic_id() {
                        return Err(Error::unknown_property(metadata.fqn(), "symbolic id"));
                    }
                    symbolic_id = Some(SymbolicEntityId::new(metadata.fqn(), name.as_ref()));
                }
            }
        }

        if let Some(new_symbolic) = &symbolic_id {
            if old_record.symbolic_id.as_ref() != Some(new_symbolic) {
                if let Some(existing) = self.data.indexes.entity_by_symbolic_id(new_symbolic) {
                    if existing != id {
                        return Err(Error::symbolic_id_collision(new_symbolic.clone(), existing));
                    }
                }
            }
        }

        if fields == old_record.fields && symbolic_id == old_record.symbolic_id {
            return Ok(Entity::new(old_record, metadata));
        }

        let new_record = Arc::new(EntityData {
            id,
            source: old_record.source.clone(),
            symbolic_id,
            fields,
        });
        let mut family = self
            .data
            .families
            .get(&id.type_id)
            .cloned()
            .unwrap_or_default();
        family.replace(id.slot, Arc::clone(&new_record));
        self.data.families = self.data.families.insert(id.type_id, family);
        self.data.indexes.symbolic_id_changed(
            id,
            old_record.symbolic_id.as_ref(),
            new_record.symbolic_id.as_ref(),
        );

        let old_entity = Entity::new(old_record, Arc::clone(&metadata));
        let new_entity = Entity::new(new_record, metadata);
        self.change_log
            .record_replaced(old_entity, new_entity.clone());
        self.modification_count += 1;
        Ok(new_entity)
    }

    /// Removes an entity and, transitively, everything it owns.
    ///
    /// Owned subtrees are removed children-first, so the change log lists
    /// every removed child before its parent. Non-owning references to
    /// removed entities are left in place and simply stop resolving.
    ///
    /// # Errors
    ///
    /// Fails when the entity is absent.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<()> {
        if self.data.entity_data(id).is_none() {
            return Err(Error::entity_not_found(id));
        }
        let mut doomed = Vec::new();
        self.accumulate_removals(id, &mut doomed);

        for victim in doomed {
            let mut family = self
                .data
                .families
                .get(&victim.type_id)
                .cloned()
                .unwrap_or_default();
            let Some(old_record) = family.vacate(victim.slot) else {
                continue;
            };
            self.data.families = self.data.families.insert(victim.type_id, family);
            self.data.refs.detach(victim);
            self.data.refs.drop_parent_entry(victim);
            self.data
                .indexes
                .entity_removed(victim, old_record.symbolic_id.as_ref(), &old_record.source);
            let entity = self.data.make_entity(&old_record);
            self.change_log.record_removed(entity);
        }
        self.modification_count += 1;
        Ok(())
    }

    /// Replaces every entity whose source matches `filter` with the
    /// matching-source contents of `replacement`.
    ///
    /// This is the bulk-import path for a provenance boundary: an external
    /// system re-imports its slice of the model without touching entities
    /// it does not own. Matched entities in the current state are removed
    /// (cascading over owned children), then the replacement's matched
    /// entities are imported with freshly allocated ids, parents before
    /// children. Owning links and `EntityRef` fields between two imported
    /// entities are rewritten to the new ids; links that cross the
    /// provenance boundary are reconnected through the counterpart's
    /// symbolic id. Everything flows through the ordinary change log, so
    /// subscribers see one coherent batch of removals and additions.
    ///
    /// The operation is atomic: on any error the session is exactly as it
    /// was before the call.
    ///
    /// # Errors
    ///
    /// Fails when `replacement` was built against a different registry,
    /// when an imported symbolic id collides with a surviving entity, or
    /// when a boundary-crossing link has no counterpart resolvable by
    /// symbolic id in the current state.
    pub fn replace_by_source<F>(
        &mut self,
        filter: F,
        replacement: &EntityStorageSnapshot,
    ) -> Result<()>
    where
        F: Fn(&EntitySource) -> bool,
    {
        if !Arc::ptr_eq(&self.data.registry, replacement.registry()) {
            return Err(Error::schema_mismatch(
                "<registry>",
                "replacement snapshot uses a different metadata registry",
            ));
        }

        let backup_data = self.data.clone();
        let backup_log = self.change_log.clone();
        let backup_count = self.modification_count;
        match self.apply_replacement(&filter, replacement.data()) {
            Ok(()) => {
                self.modification_count = backup_count + 1;
                Ok(())
            }
            Err(err) => {
                self.data = backup_data;
                self.change_log = backup_log;
                self.modification_count = backup_count;
                Err(err)
            }
        }
    }

    fn apply_replacement<F>(&mut self, filter: &F, incoming: &StorageData) -> Result<()>
    where
        F: Fn(&EntitySource) -> bool,
    {
        // Drop the current matched subset. An id gathered here may already
        // be gone when its turn comes, removed by an ancestor's cascade.
        let doomed: Vec<EntityId> = self
            .data
            .indexes
            .sources()
            .filter(|(source, _)| filter(source))
            .flat_map(|(_, bucket)| bucket.iter().copied())
            .collect();
        for id in doomed {
            if self.data.entity_data(id).is_some() {
                self.remove_entity(id)?;
            }
        }

        // Gather the replacement's matched subset in dense type order so
        // the import (and the change log) is deterministic.
        let mut matched: Vec<Arc<EntityData>> = Vec::new();
        for metadata in incoming.registry.types() {
            for record in incoming.entities_of_type_id(metadata.type_id()) {
                if filter(&record.source) {
                    matched.push(Arc::clone(record));
                }
            }
        }
        let mut import = ReplacementImport {
            incoming,
            filter,
            matched_ids: matched.iter().map(|r| r.id).collect(),
            id_map: HashMap::new(),
            order: Vec::new(),
        };

        // Import subtree-by-subtree, starting from entities whose parent
        // is outside the matched subset (or absent).
        for record in &matched {
            let parent = incoming.refs.parent_of(record.id);
            if parent.is_some_and(|p| import.matched_ids.contains(&p)) {
                continue;
            }
            let attach_to = match parent {
                Some(p) => Some(self.boundary_parent(p, incoming)?),
                None => None,
            };
            self.import_subtree(record, attach_to, &mut import)?;
        }

        // Rewrite imported cross-references now that every new id is known.
        let ReplacementImport { id_map, order, .. } = import;
        for new_id in order {
            let record = self
                .data
                .entity_data(new_id)
                .cloned()
                .ok_or_else(|| Error::entity_not_found(new_id))?;
            let mut fields = TrMap::new();
            let mut changed = false;
            for (index, value) in record.fields.iter() {
                let rewritten = self.remap_value(value, &id_map, incoming)?;
                changed |= rewritten != *value;
                fields = fields.insert(*index, rewritten);
            }
            let final_record = if changed {
                let rewritten = Arc::new(EntityData {
                    id: record.id,
                    source: record.source.clone(),
                    symbolic_id: record.symbolic_id.clone(),
                    fields,
                });
                let mut family = self
                    .data
                    .families
                    .get(&new_id.type_id)
                    .cloned()
                    .unwrap_or_default();
                family.replace(new_id.slot, Arc::clone(&rewritten));
                self.data.families = self.data.families.insert(new_id.type_id, family);
                rewritten
            } else {
                record
            };
            let entity = self.data.make_entity(&final_record);
            self.change_log.record_added(entity);
        }
        Ok(())
    }

    // Resolves the current-state owner for an imported entity whose parent
    // in the replacement lies outside the matched subset.
    fn boundary_parent(&self, parent: EntityId, incoming: &StorageData) -> Result<EntityId> {
        let record = incoming
            .entity_data(parent)
            .ok_or_else(|| Error::entity_not_found(parent))?;
        let symbolic = record.symbolic_id.as_ref().ok_or_else(|| {
            Error::invalid_parent(parent, "boundary parent declares no symbolic id")
        })?;
        self.data
            .indexes
            .entity_by_symbolic_id(symbolic)
            .ok_or_else(|| {
                Error::invalid_parent(parent, format!("no current entity holds {symbolic}"))
            })
    }

    fn import_subtree<F>(
        &mut self,
        record: &EntityData,
        parent: Option<EntityId>,
        import: &mut ReplacementImport<'_, F>,
    ) -> Result<()>
    where
        F: Fn(&EntitySource) -> bool,
    {
        if let Some(symbolic) = &record.symbolic_id {
            if let Some(existing) = self.data.indexes.entity_by_symbolic_id(symbolic) {
                return Err(Error::symbolic_id_collision(symbolic.clone(), existing));
            }
        }

        let type_id = record.id.type_id;
        let mut family = self
            .data
            .families
            .get(&type_id)
            .cloned()
            .unwrap_or_default();
        let new_id = EntityId::new(type_id, family.next_slot());
        // Fields still carry replacement-side ids here; the caller rewrites
        // them once the whole subset is in.
        let imported = Arc::new(EntityData {
            id: new_id,
            source: record.source.clone(),
            symbolic_id: record.symbolic_id.clone(),
            fields: record.fields.clone(),
        });
        family.add(Arc::clone(&imported));
        self.data.families = self.data.families.insert(type_id, family);
        self.data
            .indexes
            .entity_added(new_id, imported.symbolic_id.as_ref(), &imported.source);
        if let Some(parent) = parent {
            self.data.refs.attach(parent, new_id);
        }
        import.id_map.insert(record.id, new_id);
        import.order.push(new_id);

        let kids: Vec<EntityId> = import.incoming.refs.children_of(record.id).collect();
        for kid in kids {
            let Some(kid_record) = import.incoming.entity_data(kid).cloned() else {
                continue;
            };
            if (import.filter)(&kid_record.source) {
                self.import_subtree(&kid_record, Some(new_id), import)?;
            }
        }
        Ok(())
    }

    fn remap_value(
        &self,
        value: &Value,
        id_map: &HashMap<EntityId, EntityId>,
        incoming: &StorageData,
    ) -> Result<Value> {
        match value {
            Value::EntityRef(target) => {
                Ok(Value::EntityRef(self.remap_ref(*target, id_map, incoming)?))
            }
            Value::List(items) => {
                let mut rewritten = TrVec::new();
                for item in items.iter() {
                    rewritten = rewritten.push_back(self.remap_value(item, id_map, incoming)?);
                }
                Ok(Value::List(rewritten))
            }
            other => Ok(other.clone()),
        }
    }

    // A reference inside the imported subset either points at another
    // imported entity or crosses the provenance boundary; boundary targets
    // are reconnected through their symbolic id.
    fn remap_ref(
        &self,
        target: EntityId,
        id_map: &HashMap<EntityId, EntityId>,
        incoming: &StorageData,
    ) -> Result<EntityId> {
        if let Some(mapped) = id_map.get(&target) {
            return Ok(*mapped);
        }
        let record = incoming
            .entity_data(target)
            .ok_or_else(|| Error::entity_not_found(target))?;
        let symbolic = record
            .symbolic_id
            .as_ref()
            .ok_or_else(|| Error::entity_not_found(target))?;
        self.data
            .indexes
            .entity_by_symbolic_id(symbolic)
            .ok_or_else(|| Error::entity_not_found(target))
    }

    /// Freezes the session into an immutable snapshot and resets the
    /// change log.
    ///
    /// The session stays usable; further edits accumulate toward the next
    /// snapshot.
    pub fn to_snapshot(&mut self) -> EntityStorageSnapshot {
        self.change_log.clear();
        EntityStorageSnapshot::from_data(Arc::new(self.data.clone()))
    }

    /// The changes accumulated since the session started or was last
    /// frozen, coalesced per entity, in first-touch order.
    #[must_use]
    pub fn collect_changes(&self) -> Vec<EntityChange> {
        self.change_log.collect()
    }

    /// Live entities of one type in the session's current state, in
    /// allocation order.
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
                .map(|record| self.data.make_entity(record))
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
            .filter_map(|child| self.resolve(child))
    }

    /// The owning parent of an entity, if any.
    #[must_use]
    pub fn parent(&self, id: EntityId) -> Option<Entity> {
        self.resolve(self.data.refs.parent_of(id)?)
    }

    // Children-first postorder over the ownership tree.
    fn accumulate_removals(&self, id: EntityId, out: &mut Vec<EntityId>) {
        let children: Vec<EntityId> = self.data.refs.children_of(id).collect();
        for child in children {
            self.accumulate_removals(child, out);
        }
        out.push(id);
    }
}

impl EntityStorageInstrumentation for MutableEntityStorage {
    fn resolve(&self, id: EntityId) -> Option<Entity> {
        let record = self.data.entity_data(id)?;
        Some(self.data.make_entity(record))
    }

    fn resolve_symbolic(&self, id: &SymbolicEntityId) -> Option<Entity> {
        let record = self.data.entity_by_symbolic_id(id)?;
        Some(self.data.make_entity(record))
    }

    // Sessions have no cache; views are built fresh against live state.
    fn initialize_entity(&self, id: EntityId, factory: impl FnOnce() -> Entity) -> Entity {
        self.resolve(id).unwrap_or_else(factory)
    }
}

impl std::fmt::Debug for MutableEntityStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutableEntityStorage")
            .field("entities", &self.entity_count())
            .field("modification_count", &self.modification_count)
            .finish()
    }
}

// Working state threaded through one replace-by-source import.
struct ReplacementImport<'a, F> {
    incoming: &'a StorageData,
    filter: &'a F,
    // Replacement-side ids of the matched subset.
    matched_ids: HashSet<EntityId>,
    // Replacement-side id -> freshly allocated id.
    id_map: HashMap<EntityId, EntityId>,
    // New ids in import order, parents before children.
    order: Vec<EntityId>,
}

/// Request to add one entity, built up fluently.
#[derive(Clone, Debug)]
pub struct NewEntity {
    type_fqn: Arc<str>,
    source: EntitySource,
    symbolic_name: Option<Arc<str>>,
    parent: Option<EntityId>,
    fields: Vec<(Arc<str>, Value)>,
}

impl NewEntity {
    /// Starts a request for an entity of the given type and provenance.
    #[must_use]
    pub fn new(type_fqn: impl Into<Arc<str>>, source: EntitySource) -> Self {
        Self {
            type_fqn: type_fqn.into(),
            source,
            symbolic_name: None,
            parent: None,
            fields: Vec::new(),
        }
    }

    /// Declares the entity's symbolic name.
    ///
    /// Required exactly when the entity type declares a symbolic id.
    #[must_use]
    pub fn with_symbolic_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.symbolic_name = Some(name.into());
        self
    }

    /// Attaches the new entity to an owning parent.
    #[must_use]
    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets a property value. A later value for the same name wins.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

/// Collects field and symbolic-id operations for one
/// [`MutableEntityStorage::modify_entity`] call.
#[derive(Debug)]
pub struct EntityUpdater {
    ops: Vec<UpdateOp>,
}

impl EntityUpdater {
    /// Sets a property value.
    pub fn set_field(&mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) {
        self.ops.push(UpdateOp::SetField(name.into(), value.into()));
    }

    /// Clears an optional property.
    pub fn clear_field(&mut self, name: impl Into<Arc<str>>) {
        self.ops.push(UpdateOp::ClearField(name.into()));
    }

    /// Renames the entity's symbolic id within its type.
    pub fn set_symbolic_name(&mut self, name: impl Into<Arc<str>>) {
        self.ops.push(UpdateOp::SetSymbolicName(name.into()));
    }
}

#[derive(Debug)]
enum UpdateOp {
    SetField(Arc<str>, Value),
    ClearField(Arc<str>),
    SetSymbolicName(Arc<str>),
}

/// One coalesced entry in a session's change log.
#[derive(Clone, Debug)]
pub enum EntityChange {
    /// The entity did not exist at session start and exists now.
    Added(Entity),
    /// The entity existed at session start and no longer does.
    Removed(Entity),
    /// The entity existed at session start and its data changed.
    Replaced {
        /// The entity as it was at session start.
        old: Entity,
        /// The entity's current state.
        new: Entity,
    },
}

impl EntityChange {
    /// The id of the affected entity.
    #[must_use]
    pub fn id(&self) -> EntityId {
        match self {
            Self::Added(e) | Self::Removed(e) => e.id(),
            Self::Replaced { new, .. } => new.id(),
        }
    }
}

/// Per-entity coalescing change log.
///
/// Entries describe the net effect relative to session start:
/// add-then-replace stays a single add with the final data,
/// add-then-remove cancels out, replace-then-replace keeps the original
/// `old` with the latest `new`, and replace-then-remove becomes a remove
/// carrying the session-start data.
#[derive(Clone, Debug, Default)]
struct ChangeLog {
    order: Vec<EntityId>,
    entries: HashMap<EntityId, EntityChange>,
}

impl ChangeLog {
    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn record_added(&mut self, entity: Entity) {
        let id = entity.id();
        self.order.push(id);
        self.entries.insert(id, EntityChange::Added(entity));
    }

    fn record_replaced(&mut self, old: Entity, new: Entity) {
        let id = new.id();
        match self.entries.get_mut(&id) {
            Some(EntityChange::Added(current) | EntityChange::Replaced { new: current, .. }) => {
                *current = new;
            }
            // Slots are never recycled, so a removed entity cannot reappear.
            Some(EntityChange::Removed(_)) => {}
            None => {
                self.order.push(id);
                self.entries.insert(id, EntityChange::Replaced { old, new });
            }
        }
    }

    fn record_removed(&mut self, entity: Entity) {
        let id = entity.id();
        match self.entries.remove(&id) {
            // Added in this session; the add and remove cancel out.
            Some(EntityChange::Added(_)) => {}
            Some(EntityChange::Replaced { old, .. }) => {
                self.entries.insert(id, EntityChange::Removed(old));
            }
            Some(EntityChange::Removed(previous)) => {
                self.entries.insert(id, EntityChange::Removed(previous));
            }
            None => {
                self.order.push(id);
                self.entries.insert(id, EntityChange::Removed(entity));
            }
        }
    }

    fn collect(&self) -> Vec<EntityChange> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).cloned())
            .collect()
    }

    fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }
}

fn validate_value(
    registry: &MetadataRegistry,
    prop: &PropertyMetadata,
    value: &Value,
) -> Result<()> {
    if prop.is_multiple() {
        let Value::List(items) = value else {
            return Err(Error::property_type_mismatch(
                prop.name(),
                ValueType::List,
                value.value_type(),
            ));
        };
        for item in items.iter() {
            validate_single(registry, prop, item)?;
        }
        Ok(())
    } else {
        validate_single(registry, prop, value)
    }
}

fn validate_single(
    registry: &MetadataRegistry,
    prop: &PropertyMetadata,
    value: &Value,
) -> Result<()> {
    match prop.kind() {
        PropertyKind::Scalar(expected) => {
            if value.value_type() == *expected {
                Ok(())
            } else {
                Err(Error::property_type_mismatch(
                    prop.name(),
                    *expected,
                    value.value_type(),
                ))
            }
        }
        PropertyKind::Reference { target_fqn } => {
            let Some(target) = value.as_entity_ref() else {
                return Err(Error::property_type_mismatch(
                    prop.name(),
                    ValueType::EntityRef,
                    value.value_type(),
                ));
            };
            let actual = registry
                .metadata_by_type_id(target.type_id)
                .map_or("<unregistered>", |m| m.fqn());
            if actual == target_fqn.as_ref() {
                Ok(())
            } else {
                Err(Error::reference_target_mismatch(
                    prop.name(),
                    target_fqn.as_ref(),
                    actual,
                ))
            }
        }
    }
}
