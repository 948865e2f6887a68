//! Entity data records and the immutable entity view.

use std::fmt;
use std::sync::Arc;

use trestle_foundation::{EntityId, EntitySource, SymbolicEntityId, TrMap, Value};

use crate::metadata::StorageTypeMetadata;

/// The backing record for one entity.
///
/// Field values are keyed by the property's index in the type descriptor's
/// declaration order, keeping the map keys dense and registry-relative.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct EntityData {
    pub(crate) id: EntityId,
    pub(crate) source: EntitySource,
    pub(crate) symbolic_id: Option<SymbolicEntityId>,
    pub(crate) fields: TrMap<u32, Value>,
}

/// An immutable, typed view over backing entity data.
///
/// Entities are cheap to clone and value-comparable. Two `Entity` values
/// from structurally-shared snapshots are pointer-identical
/// ([`Entity::ptr_eq`]) when the underlying record was untouched by the
/// intervening edits.
#[derive(Clone)]
pub struct Entity {
    data: Arc<EntityData>,
    metadata: Arc<StorageTypeMetadata>,
}

impl Entity {
    pub(crate) fn new(data: Arc<EntityData>, metadata: Arc<StorageTypeMetadata>) -> Self {
        Self { data, metadata }
    }

    pub(crate) fn data(&self) -> &Arc<EntityData> {
        &self.data
    }

    /// The entity's internal id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.data.id
    }

    /// The fully-qualified name of the entity's type.
    #[must_use]
    pub fn type_fqn(&self) -> &str {
        self.metadata.fqn()
    }

    /// The type descriptor this entity was validated against.
    #[must_use]
    pub fn metadata(&self) -> &Arc<StorageTypeMetadata> {
        &self.metadata
    }

    /// The provenance of the entity's data.
    #[must_use]
    pub fn source(&self) -> &EntitySource {
        &self.data.source
    }

    /// The entity's symbolic id, if its type declares one.
    #[must_use]
    pub fn symbolic_id(&self) -> Option<&SymbolicEntityId> {
        self.data.symbolic_id.as_ref()
    }

    /// Gets a field value by property name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        let index = self.metadata.property_index(name)?;
        self.data.fields.get(&index)
    }

    /// Returns true if the field is present.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Iterates present fields as `(name, value)` pairs in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.metadata
            .properties()
            .iter()
            .enumerate()
            .filter_map(|(i, prop)| {
                let index = u32::try_from(i).ok()?;
                let value = self.data.fields.get(&index)?;
                Some((prop.name(), value))
            })
    }

    /// Returns true if both views share the same underlying record.
    ///
    /// This is the structural-sharing witness: an entity untouched by an
    /// edit is pointer-identical between the baseline and derived snapshots.
    #[must_use]
    pub fn ptr_eq(a: &Entity, b: &Entity) -> bool {
        Arc::ptr_eq(&a.data, &b.data)
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Entity {}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Entity");
        s.field("id", &self.data.id);
        s.field("type", &self.metadata.fqn());
        if let Some(symbolic) = &self.data.symbolic_id {
            s.field("symbolic_id", symbolic);
        }
        s.field("source", &self.data.source);
        s.finish_non_exhaustive()
    }
}
