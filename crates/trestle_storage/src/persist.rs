//! Binary snapshot persistence.
//!
//! Snapshots serialize to a self-describing MessagePack envelope that
//! embeds the full schema descriptor table alongside the entity records.
//! Loading verifies every embedded descriptor against the live registry
//! before materializing anything: a renamed property, changed type, or
//! missing descriptor refuses the whole cache, never a partial load.
//!
//! Entity references are persisted as an index into the embedded
//! descriptor table plus a slot, so a load succeeds even when the live
//! registry assigns different dense type ids than the writer did.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use trestle_foundation::{
    EntityId, EntitySource, Error, Result, SymbolicEntityId, TrVec, TypeId, Value, ValueType,
};

use crate::entity_data::EntityData;
use crate::metadata::{MetadataRegistry, PropertyKind, PropertyMetadata, StorageTypeMetadata};
use crate::snapshot::EntityStorageSnapshot;
use crate::storage_data::StorageData;

/// Version tag written into every envelope.
///
/// Bumped on any layout change; older readers refuse newer envelopes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct PersistedStorage {
    format_version: u32,
    types: Vec<PersistedType>,
    entities: Vec<PersistedEntity>,
    children: Vec<(PersistedEntityId, Vec<PersistedEntityId>)>,
}

#[derive(Serialize, Deserialize)]
struct PersistedType {
    fqn: String,
    has_symbolic_id: bool,
    owners: Vec<String>,
    properties: Vec<PersistedProperty>,
}

#[derive(Serialize, Deserialize)]
struct PersistedProperty {
    name: String,
    optional: bool,
    multiple: bool,
    kind: PersistedPropertyKind,
}

#[derive(Serialize, Deserialize, PartialEq)]
enum PersistedPropertyKind {
    Scalar(PersistedValueType),
    Reference { target_fqn: String },
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Copy)]
enum PersistedValueType {
    Bool,
    Int,
    Str,
    List,
    EntityRef,
}

/// Type-table index plus slot; never a live [`TypeId`].
#[derive(Serialize, Deserialize, Clone, Copy)]
struct PersistedEntityId {
    type_index: u32,
    slot: u32,
}

#[derive(Serialize, Deserialize)]
struct PersistedEntity {
    id: PersistedEntityId,
    source: PersistedSource,
    symbolic_name: Option<String>,
    fields: Vec<(u32, PersistedValue)>,
}

#[derive(Serialize, Deserialize)]
enum PersistedSource {
    ProjectFile(String),
    ExternalSystem(String),
    Internal,
}

#[derive(Serialize, Deserialize)]
enum PersistedValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<PersistedValue>),
    EntityRef(PersistedEntityId),
}

/// Serializes a snapshot into the binary envelope.
///
/// # Errors
///
/// Fails only on encoder errors, reported as
/// [`ErrorKind::PersistFormat`](trestle_foundation::ErrorKind::PersistFormat).
pub fn save_snapshot(snapshot: &EntityStorageSnapshot) -> Result<Vec<u8>> {
    let data = snapshot.data();
    let registry = &data.registry;

    // Descriptor table in dense type-id order, so a live id doubles as
    // the table index on the write side.
    let types: Vec<PersistedType> = registry.types().map(|m| persist_type(m)).collect();

    let mut entities = Vec::new();
    for metadata in registry.types() {
        for record in data.entities_of_type_id(metadata.type_id()) {
            entities.push(persist_entity(record));
        }
    }

    let children: Vec<(PersistedEntityId, Vec<PersistedEntityId>)> = data
        .refs
        .all_children()
        .map(|(parent, kids)| {
            (
                persist_id(*parent),
                kids.iter().map(|c| persist_id(*c)).collect(),
            )
        })
        .collect();

    let envelope = PersistedStorage {
        format_version: FORMAT_VERSION,
        types,
        entities,
        children,
    };
    rmp_serde::to_vec(&envelope).map_err(|e| Error::persist_format(e.to_string()))
}

/// Deserializes a snapshot, verifying the embedded schema first.
///
/// # Errors
///
/// Fails on a malformed or newer-versioned envelope, on a persisted type
/// with no live descriptor, and on any schema difference between a
/// persisted descriptor and its live counterpart. No entity is
/// materialized unless every descriptor passes. An envelope in which two
/// entities claim the same slot or the same symbolic id is refused as
/// malformed rather than letting the later record win.
pub fn load_snapshot(
    bytes: &[u8],
    registry: &Arc<MetadataRegistry>,
) -> Result<EntityStorageSnapshot> {
    let envelope: PersistedStorage =
        rmp_serde::from_slice(bytes).map_err(|e| Error::persist_format(e.to_string()))?;
    if envelope.format_version != FORMAT_VERSION {
        return Err(Error::persist_format(format!(
            "unsupported format version {} (supported: {FORMAT_VERSION})",
            envelope.format_version
        )));
    }

    // Schema gate: every persisted descriptor must match its live
    // counterpart before any entity is touched.
    let mut type_map: Vec<TypeId> = Vec::with_capacity(envelope.types.len());
    for persisted in &envelope.types {
        let live = registry.metadata_by_type_fqn(&persisted.fqn)?;
        let reconstructed = restore_type(persisted);
        if let Some(detail) = live.schema_diff(&reconstructed) {
            return Err(Error::schema_mismatch(&persisted.fqn, detail));
        }
        type_map.push(live.type_id());
    }

    let mut data = StorageData::empty(Arc::clone(registry));
    for persisted in &envelope.entities {
        let id = restore_id(persisted.id, &type_map)?;
        let metadata = registry
            .metadata_by_type_id(id.type_id)
            .ok_or_else(|| Error::persist_format("type map points at an unregistered type"))?;
        let symbolic_id = persisted
            .symbolic_name
            .as_ref()
            .map(|name| SymbolicEntityId::new(metadata.fqn(), name.as_str()));
        if let Some(symbolic) = &symbolic_id {
            if data.indexes.entity_by_symbolic_id(symbolic).is_some() {
                return Err(Error::persist_format(format!(
                    "two persisted entities claim symbolic id {symbolic}"
                )));
            }
        }

        let mut fields = trestle_foundation::TrMap::new();
        for (index, value) in &persisted.fields {
            fields = fields.insert(*index, restore_value(value, &type_map)?);
        }
        let source = restore_source(&persisted.source);
        let record = Arc::new(EntityData {
            id,
            source: source.clone(),
            symbolic_id,
            fields,
        });

        let mut family = data.families.get(&id.type_id).cloned().unwrap_or_default();
        if family.get(id.slot).is_some() {
            return Err(Error::persist_format(format!(
                "two persisted entities claim slot {id:?}"
            )));
        }
        family.set_slot(id.slot, Arc::clone(&record));
        data.families = data.families.insert(id.type_id, family);
        data.indexes
            .entity_added(id, record.symbolic_id.as_ref(), &source);
    }

    for (parent, kids) in &envelope.children {
        let parent = restore_id(*parent, &type_map)?;
        for child in kids {
            data.refs.attach(parent, restore_id(*child, &type_map)?);
        }
    }

    Ok(EntityStorageSnapshot::from_data(Arc::new(data)))
}

fn persist_type(metadata: &StorageTypeMetadata) -> PersistedType {
    PersistedType {
        fqn: metadata.fqn().to_string(),
        has_symbolic_id: metadata.has_symbolic_id(),
        owners: metadata.owners().iter().map(|o| o.to_string()).collect(),
        properties: metadata
            .properties()
            .iter()
            .map(|p| PersistedProperty {
                name: p.name().to_string(),
                optional: p.is_optional(),
                multiple: p.is_multiple(),
                kind: match p.kind() {
                    PropertyKind::Scalar(ty) => {
                        PersistedPropertyKind::Scalar(persist_value_type(*ty))
                    }
                    PropertyKind::Reference { target_fqn } => PersistedPropertyKind::Reference {
                        target_fqn: target_fqn.to_string(),
                    },
                },
            })
            .collect(),
    }
}

fn restore_type(persisted: &PersistedType) -> StorageTypeMetadata {
    let mut metadata = StorageTypeMetadata::new(persisted.fqn.as_str());
    if persisted.has_symbolic_id {
        metadata = metadata.with_symbolic_id();
    }
    for owner in &persisted.owners {
        metadata = metadata.owned_by(owner.as_str());
    }
    for prop in &persisted.properties {
        let mut restored = match &prop.kind {
            PersistedPropertyKind::Scalar(ty) => {
                PropertyMetadata::scalar(prop.name.as_str(), restore_value_type(*ty))
            }
            PersistedPropertyKind::Reference { target_fqn } => {
                PropertyMetadata::reference(prop.name.as_str(), target_fqn.as_str())
            }
        };
        if prop.optional {
            restored = restored.optional();
        }
        if prop.multiple {
            restored = restored.multiple();
        }
        metadata = metadata.with_property(restored);
    }
    metadata
}

fn persist_entity(record: &EntityData) -> PersistedEntity {
    let mut fields: Vec<(u32, PersistedValue)> = record
        .fields
        .iter()
        .map(|(index, value)| (*index, persist_value(value)))
        .collect();
    fields.sort_by_key(|(index, _)| *index);
    PersistedEntity {
        id: persist_id(record.id),
        source: match &record.source {
            EntitySource::ProjectFile { path } => PersistedSource::ProjectFile(path.to_string()),
            EntitySource::ExternalSystem { system_id } => {
                PersistedSource::ExternalSystem(system_id.to_string())
            }
            EntitySource::Internal => PersistedSource::Internal,
        },
        symbolic_name: record.symbolic_id.as_ref().map(|s| s.name().to_string()),
        fields,
    }
}

fn persist_id(id: EntityId) -> PersistedEntityId {
    PersistedEntityId {
        type_index: id.type_id.index(),
        slot: id.slot,
    }
}

fn restore_id(id: PersistedEntityId, type_map: &[TypeId]) -> Result<EntityId> {
    let type_id = type_map
        .get(id.type_index as usize)
        .copied()
        .ok_or_else(|| {
            Error::persist_format(format!("entity references type index {} out of range", id.type_index))
        })?;
    Ok(EntityId::new(type_id, id.slot))
}

fn persist_value(value: &Value) -> PersistedValue {
    match value {
        Value::Bool(b) => PersistedValue::Bool(*b),
        Value::Int(i) => PersistedValue::Int(*i),
        Value::Str(s) => PersistedValue::Str(s.to_string()),
        Value::List(items) => PersistedValue::List(items.iter().map(persist_value).collect()),
        Value::EntityRef(id) => PersistedValue::EntityRef(persist_id(*id)),
    }
}

fn restore_value(value: &PersistedValue, type_map: &[TypeId]) -> Result<Value> {
    Ok(match value {
        PersistedValue::Bool(b) => Value::Bool(*b),
        PersistedValue::Int(i) => Value::Int(*i),
        PersistedValue::Str(s) => Value::str(s.as_str()),
        PersistedValue::List(items) => {
            let mut restored = TrVec::new();
            for item in items {
                restored = restored.push_back(restore_value(item, type_map)?);
            }
            Value::List(restored)
        }
        PersistedValue::EntityRef(id) => Value::EntityRef(restore_id(*id, type_map)?),
    })
}

fn restore_source(source: &PersistedSource) -> EntitySource {
    match source {
        PersistedSource::ProjectFile(path) => EntitySource::project_file(path.as_str()),
        PersistedSource::ExternalSystem(id) => EntitySource::external_system(id.as_str()),
        PersistedSource::Internal => EntitySource::Internal,
    }
}

fn persist_value_type(ty: ValueType) -> PersistedValueType {
    match ty {
        ValueType::Bool => PersistedValueType::Bool,
        ValueType::Int => PersistedValueType::Int,
        ValueType::Str => PersistedValueType::Str,
        ValueType::List => PersistedValueType::List,
        ValueType::EntityRef => PersistedValueType::EntityRef,
    }
}

fn restore_value_type(ty: PersistedValueType) -> ValueType {
    match ty {
        PersistedValueType::Bool => ValueType::Bool,
        PersistedValueType::Int => ValueType::Int,
        PersistedValueType::Str => ValueType::Str,
        PersistedValueType::List => ValueType::List,
        PersistedValueType::EntityRef => ValueType::EntityRef,
    }
}
