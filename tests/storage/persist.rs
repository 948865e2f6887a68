//! Integration tests for binary snapshot persistence
//!
//! Tests the schema trust gate and the rebuild-from-source fallback.

use std::sync::Arc;

use trestle_foundation::{EntitySource, ErrorKind, SymbolicEntityId, ValueType};
use trestle_storage::persist::{load_snapshot, save_snapshot};
use trestle_storage::{
    EntityStorageInstrumentation, EntityStorageSnapshot, MetadataRegistry, MutableEntityStorage,
    NewEntity, PropertyMetadata, StorageTypeMetadata,
};

use crate::project_registry;

fn sample_snapshot(registry: &Arc<MetadataRegistry>) -> EntityStorageSnapshot {
    let mut session =
        MutableEntityStorage::from_snapshot(&EntityStorageSnapshot::empty(Arc::clone(registry)));
    let module = session
        .add_entity(
            NewEntity::new("ModuleEntity", EntitySource::project_file("/p/app.iml"))
                .with_symbolic_name("app")
                .with_field("name", "app")
                .with_field("order", 3i64),
        )
        .unwrap();
    session
        .add_entity(
            NewEntity::new("ContentRootEntity", EntitySource::Internal)
                .with_field("path", "/src")
                .with_parent(module),
        )
        .unwrap();
    session.to_snapshot()
}

// =============================================================================
// Round trip
// =============================================================================

#[test]
fn saved_snapshot_reloads_with_identity_and_ownership_intact() {
    let registry = project_registry();
    let snapshot = sample_snapshot(&registry);

    let bytes = save_snapshot(&snapshot).unwrap();
    let loaded = load_snapshot(&bytes, &registry).unwrap();

    assert_eq!(loaded.entity_count(), snapshot.entity_count());
    let module = loaded
        .resolve_symbolic(&SymbolicEntityId::new("ModuleEntity", "app"))
        .unwrap();
    assert_eq!(module.source(), &EntitySource::project_file("/p/app.iml"));

    let children: Vec<_> = loaded.children(module.id()).collect();
    assert_eq!(children.len(), 1);
    assert_eq!(loaded.parent(children[0].id()).unwrap().id(), module.id());

    // The reloaded snapshot supports further editing.
    let mut session = MutableEntityStorage::from_snapshot(&loaded);
    session.remove_entity(module.id()).unwrap();
    assert_eq!(session.entity_count(), 0);
}

// =============================================================================
// Schema trust gate
// =============================================================================

/// Same types as [`project_registry`], but ModuleEntity gained a required
/// property in "v2" of the model.
fn v2_registry() -> Arc<MetadataRegistry> {
    let mut builder = MetadataRegistry::builder();
    builder
        .register(
            StorageTypeMetadata::new("ModuleEntity")
                .with_symbolic_id()
                .with_property(PropertyMetadata::scalar("name", ValueType::Str))
                .with_property(PropertyMetadata::scalar("order", ValueType::Int).optional())
                .with_property(
                    PropertyMetadata::reference("dependencies", "LibraryEntity")
                        .optional()
                        .multiple(),
                )
                .with_property(PropertyMetadata::scalar("language_level", ValueType::Str)),
        )
        .unwrap();
    builder
        .register(
            StorageTypeMetadata::new("LibraryEntity")
                .with_symbolic_id()
                .with_property(PropertyMetadata::scalar("name", ValueType::Str)),
        )
        .unwrap();
    builder
        .register(
            StorageTypeMetadata::new("ContentRootEntity")
                .owned_by("ModuleEntity")
                .with_property(PropertyMetadata::scalar("path", ValueType::Str)),
        )
        .unwrap();
    builder
        .register(
            StorageTypeMetadata::new("SourceRootEntity")
                .owned_by("ContentRootEntity")
                .with_property(PropertyMetadata::scalar("path", ValueType::Str))
                .with_property(PropertyMetadata::scalar("generated", ValueType::Bool).optional()),
        )
        .unwrap();
    builder.build()
}

#[test]
fn stale_cache_is_refused_and_rebuilt_from_source() {
    let v1 = project_registry();
    let cache_bytes = save_snapshot(&sample_snapshot(&v1)).unwrap();

    // The model evolved; the old cache must not materialize anything.
    let v2 = v2_registry();
    let err = load_snapshot(&cache_bytes, &v2).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::SchemaMismatch { .. }));

    // Fallback path: rebuild from the authoritative source instead.
    let rebuilt = {
        let mut session =
            MutableEntityStorage::from_snapshot(&EntityStorageSnapshot::empty(Arc::clone(&v2)));
        session
            .add_entity(
                NewEntity::new("ModuleEntity", EntitySource::project_file("/p/app.iml"))
                    .with_symbolic_name("app")
                    .with_field("name", "app")
                    .with_field("language_level", "17"),
            )
            .unwrap();
        session.to_snapshot()
    };
    assert_eq!(rebuilt.entity_count(), 1);

    // A cache written against v2 loads under v2.
    let fresh_bytes = save_snapshot(&rebuilt).unwrap();
    assert!(load_snapshot(&fresh_bytes, &v2).is_ok());
}

#[test]
fn cache_from_an_unknown_type_universe_is_refused() {
    let registry = project_registry();
    let bytes = save_snapshot(&sample_snapshot(&registry)).unwrap();

    let mut builder = MetadataRegistry::builder();
    builder
        .register(
            StorageTypeMetadata::new("DocumentEntity")
                .with_property(PropertyMetadata::scalar("title", ValueType::Str)),
        )
        .unwrap();
    let unrelated = builder.build();

    let err = load_snapshot(&bytes, &unrelated).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MissingTypeMetadata { .. }));
}

#[test]
fn truncated_envelope_is_a_format_error() {
    let registry = project_registry();
    let mut bytes = save_snapshot(&sample_snapshot(&registry)).unwrap();
    bytes.truncate(bytes.len() / 2);

    let err = load_snapshot(&bytes, &registry).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::PersistFormat(_)));
}
