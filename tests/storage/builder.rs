//! Integration tests for mutation sessions
//!
//! Tests edit batches, validation, cascade removal, and change logs.

use std::sync::Arc;

use trestle_foundation::{EntityId, EntitySource, ErrorKind, SymbolicEntityId, TrVec, Value};
use trestle_storage::{
    EntityChange, EntityStorageInstrumentation, EntityStorageSnapshot, MutableEntityStorage,
    NewEntity,
};

use crate::project_registry;

fn empty_snapshot() -> EntityStorageSnapshot {
    EntityStorageSnapshot::empty(project_registry())
}

fn module(name: &str) -> NewEntity {
    NewEntity::new("ModuleEntity", EntitySource::Internal)
        .with_symbolic_name(name)
        .with_field("name", name)
}

fn content_root(path: &str, parent: EntityId) -> NewEntity {
    NewEntity::new("ContentRootEntity", EntitySource::Internal)
        .with_field("path", path)
        .with_parent(parent)
}

// =============================================================================
// Cascade removal across sessions
// =============================================================================

#[test]
fn removing_a_parent_removes_its_subtree_in_the_derived_snapshot() {
    let s0 = empty_snapshot();

    let mut b1 = MutableEntityStorage::from_snapshot(&s0);
    let m = b1.add_entity(module("app")).unwrap();
    let c1 = b1.add_entity(content_root("/src", m)).unwrap();
    let c2 = b1.add_entity(content_root("/test", m)).unwrap();
    let s1 = b1.to_snapshot();

    let mut b2 = MutableEntityStorage::from_snapshot(&s1);
    b2.remove_entity(m).unwrap();
    let s2 = b2.to_snapshot();

    assert!(s2.resolve(c1).is_none());
    assert!(s2.resolve(c2).is_none());
    assert!(s2.resolve(m).is_none());

    // The baseline snapshot is untouched by the removal.
    assert!(s1.resolve(m).is_some());
    assert_eq!(s1.children(m).count(), 2);
    assert_eq!(s1.entity_count(), 3);
    assert_eq!(s2.entity_count(), 0);
}

#[test]
fn cascade_spans_multiple_ownership_levels() {
    let mut session = MutableEntityStorage::from_snapshot(&empty_snapshot());
    let m = session.add_entity(module("app")).unwrap();
    let root = session.add_entity(content_root("/src", m)).unwrap();
    let leaf = session
        .add_entity(
            NewEntity::new("SourceRootEntity", EntitySource::Internal)
                .with_field("path", "/src/main")
                .with_parent(root),
        )
        .unwrap();

    session.remove_entity(m).unwrap();

    assert!(session.resolve(leaf).is_none());
    assert!(session.resolve(root).is_none());
    assert_eq!(session.entity_count(), 0);
}

// =============================================================================
// Non-owning references across sessions
// =============================================================================

#[test]
fn cross_reference_keeps_the_target_record_shared() {
    let s0 = empty_snapshot();

    let mut b1 = MutableEntityStorage::from_snapshot(&s0);
    let lib = b1
        .add_entity(
            NewEntity::new("LibraryEntity", EntitySource::Internal)
                .with_symbolic_name("Guava")
                .with_field("name", "Guava"),
        )
        .unwrap();
    let s1 = b1.to_snapshot();

    let mut b2 = MutableEntityStorage::from_snapshot(&s1);
    let deps = Value::List(TrVec::new().push_back(Value::EntityRef(lib)));
    b2.add_entity(module("app").with_field("dependencies", deps))
        .unwrap();
    let s2 = b2.to_snapshot();

    // Adding a referrer does not touch the referenced entity's record.
    let in_s1 = s1.resolve(lib).unwrap();
    let in_s2 = s2.resolve(lib).unwrap();
    assert!(trestle_storage::Entity::ptr_eq(&in_s1, &in_s2));
}

// =============================================================================
// Change log publication
// =============================================================================

#[test]
fn change_log_describes_a_batch_for_event_publication() {
    let mut session = MutableEntityStorage::from_snapshot(&empty_snapshot());
    let m = session.add_entity(module("app")).unwrap();
    let s1 = session.to_snapshot();

    let mut batch = MutableEntityStorage::from_snapshot(&s1);
    batch
        .modify_entity(m, |u| u.set_field("order", 5i64))
        .unwrap();
    let added = batch.add_entity(module("core")).unwrap();

    let changes = batch.collect_changes();
    assert_eq!(changes.len(), 2);
    match &changes[0] {
        EntityChange::Replaced { old, new } => {
            assert!(!old.has_field("order"));
            assert_eq!(new.field("order"), Some(&Value::Int(5)));
        }
        other => panic!("expected a replace first, got {other:?}"),
    }
    match &changes[1] {
        EntityChange::Added(entity) => assert_eq!(entity.id(), added),
        other => panic!("expected an add second, got {other:?}"),
    }
}

#[test]
fn freezing_drains_the_change_log() {
    let mut session = MutableEntityStorage::from_snapshot(&empty_snapshot());
    session.add_entity(module("app")).unwrap();

    assert!(session.has_changes());
    let _committed = session.to_snapshot();
    assert!(session.collect_changes().is_empty());
}

// =============================================================================
// Replace by source
// =============================================================================

#[test]
fn external_reimport_swaps_its_slice_and_preserves_project_entities() {
    let registry = project_registry();
    let gradle = EntitySource::external_system("gradle");

    let mut session =
        MutableEntityStorage::from_snapshot(&EntityStorageSnapshot::empty(Arc::clone(&registry)));
    let app = session.add_entity(module("app")).unwrap();
    let stale = session
        .add_entity(
            NewEntity::new("ModuleEntity", gradle.clone())
                .with_symbolic_name("gradle-lib")
                .with_field("name", "gradle-lib"),
        )
        .unwrap();

    // The importer's view of the gradle slice after a re-sync.
    let mut importer =
        MutableEntityStorage::from_snapshot(&EntityStorageSnapshot::empty(Arc::clone(&registry)));
    let fresh = importer
        .add_entity(
            NewEntity::new("ModuleEntity", gradle.clone())
                .with_symbolic_name("gradle-app")
                .with_field("name", "gradle-app"),
        )
        .unwrap();
    importer
        .add_entity(
            NewEntity::new("ContentRootEntity", gradle.clone())
                .with_field("path", "/gradle/src")
                .with_parent(fresh),
        )
        .unwrap();
    let replacement = importer.to_snapshot();

    session
        .replace_by_source(|s| *s == gradle, &replacement)
        .unwrap();
    let snapshot = session.to_snapshot();

    assert!(snapshot.resolve(stale).is_none());
    assert!(snapshot.resolve(app).is_some());
    let imported = snapshot
        .resolve_symbolic(&SymbolicEntityId::new("ModuleEntity", "gradle-app"))
        .unwrap();
    assert_eq!(snapshot.children(imported.id()).count(), 1);
    assert_eq!(
        snapshot
            .entities_by_source(|s| *s == EntitySource::external_system("gradle"))
            .count(),
        2
    );
}

// =============================================================================
// Validation failures leave the session untouched
// =============================================================================

#[test]
fn rejected_operations_have_no_side_effects() {
    let mut session = MutableEntityStorage::from_snapshot(&empty_snapshot());
    let m = session.add_entity(module("app")).unwrap();
    let count = session.modification_count();

    let collision = session.add_entity(module("app"));
    assert!(matches!(
        collision.unwrap_err().kind,
        ErrorKind::SymbolicIdCollision { .. }
    ));

    let bad_modify = session.modify_entity(m, |u| {
        u.set_field("order", 1i64);
        u.set_field("name", 2i64);
    });
    assert!(matches!(
        bad_modify.unwrap_err().kind,
        ErrorKind::PropertyTypeMismatch { .. }
    ));

    assert_eq!(session.entity_count(), 1);
    assert_eq!(session.modification_count(), count);
    assert!(!session.resolve(m).unwrap().has_field("order"));
}

#[test]
fn entity_ids_are_never_recycled_across_sessions() {
    let mut session = MutableEntityStorage::from_snapshot(&empty_snapshot());
    let first = session.add_entity(module("app")).unwrap();
    session.remove_entity(first).unwrap();
    let s1 = session.to_snapshot();

    let mut next = MutableEntityStorage::from_snapshot(&s1);
    let second = next.add_entity(module("app")).unwrap();

    assert_ne!(first, second);
    assert!(next.resolve(first).is_none());
}

#[test]
fn symbolic_rename_moves_identity_resolution() {
    let mut session = MutableEntityStorage::from_snapshot(&empty_snapshot());
    let m = session.add_entity(module("app")).unwrap();

    session
        .modify_entity(m, |u| u.set_symbolic_name("app-renamed"))
        .unwrap();
    let snapshot = session.to_snapshot();

    assert!(snapshot
        .resolve_symbolic(&trestle_foundation::SymbolicEntityId::new(
            "ModuleEntity",
            "app"
        ))
        .is_none());
    let renamed = snapshot
        .resolve_symbolic(&trestle_foundation::SymbolicEntityId::new(
            "ModuleEntity",
            "app-renamed"
        ))
        .unwrap();
    assert_eq!(renamed.id(), m);
}
