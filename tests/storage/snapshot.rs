//! Integration tests for snapshot isolation
//!
//! Tests immutability, structural sharing, lazy materialization, and
//! concurrent reads.

use std::thread;

use trestle_foundation::{EntitySource, SymbolicEntityId};
use trestle_storage::{
    Entity, EntityStorageInstrumentation, EntityStorageSnapshot, MutableEntityStorage, NewEntity,
};

use crate::project_registry;

fn snapshot_with_modules(names: &[&str]) -> EntityStorageSnapshot {
    let mut session =
        MutableEntityStorage::from_snapshot(&EntityStorageSnapshot::empty(project_registry()));
    for name in names {
        session
            .add_entity(
                NewEntity::new("ModuleEntity", EntitySource::Internal)
                    .with_symbolic_name(*name)
                    .with_field("name", *name),
            )
            .unwrap();
    }
    session.to_snapshot()
}

// =============================================================================
// Isolation
// =============================================================================

#[test]
fn snapshots_never_observe_later_edits() {
    let s1 = snapshot_with_modules(&["app"]);

    let mut session = MutableEntityStorage::from_snapshot(&s1);
    session
        .add_entity(
            NewEntity::new("ModuleEntity", EntitySource::Internal)
                .with_symbolic_name("core")
                .with_field("name", "core"),
        )
        .unwrap();
    let s2 = session.to_snapshot();

    assert_eq!(s1.entity_count(), 1);
    assert_eq!(s2.entity_count(), 2);
    assert!(s1
        .resolve_symbolic(&SymbolicEntityId::new("ModuleEntity", "core"))
        .is_none());
}

#[test]
fn freezing_is_a_pure_function_of_accumulated_edits() {
    let mut session =
        MutableEntityStorage::from_snapshot(&EntityStorageSnapshot::empty(project_registry()));
    let id = session
        .add_entity(
            NewEntity::new("ModuleEntity", EntitySource::Internal)
                .with_symbolic_name("app")
                .with_field("name", "app"),
        )
        .unwrap();
    let frozen = session.to_snapshot();

    // Later mutation of the same session never leaks into the snapshot.
    session
        .modify_entity(id, |u| u.set_field("order", 9i64))
        .unwrap();
    session
        .add_entity(
            NewEntity::new("ModuleEntity", EntitySource::Internal)
                .with_symbolic_name("core")
                .with_field("name", "core"),
        )
        .unwrap();

    assert_eq!(frozen.entity_count(), 1);
    assert!(!frozen.resolve(id).unwrap().has_field("order"));
}

// =============================================================================
// Structural sharing
// =============================================================================

#[test]
fn untouched_entities_are_reference_identical_across_snapshots() {
    let s1 = snapshot_with_modules(&["app", "core", "util"]);
    let core = s1
        .resolve_symbolic(&SymbolicEntityId::new("ModuleEntity", "core"))
        .unwrap();

    let mut session = MutableEntityStorage::from_snapshot(&s1);
    session
        .modify_entity(core.id(), |u| u.set_field("order", 1i64))
        .unwrap();
    let s2 = session.to_snapshot();

    for name in ["app", "util"] {
        let before = s1
            .resolve_symbolic(&SymbolicEntityId::new("ModuleEntity", name))
            .unwrap();
        let after = s2
            .resolve_symbolic(&SymbolicEntityId::new("ModuleEntity", name))
            .unwrap();
        assert!(Entity::ptr_eq(&before, &after));
    }

    let touched = s2.resolve(core.id()).unwrap();
    assert!(!Entity::ptr_eq(&core, &touched));
}

// =============================================================================
// Symbolic identity
// =============================================================================

#[test]
fn symbolic_resolution_agrees_with_direct_resolution() {
    let snapshot = snapshot_with_modules(&["app", "core", "util"]);

    for entity in snapshot.entities_of_type("ModuleEntity") {
        let symbolic = entity.symbolic_id().expect("modules declare symbolic ids");
        let via_symbolic = snapshot.resolve_symbolic(symbolic).unwrap();
        assert_eq!(via_symbolic, entity);
        assert_eq!(via_symbolic.id(), entity.id());
    }
}

// =============================================================================
// Source filtering
// =============================================================================

#[test]
fn entities_filter_by_provenance() {
    let mut session =
        MutableEntityStorage::from_snapshot(&EntityStorageSnapshot::empty(project_registry()));
    session
        .add_entity(
            NewEntity::new("ModuleEntity", EntitySource::external_system("gradle"))
                .with_symbolic_name("imported")
                .with_field("name", "imported"),
        )
        .unwrap();
    session
        .add_entity(
            NewEntity::new("ModuleEntity", EntitySource::project_file("/p/app.iml"))
                .with_symbolic_name("local")
                .with_field("name", "local"),
        )
        .unwrap();
    let snapshot = session.to_snapshot();

    let imported: Vec<_> = snapshot
        .entities_by_source(|s| matches!(s, EntitySource::ExternalSystem { .. }))
        .collect();
    assert_eq!(imported.len(), 1);
    assert_eq!(
        imported[0].symbolic_id(),
        Some(&SymbolicEntityId::new("ModuleEntity", "imported"))
    );

    let all: Vec<_> = snapshot.entities_by_source(|_| true).collect();
    assert_eq!(all.len(), 2);
}

// =============================================================================
// Concurrent reads
// =============================================================================

#[test]
fn unsynchronized_concurrent_reads_are_safe() {
    let snapshot = snapshot_with_modules(&["app", "core", "util"]);
    let target = snapshot
        .resolve_symbolic(&SymbolicEntityId::new("ModuleEntity", "core"))
        .unwrap()
        .id();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let view = snapshot.clone();
            thread::spawn(move || {
                let entity = view.resolve(target).unwrap();
                let count = view.entities_of_type("ModuleEntity").count();
                (entity, count)
            })
        })
        .collect();

    let winner = snapshot.resolve(target).unwrap();
    for handle in handles {
        let (entity, count) = handle.join().unwrap();
        assert_eq!(count, 3);
        // All racers converge on the one cached instance.
        assert!(Entity::ptr_eq(&entity, &winner));
    }
}

#[test]
fn racing_first_materializations_return_value_equal_entities() {
    let snapshot = snapshot_with_modules(&["app"]);
    let id = snapshot.entities_of_type("ModuleEntity").next().unwrap().id();

    // Fresh clone group sharing one never-hit cache.
    let fresh = snapshot.clone();
    let a = {
        let view = fresh.clone();
        thread::spawn(move || view.resolve(id).unwrap())
    };
    let b = {
        let view = fresh.clone();
        thread::spawn(move || view.resolve(id).unwrap())
    };
    let first = a.join().unwrap();
    let second = b.join().unwrap();
    assert_eq!(first, second);

    // A subsequent call returns exactly the cached winner.
    let third = fresh.resolve(id).unwrap();
    assert!(Entity::ptr_eq(&third, &first));
    assert!(Entity::ptr_eq(&third, &second));
}
