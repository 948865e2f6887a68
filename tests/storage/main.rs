//! Integration tests for Layer 1: Storage
//!
//! Tests for the metadata registry, snapshots, mutation sessions, entity
//! pointers, and binary persistence.

mod builder;
mod persist;
mod snapshot;

use std::sync::Arc;

use trestle_foundation::ValueType;
use trestle_storage::{MetadataRegistry, PropertyMetadata, StorageTypeMetadata};

/// A small project-model schema shared by the storage tests.
pub fn project_registry() -> Arc<MetadataRegistry> {
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
                ),
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
