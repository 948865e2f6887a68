//! Snapshot-isolated workspace entity storage for Trestle.
//!
//! This crate provides:
//! - [`MetadataRegistry`] - Per-type schema descriptors and cache trust gating
//! - [`EntityStorageSnapshot`] - Immutable, structurally-shared read views
//! - [`MutableEntityStorage`] - Single-writer mutation sessions with change logs
//! - [`EntityPointer`] - Lazy, non-owning references resolved against a storage
//! - [`EntityStorageInstrumentation`] - The entity construction interception seam

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod builder;
mod entity_data;
mod family;
mod indexes;
mod instrumentation;
mod metadata;
#[cfg(feature = "persist")]
pub mod persist;
mod pointer;
mod refs;
mod snapshot;
mod storage_data;

pub use builder::{EntityChange, EntityUpdater, MutableEntityStorage, NewEntity};
pub use entity_data::Entity;
pub use instrumentation::EntityStorageInstrumentation;
pub use metadata::{
    MetadataRegistry, MetadataRegistryBuilder, PropertyKind, PropertyMetadata, StorageTypeMetadata,
};
pub use pointer::EntityPointer;
pub use snapshot::EntityStorageSnapshot;
