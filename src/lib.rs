//! Trestle - Workspace entity storage
//!
//! This crate re-exports all layers of the Trestle system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 1: trestle_storage    — Snapshots, mutation sessions, schema registry, persistence
//! Layer 0: trestle_foundation — Core types (EntityId, Value, EntitySource, Error)
//! ```

pub use trestle_foundation as foundation;
pub use trestle_storage as storage;
