//! Core types, values, and persistent collections for Trestle.
//!
//! This crate provides:
//! - [`EntityId`] / [`TypeId`] - Dense entity identifiers
//! - [`SymbolicEntityId`] - Stable, content-derived entity identity
//! - [`EntitySource`] - Provenance tags for entities
//! - [`Value`] - The field value type for entity properties
//! - [`Error`] - Categorized error types
//! - Persistent collections ([`TrVec`], [`TrSet`], [`TrMap`], [`RequiredSet`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod collections;
mod entity;
mod error;
mod source;
mod symbolic;
mod value;

pub use collections::{RequiredSet, TrMap, TrSet, TrVec};
pub use entity::{EntityId, TypeId};
pub use error::{Error, ErrorKind, Result};
pub use source::EntitySource;
pub use symbolic::SymbolicEntityId;
pub use value::{Value, ValueType};
