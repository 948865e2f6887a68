//! Schema descriptors for entity types.
//!
//! One [`StorageTypeMetadata`] exists per entity type. The descriptors are
//! collected into a [`MetadataRegistry`] once at startup; the registry is
//! immutable afterwards and shared by every snapshot and builder in a
//! lineage. Descriptor comparison is the trust gate for persisted caches:
//! data written against a different descriptor is refused, never partially
//! loaded.

use std::collections::HashMap;
use std::sync::Arc;

use trestle_foundation::{Error, Result, TypeId, ValueType};

/// Schema descriptor for one entity type.
#[derive(Clone, Debug, PartialEq)]
pub struct StorageTypeMetadata {
    fqn: Arc<str>,
    type_id: TypeId,
    has_symbolic_id: bool,
    owners: Vec<Arc<str>>,
    properties: Vec<PropertyMetadata>,
}

impl StorageTypeMetadata {
    /// Creates a descriptor for the given fully-qualified type name.
    ///
    /// The type id is assigned when the descriptor is registered.
    #[must_use]
    pub fn new(fqn: impl Into<Arc<str>>) -> Self {
        Self {
            fqn: fqn.into(),
            type_id: TypeId::new(0),
            has_symbolic_id: false,
            owners: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Declares that entities of this type carry a symbolic id.
    #[must_use]
    pub fn with_symbolic_id(mut self) -> Self {
        self.has_symbolic_id = true;
        self
    }

    /// Declares that entities of this type may be owned by `owner_fqn`.
    ///
    /// Removal of the owner cascades to all owned entities.
    #[must_use]
    pub fn owned_by(mut self, owner_fqn: impl Into<Arc<str>>) -> Self {
        self.owners.push(owner_fqn.into());
        self
    }

    /// Adds a property to the descriptor.
    #[must_use]
    pub fn with_property(mut self, property: PropertyMetadata) -> Self {
        self.properties.push(property);
        self
    }

    /// The fully-qualified type name.
    #[must_use]
    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    /// The dense type id assigned at registration.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Whether entities of this type declare a symbolic id.
    #[must_use]
    pub fn has_symbolic_id(&self) -> bool {
        self.has_symbolic_id
    }

    /// Type FQNs allowed to own entities of this type.
    #[must_use]
    pub fn owners(&self) -> &[Arc<str>] {
        &self.owners
    }

    /// The property list, in declaration order.
    #[must_use]
    pub fn properties(&self) -> &[PropertyMetadata] {
        &self.properties
    }

    /// Returns a property descriptor by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Returns the index of a property within the declaration order.
    #[must_use]
    pub fn property_index(&self, name: &str) -> Option<u32> {
        self.properties
            .iter()
            .position(|p| p.name() == name)
            .and_then(|i| u32::try_from(i).ok())
    }

    /// Compares this descriptor's schema against another's.
    ///
    /// Type ids are excluded: they are registry-relative and legitimately
    /// differ across program versions. Returns a description of the first
    /// difference, or `None` when the schemas match.
    #[must_use]
    pub fn schema_diff(&self, other: &StorageTypeMetadata) -> Option<String> {
        if self.fqn != other.fqn {
            return Some(format!("type name {} vs {}", self.fqn, other.fqn));
        }
        if self.has_symbolic_id != other.has_symbolic_id {
            return Some("symbolic id declaration differs".to_string());
        }
        if self.owners != other.owners {
            return Some("owner declarations differ".to_string());
        }
        if self.properties.len() != other.properties.len() {
            return Some(format!(
                "property count {} vs {}",
                self.properties.len(),
                other.properties.len()
            ));
        }
        for (mine, theirs) in self.properties.iter().zip(&other.properties) {
            if mine != theirs {
                return Some(format!("property {} differs", mine.name()));
            }
        }
        None
    }

    fn with_type_id(mut self, type_id: TypeId) -> Self {
        self.type_id = type_id;
        self
    }
}

/// Descriptor for one property of an entity type.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyMetadata {
    name: Arc<str>,
    optional: bool,
    multiple: bool,
    kind: PropertyKind,
}

impl PropertyMetadata {
    /// Creates a required, single-valued scalar property.
    #[must_use]
    pub fn scalar(name: impl Into<Arc<str>>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            optional: false,
            multiple: false,
            kind: PropertyKind::Scalar(ty),
        }
    }

    /// Creates a required, single-valued non-owning reference property.
    #[must_use]
    pub fn reference(name: impl Into<Arc<str>>, target_fqn: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            optional: false,
            multiple: false,
            kind: PropertyKind::Reference {
                target_fqn: target_fqn.into(),
            },
        }
    }

    /// Marks the property as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Marks the property as multi-valued (stored as a list).
    #[must_use]
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// The property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the property may be absent.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Whether the property holds a list of values.
    #[must_use]
    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    /// The property's kind.
    #[must_use]
    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }
}

/// Whether a property holds scalar data or references another entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    /// Plain data of the given value type.
    Scalar(ValueType),
    /// Non-owning cross-reference to entities of the given type.
    ///
    /// Removing the referenced entity leaves the referencing entity intact
    /// with a reference that no longer resolves.
    Reference {
        /// Fully-qualified name of the referenced type.
        target_fqn: Arc<str>,
    },
}

/// Registry of all entity type descriptors in a lineage.
///
/// Built once via [`MetadataRegistryBuilder`]; never mutated afterwards.
#[derive(Debug)]
pub struct MetadataRegistry {
    types: Vec<Arc<StorageTypeMetadata>>,
    by_fqn: HashMap<Arc<str>, TypeId>,
}

impl MetadataRegistry {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> MetadataRegistryBuilder {
        MetadataRegistryBuilder {
            types: Vec::new(),
            by_fqn: HashMap::new(),
        }
    }

    /// Looks up metadata by fully-qualified type name.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MissingTypeMetadata`](trestle_foundation::ErrorKind::MissingTypeMetadata)
    /// if no descriptor is registered for `fqn`.
    pub fn metadata_by_type_fqn(&self, fqn: &str) -> Result<&Arc<StorageTypeMetadata>> {
        self.metadata_by_type_fqn_or_null(fqn)
            .ok_or_else(|| Error::missing_type_metadata(fqn))
    }

    /// Non-failing variant of [`MetadataRegistry::metadata_by_type_fqn`].
    #[must_use]
    pub fn metadata_by_type_fqn_or_null(&self, fqn: &str) -> Option<&Arc<StorageTypeMetadata>> {
        let type_id = self.by_fqn.get(fqn)?;
        self.types.get(type_id.index() as usize)
    }

    /// Looks up metadata by dense type id.
    #[must_use]
    pub fn metadata_by_type_id(&self, type_id: TypeId) -> Option<&Arc<StorageTypeMetadata>> {
        self.types.get(type_id.index() as usize)
    }

    /// The number of registered types.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Iterates all registered descriptors in type-id order.
    pub fn types(&self) -> impl Iterator<Item = &Arc<StorageTypeMetadata>> {
        self.types.iter()
    }
}

/// Accumulates type descriptors and assigns dense type ids.
#[derive(Debug)]
pub struct MetadataRegistryBuilder {
    types: Vec<Arc<StorageTypeMetadata>>,
    by_fqn: HashMap<Arc<str>, TypeId>,
}

impl MetadataRegistryBuilder {
    /// Registers a type descriptor, assigning it the next dense type id.
    ///
    /// # Errors
    ///
    /// Returns an error if a descriptor with the same FQN is already
    /// registered.
    pub fn register(&mut self, metadata: StorageTypeMetadata) -> Result<TypeId> {
        let fqn: Arc<str> = metadata.fqn.clone();
        if self.by_fqn.contains_key(&fqn) {
            return Err(Error::schema_mismatch(
                fqn.as_ref(),
                "type registered twice",
            ));
        }
        let type_id = TypeId::new(
            u32::try_from(self.types.len()).map_err(|_| {
                Error::schema_mismatch(fqn.as_ref(), "too many registered types")
            })?,
        );
        self.types.push(Arc::new(metadata.with_type_id(type_id)));
        self.by_fqn.insert(fqn, type_id);
        Ok(type_id)
    }

    /// Finalizes the registry.
    #[must_use]
    pub fn build(self) -> Arc<MetadataRegistry> {
        Arc::new(MetadataRegistry {
            types: self.types,
            by_fqn: self.by_fqn,
        })
    }
}
