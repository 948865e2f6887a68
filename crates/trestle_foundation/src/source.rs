//! Provenance tags carried by every entity.

use std::fmt;
use std::sync::Arc;

/// The origin of an entity's data.
///
/// Used for filtering and conflict resolution by the collaborators that
/// load and serialize the model. Immutable once set on an entity; the
/// builder exposes no way to change it.
#[derive(Clone, Eq, PartialEq, Hash)]
pub enum EntitySource {
    /// Loaded from a project configuration file at the given path.
    ProjectFile {
        /// Path to the originating project file.
        path: Arc<str>,
    },
    /// Imported from an external build system (e.g. a Gradle or Maven sync).
    ExternalSystem {
        /// Identifier of the external system.
        system_id: Arc<str>,
    },
    /// Created programmatically, not backed by any persistent source.
    Internal,
}

impl EntitySource {
    /// Creates a project-file source.
    #[must_use]
    pub fn project_file(path: impl Into<Arc<str>>) -> Self {
        Self::ProjectFile { path: path.into() }
    }

    /// Creates an external-system source.
    #[must_use]
    pub fn external_system(system_id: impl Into<Arc<str>>) -> Self {
        Self::ExternalSystem {
            system_id: system_id.into(),
        }
    }
}

impl fmt::Debug for EntitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProjectFile { path } => write!(f, "ProjectFile({path})"),
            Self::ExternalSystem { system_id } => write!(f, "ExternalSystem({system_id})"),
            Self::Internal => write!(f, "Internal"),
        }
    }
}
