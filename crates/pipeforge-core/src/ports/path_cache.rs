//! Path-cache repository port definition.
//!
//! The path cache is the persistent bidirectional index between entities
//! and the folders created for them. Implementations must serialize
//! writers; readers may run concurrently. Paths are durable: entries are
//! never mutated in place.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::EntityRef;

/// One entity-to-location mapping.
///
/// `relative_path` is always stored normalized (`/` separators, no leading
/// or trailing separator); see [`crate::paths::normalize_relative`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub entity: EntityRef,
    pub root_name: String,
    pub relative_path: String,
    /// Exactly one mapping per (entity, root) may be primary.
    pub is_primary: bool,
}

impl PathMapping {
    pub fn primary(
        entity: EntityRef,
        root_name: impl Into<String>,
        relative_path: impl Into<String>,
    ) -> Self {
        Self {
            entity,
            root_name: root_name.into(),
            relative_path: relative_path.into(),
            is_primary: true,
        }
    }
}

/// Errors that can occur in path-cache operations.
///
/// Conflicts are kept distinct from storage failures: a conflict means the
/// data or configuration is inconsistent and retrying cannot help.
#[derive(Debug, Error)]
pub enum PathCacheError {
    /// A different entity already owns this exact location.
    #[error(
        "Path '{root_name}/{relative_path}' is already registered to {existing}, \
         cannot register {attempted}"
    )]
    Conflict {
        root_name: String,
        relative_path: String,
        existing: EntityRef,
        attempted: EntityRef,
    },

    /// The entity already has a primary location under this root.
    #[error("{entity} already has a primary path under root '{root_name}': {existing_path}")]
    PrimaryConflict {
        entity: EntityRef,
        root_name: String,
        existing_path: String,
    },

    /// The store is unreadable or failed an integrity check. The cache
    /// needs a full resync; this is never silently ignored.
    #[error("Path cache store is corrupt and needs a full resync: {0}")]
    Corrupt(String),

    /// Storage backend error (transient I/O, locking, etc.).
    #[error("Path cache storage error: {0}")]
    Storage(String),
}

/// Port for path-cache persistence operations.
#[async_trait]
pub trait PathCacheRepository: Send + Sync {
    /// Insert a mapping.
    ///
    /// Idempotent: re-inserting an identical mapping is a no-op. A
    /// different entity claiming the same location fails with
    /// [`PathCacheError::Conflict`].
    async fn add_mapping(&self, mapping: &PathMapping) -> Result<(), PathCacheError>;

    /// All known locations for an entity, primaries first.
    async fn get_paths(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> Result<Vec<PathMapping>, PathCacheError>;

    /// Reverse lookup: the entity registered at a location, if any. The
    /// relative path is normalized before comparison.
    async fn get_entity(
        &self,
        root_name: &str,
        relative_path: &str,
    ) -> Result<Option<EntityRef>, PathCacheError>;

    /// Remove every mapping for an entity. Returns the number removed.
    async fn remove_mappings(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> Result<u64, PathCacheError>;

    /// Drop all mappings - the full-resync escape hatch for a corrupt or
    /// out-of-date store.
    async fn wipe(&self) -> Result<(), PathCacheError>;
}
