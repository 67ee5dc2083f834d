//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `sqlx` types in any signature
//! - No production-tracking backend specifics; entities are plain records
//! - Preview mode and tests swap implementations, never the core

pub mod data_source;
pub mod filesystem;
pub mod observer;
pub mod path_cache;

use std::sync::Arc;
use thiserror::Error;

// Re-export port traits and types for convenience
pub use data_source::{DataSource, DataSourceError};
pub use filesystem::{
    DiskFilesystem, FilesystemError, FilesystemMutator, FilesystemOp, RecordingFilesystem,
};
pub use observer::{CreationObserver, NoopObserver};
pub use path_cache::{PathCacheError, PathCacheRepository, PathMapping};

use crate::config::ConfigurationError;
use crate::paths::PathError;
use crate::schema::SchemaError;
use crate::templates::TemplateError;

/// Container for the collaborator trait objects the services need.
///
/// Provides a consistent way to wire collaborators across adapters without
/// coupling them to concrete implementations. Lives in `pipeforge-core` so
/// services can accept it without depending on `pipeforge-db`.
#[derive(Clone)]
pub struct Collaborators {
    /// Production-tracking backend queries.
    pub data_source: Arc<dyn DataSource>,
    /// Filesystem mutation (real disk, or recording for preview/tests).
    pub filesystem: Arc<dyn FilesystemMutator>,
    /// Persistent entity-path index.
    pub path_cache: Arc<dyn PathCacheRepository>,
    /// Post-process notifications.
    pub observer: Arc<dyn CreationObserver>,
}

impl Collaborators {
    pub fn new(
        data_source: Arc<dyn DataSource>,
        filesystem: Arc<dyn FilesystemMutator>,
        path_cache: Arc<dyn PathCacheRepository>,
        observer: Arc<dyn CreationObserver>,
    ) -> Self {
        Self {
            data_source,
            filesystem,
            path_cache,
            observer,
        }
    }
}

/// Core error type for semantic domain errors.
///
/// This is the canonical error type used across the core. Adapters map it
/// to their own error types (CLI exit codes, serialized responses).
/// Configuration errors stay distinguishable from transient I/O so retry
/// logic built on top can decide correctly.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration is malformed or inconsistent; fatal, never retried.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A template operation failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Schema resolution failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The data source failed or the entity does not exist.
    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    /// A filesystem mutation failed.
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    /// A path-cache operation failed or conflicted.
    #[error(transparent)]
    PathCache(#[from] PathCacheError),

    /// Path resolution or normalization failed.
    #[error(transparent)]
    Path(#[from] PathError),
}
