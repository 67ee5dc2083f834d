//! Core engine of pipeforge: template/path resolution, declarative folder
//! schemas, storage roots, bundle descriptors and the port definitions the
//! adapters implement.
//!
//! The crate is organized hexagonally, with all infrastructure behind
//! ports:
//!
//! - `domain` - entities, field values, contexts
//! - `templates` - the bidirectional template/path engine
//! - `schema` - the folder-structure generation engine
//! - `roots` / `paths` - storage roots and path normalization
//! - `bundles` - versioned bundle descriptors and cache layout
//! - `ports` - collaborator traits (data source, filesystem, path cache)
//! - `services` - the folder-creation orchestrator and context resolver
//! - `config` - eager load-time validation of the declarative definitions

pub mod bundles;
pub mod config;
pub mod domain;
pub mod paths;
pub mod ports;
pub mod roots;
pub mod schema;
pub mod services;
pub mod templates;

// Re-export commonly used types for convenience
pub use bundles::{BundleDescriptor, BundleType, BundleVersion};
pub use config::{ConfigurationDefinition, ConfigurationError, PipelineConfiguration};
pub use domain::{Context, Entity, EntityRef, FieldMap, FieldValue, Filter, FilterOp, FilterValue};
pub use ports::{
    Collaborators, CoreError, CreationObserver, DataSource, DataSourceError, DiskFilesystem,
    FilesystemError, FilesystemMutator, FilesystemOp, NoopObserver, PathCacheError,
    PathCacheRepository, PathMapping, RecordingFilesystem,
};
pub use roots::{Platform, StorageRootDefinition, StorageRoots};
pub use schema::{PlannedOp, PlannedPath, ResolutionRequest, Schema, SchemaDefinition, SchemaError};
pub use services::{
    ContextResolver, CreationPhase, CreationReport, FolderCreationError, FolderCreationRequest,
    FolderCreator,
};
pub use templates::{
    KeyDefinition, KeyKind, Template, TemplateDefinition, TemplateError, TemplateKey, TemplateSet,
};

// Re-export path utilities
pub use paths::{PathError, join_relative, normalize_relative, normalize_separators};
