//! The folder-structure schema: a declarative tree describing what folders
//! to create for which entity types.
//!
//! A schema is parsed once per pipeline configuration and is read-only
//! during folder creation. Resolution walks the tree top-down against a
//! target entity's ancestor chain and emits an ordered plan of concrete
//! paths - parents strictly before children - without touching the
//! filesystem; the orchestrator in `services` executes the plan.

mod definition;
mod node;
mod plan;

use thiserror::Error;

pub use definition::{FilterDefinition, SchemaDefinition, SchemaNodeDefinition};
pub use node::{ResolutionRequest, Schema};
pub use plan::{PlannedOp, PlannedPath};

use crate::domain::EntityRef;
use crate::ports::data_source::DataSourceError;

/// Errors raised while resolving a schema against an entity chain.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A folder name pattern references a field the entity does not carry.
    #[error("Name pattern '{pattern}' references field '{field}' missing on {entity}")]
    NameFieldMissing {
        pattern: String,
        field: String,
        entity: EntityRef,
    },

    /// A resolved folder name came out empty.
    #[error("Name pattern '{pattern}' resolved to an empty name for {entity}")]
    EmptyName { pattern: String, entity: EntityRef },

    /// The data source failed while fanning out an entity folder.
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
}
