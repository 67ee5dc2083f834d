//! Declarative schema definitions.
//!
//! The configuration loader deserializes these structures and hands them to
//! [`super::Schema::from_definition`], which validates them eagerly and
//! builds the immutable runtime tree.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A query condition in a schema definition. The special string value
/// `"$parent"` is substituted at resolution time with the nearest resolved
/// ancestor entity, which is how entity folders scope their fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterDefinition {
    pub field: String,
    pub value: serde_json::Value,
}

fn default_true() -> bool {
    true
}

/// One node in the declarative folder tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaNodeDefinition {
    /// A folder with a fixed name.
    Static {
        name: String,
        #[serde(default)]
        children: Vec<SchemaNodeDefinition>,
    },
    /// One folder per entity of `entity_type`; the name pattern references
    /// entity fields, e.g. `{code}`.
    Entity {
        entity_type: String,
        name: String,
        #[serde(default)]
        filters: Vec<FilterDefinition>,
        /// When true the node fans out to all matching entities even if no
        /// entity of its type is on the requested chain; when false it only
        /// resolves for the entity that triggered the request.
        #[serde(default = "default_true")]
        create_with_parent: bool,
        #[serde(default)]
        children: Vec<SchemaNodeDefinition>,
    },
    /// A per-user workspace folder; resolved only when the folder-creation
    /// request carries a user. The name pattern references user fields,
    /// e.g. `{login}`.
    Workspace {
        name: String,
        #[serde(default)]
        children: Vec<SchemaNodeDefinition>,
    },
    /// A symlink to `target` (resolved against the nearest entity's
    /// fields). Leaf node.
    Symlink { name: String, target: String },
    /// A file copied from `source` into the parent folder. Leaf node.
    File { name: String, source: PathBuf },
}

/// Root of the declarative schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Storage root the tree hangs off; the primary root when omitted.
    #[serde(default)]
    pub root: Option<String>,
    /// Topmost node, conventionally the project entity folder.
    pub top: SchemaNodeDefinition,
}
