//! The output of schema resolution: an ordered creation plan.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::EntityRef;
use crate::paths::{PathError, join_relative};
use crate::roots::StorageRoots;

/// What kind of filesystem mutation a planned path requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannedOp {
    /// Create a directory.
    Folder,
    /// Copy a file from a configuration-supplied source into place.
    File { source: PathBuf },
    /// Create a symlink pointing at `target` (relative to the link's
    /// parent directory). Skipped without error on platforms that do not
    /// support symlinks.
    Symlink { target: String },
}

/// One concrete path the schema wants to exist, in plan order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedPath {
    /// Storage root the path lives under.
    pub root_name: String,
    /// Root-relative path with `/` separators.
    pub relative: String,
    pub op: PlannedOp,
    /// The entity this path represents, for entity folders. Paths without
    /// an entity are never recorded in the path cache.
    pub entity: Option<EntityRef>,
    /// True when this is the entity's canonical location under its root.
    pub is_primary: bool,
}

impl PlannedPath {
    pub fn folder(root_name: impl Into<String>, relative: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
            relative: relative.into(),
            op: PlannedOp::Folder,
            entity: None,
            is_primary: false,
        }
    }

    pub fn for_entity(mut self, entity: EntityRef) -> Self {
        self.entity = Some(entity);
        self.is_primary = true;
        self
    }

    /// Absolute location of this path on the current platform.
    pub fn absolute(&self, roots: &StorageRoots) -> Result<PathBuf, PathError> {
        Ok(join_relative(roots.resolve(&self.root_name)?, &self.relative))
    }
}
