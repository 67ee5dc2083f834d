//! Path-related error types.
//!
//! Provides semantic errors for path operations without exposing
//! implementation details or adapter-specific concerns.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during path resolution and normalization.
#[derive(Debug, Error)]
pub enum PathError {
    /// A template or schema referenced a storage root that is not defined.
    #[error("Unknown storage root '{0}'")]
    UnknownRoot(String),

    /// A storage root has no path configured for the current platform.
    #[error("Storage root '{root}' has no path for platform '{platform}'")]
    NoPlatformPath { root: String, platform: String },

    /// A path was expected to fall under a storage root but does not.
    #[error("Path {0} is not under any configured storage root")]
    OutsideRoots(PathBuf),

    /// An empty path was provided.
    #[error("Path cannot be empty")]
    EmptyPath,

    /// A relative path escaped its root via parent components.
    #[error("Path {0} escapes its storage root")]
    EscapesRoot(String),
}
