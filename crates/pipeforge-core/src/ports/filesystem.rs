//! Filesystem mutator port definition.
//!
//! All filesystem mutation goes through this port so that preview mode and
//! tests can substitute a recording implementation for the real disk.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while mutating the filesystem.
#[derive(Debug, Error)]
pub enum FilesystemError {
    /// Failed to create a directory.
    #[error("Failed to create directory {path}: {reason}")]
    CreateFailed { path: PathBuf, reason: String },

    /// A path was expected to be a directory but was not.
    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    /// A directory is not writable.
    #[error("Directory {path} is not writable: {reason}")]
    NotWritable { path: PathBuf, reason: String },

    /// Failed to copy a file into place.
    #[error("Failed to copy {src} to {dst}: {reason}")]
    CopyFailed {
        src: PathBuf,
        dst: PathBuf,
        reason: String,
    },

    /// Failed to create a symlink.
    #[error("Failed to link {link} -> {target}: {reason}")]
    SymlinkFailed {
        link: PathBuf,
        target: String,
        reason: String,
    },
}

/// Port for filesystem mutation.
#[async_trait]
pub trait FilesystemMutator: Send + Sync {
    /// Create a directory (and any missing parents). Must be idempotent:
    /// an existing directory is not an error.
    async fn create_folder(&self, path: &Path) -> Result<(), FilesystemError>;

    /// Copy a file into place, overwriting nothing (existing destinations
    /// are left untouched).
    async fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), FilesystemError>;

    /// Create a symlink at `link` pointing at `target`. On platforms
    /// without symlink support this is a silent no-op.
    async fn create_symlink(&self, target: &str, link: &Path) -> Result<(), FilesystemError>;
}

/// The real disk implementation.
#[derive(Debug, Default)]
pub struct DiskFilesystem;

#[async_trait]
impl FilesystemMutator for DiskFilesystem {
    async fn create_folder(&self, path: &Path) -> Result<(), FilesystemError> {
        if path.exists() {
            if !path.is_dir() {
                return Err(FilesystemError::NotADirectory(path.to_path_buf()));
            }
        } else {
            fs::create_dir_all(path).map_err(|e| FilesystemError::CreateFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        verify_writable(path)
    }

    async fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), FilesystemError> {
        if dst.exists() {
            return Ok(());
        }
        fs::copy(src, dst)
            .map(|_| ())
            .map_err(|e| FilesystemError::CopyFailed {
                src: src.to_path_buf(),
                dst: dst.to_path_buf(),
                reason: e.to_string(),
            })
    }

    async fn create_symlink(&self, target: &str, link: &Path) -> Result<(), FilesystemError> {
        #[cfg(unix)]
        {
            if link.exists() || link.is_symlink() {
                return Ok(());
            }
            std::os::unix::fs::symlink(target, link).map_err(|e| {
                FilesystemError::SymlinkFailed {
                    link: link.to_path_buf(),
                    target: target.to_string(),
                    reason: e.to_string(),
                }
            })
        }
        #[cfg(not(unix))]
        {
            tracing::debug!(?link, target, "symlinks unsupported on this platform, skipping");
            Ok(())
        }
    }
}

/// Verify a directory is writable by creating and removing a probe file.
fn verify_writable(path: &Path) -> Result<(), FilesystemError> {
    let probe = path.join(".pipeforge_write_test");
    let result = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&probe);

    match result {
        Ok(mut file) => {
            file.write_all(b"test")
                .map_err(|e| FilesystemError::NotWritable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            drop(file);
            let _ = fs::remove_file(&probe);
            Ok(())
        }
        Err(err) => Err(FilesystemError::NotWritable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }),
    }
}

/// One recorded filesystem operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilesystemOp {
    CreatedFolder(PathBuf),
    CopiedFile { src: PathBuf, dst: PathBuf },
    Symlinked { target: String, link: PathBuf },
}

/// Records requested operations without touching the disk.
///
/// Used by preview mode and by tests that assert on the exact mutation
/// sequence.
#[derive(Debug, Default)]
pub struct RecordingFilesystem {
    ops: Mutex<Vec<FilesystemOp>>,
}

impl RecordingFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations recorded so far, in request order.
    pub fn ops(&self) -> Vec<FilesystemOp> {
        self.ops.lock().expect("recording lock poisoned").clone()
    }

    fn record(&self, op: FilesystemOp) {
        self.ops.lock().expect("recording lock poisoned").push(op);
    }
}

#[async_trait]
impl FilesystemMutator for RecordingFilesystem {
    async fn create_folder(&self, path: &Path) -> Result<(), FilesystemError> {
        self.record(FilesystemOp::CreatedFolder(path.to_path_buf()));
        Ok(())
    }

    async fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), FilesystemError> {
        self.record(FilesystemOp::CopiedFile {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        });
        Ok(())
    }

    async fn create_symlink(&self, target: &str, link: &Path) -> Result<(), FilesystemError> {
        self.record(FilesystemOp::Symlinked {
            target: target.to_string(),
            link: link.to_path_buf(),
        });
        Ok(())
    }
}
