//! Path normalization for platform-independent comparisons.
//!
//! The path cache stores root-relative paths and must treat
//! `Shots\seq_010\` and `shots/seq_010` as the same location. Every value
//! that enters or queries the cache passes through these helpers first.

use std::path::{Path, PathBuf};

use super::error::PathError;

/// Replace backslash separators with forward slashes.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Normalize a root-relative path for storage and lookup.
///
/// Separators become `/`, leading and trailing separators are stripped, and
/// empty or `.` components are dropped. Parent components (`..`) are
/// rejected: a cached path must never escape its root.
pub fn normalize_relative(path: &str) -> Result<String, PathError> {
    let unified = normalize_separators(path);
    let mut parts = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => {}
            ".." => return Err(PathError::EscapesRoot(path.to_string())),
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return Err(PathError::EmptyPath);
    }
    Ok(parts.join("/"))
}

/// Case-folded form of an already-normalized relative path, used purely for
/// equality checks. SQLite's NOCASE collation performs the same ASCII fold
/// on the stored side.
pub fn lookup_form(normalized: &str) -> String {
    normalized.to_ascii_lowercase()
}

/// Join a normalized relative path onto an absolute root path.
pub fn join_relative(root: &Path, relative: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for part in relative.split('/') {
        out.push(part);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_and_duplicate_separators() {
        assert_eq!(
            normalize_relative("shots//seq_010/").unwrap(),
            "shots/seq_010"
        );
        assert_eq!(
            normalize_relative("shots\\seq_010\\shot_020").unwrap(),
            "shots/seq_010/shot_020"
        );
    }

    #[test]
    fn rejects_escaping_paths() {
        assert!(matches!(
            normalize_relative("shots/../../etc"),
            Err(PathError::EscapesRoot(_))
        ));
        assert!(matches!(normalize_relative("/"), Err(PathError::EmptyPath)));
    }

    #[test]
    fn lookup_form_folds_ascii_case() {
        assert_eq!(lookup_form("Shots/Seq_010"), "shots/seq_010");
    }

    #[test]
    fn join_builds_platform_paths() {
        let joined = join_relative(Path::new("/mnt/projects"), "shots/seq_010");
        assert_eq!(joined, Path::new("/mnt/projects/shots/seq_010"));
    }
}
