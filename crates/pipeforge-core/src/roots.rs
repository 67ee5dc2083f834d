//! Storage roots: named, platform-resolved base paths.
//!
//! Every template and every schema hangs off a named root. Roots carry one
//! absolute path per platform so a single configuration serves mixed-OS
//! studios; exactly one root is flagged primary and is used when nothing
//! more specific is requested.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ConfigurationError;
use crate::paths::{PathError, lookup_form, normalize_separators};

/// Platform discriminator for root resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Linux,
    Mac,
    Windows,
}

impl Platform {
    /// The platform this process is running on.
    pub const fn current() -> Self {
        #[cfg(target_os = "macos")]
        {
            Self::Mac
        }
        #[cfg(target_os = "windows")]
        {
            Self::Windows
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            Self::Linux
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Mac => "mac",
            Self::Windows => "windows",
        }
    }
}

/// Declarative definition of a single storage root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageRootDefinition {
    pub name: String,
    #[serde(default)]
    pub linux_path: Option<PathBuf>,
    #[serde(default)]
    pub mac_path: Option<PathBuf>,
    #[serde(default)]
    pub windows_path: Option<PathBuf>,
    /// Exactly one root in a configuration must set this.
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone)]
struct StorageRoot {
    linux: Option<PathBuf>,
    mac: Option<PathBuf>,
    windows: Option<PathBuf>,
}

impl StorageRoot {
    fn path_for(&self, platform: Platform) -> Option<&Path> {
        match platform {
            Platform::Linux => self.linux.as_deref(),
            Platform::Mac => self.mac.as_deref(),
            Platform::Windows => self.windows.as_deref(),
        }
    }
}

/// Immutable mapping from root name to per-platform absolute path.
#[derive(Debug, Clone)]
pub struct StorageRoots {
    roots: BTreeMap<String, StorageRoot>,
    primary: String,
}

impl StorageRoots {
    /// Build and validate the root set from declarative definitions.
    ///
    /// Fails when no roots are defined, a name is duplicated, or the number
    /// of roots flagged default is not exactly one.
    pub fn from_definitions(
        definitions: Vec<StorageRootDefinition>,
    ) -> Result<Self, ConfigurationError> {
        if definitions.is_empty() {
            return Err(ConfigurationError::NoStorageRoots);
        }

        let mut roots = BTreeMap::new();
        let mut primary = None;
        for def in definitions {
            if def.default {
                if let Some(existing) = &primary {
                    return Err(ConfigurationError::MultiplePrimaryRoots {
                        first: String::clone(existing),
                        second: def.name,
                    });
                }
                primary = Some(def.name.clone());
            }
            let root = StorageRoot {
                linux: def.linux_path,
                mac: def.mac_path,
                windows: def.windows_path,
            };
            if roots.insert(def.name.clone(), root).is_some() {
                return Err(ConfigurationError::DuplicateRoot(def.name));
            }
        }

        let primary = primary.ok_or(ConfigurationError::NoPrimaryRoot)?;
        Ok(Self { roots, primary })
    }

    /// Name of the primary root.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.roots.contains_key(name)
    }

    /// Absolute base path of `name` on the current platform.
    pub fn resolve(&self, name: &str) -> Result<&Path, PathError> {
        self.resolve_for(name, Platform::current())
    }

    /// Absolute base path of `name` on an explicit platform.
    pub fn resolve_for(&self, name: &str, platform: Platform) -> Result<&Path, PathError> {
        let root = self
            .roots
            .get(name)
            .ok_or_else(|| PathError::UnknownRoot(name.to_string()))?;
        root.path_for(platform)
            .ok_or_else(|| PathError::NoPlatformPath {
                root: name.to_string(),
                platform: platform.as_str().to_string(),
            })
    }

    /// Reverse-resolve an absolute path into (root name, relative path).
    ///
    /// The longest matching root wins so nested roots behave predictably.
    /// The returned relative path uses `/` separators and original casing.
    pub fn split(&self, path: &Path) -> Result<(String, String), PathError> {
        let candidate = normalize_separators(&path.to_string_lossy());
        let candidate_fold = lookup_form(&candidate);

        let mut best: Option<(usize, String, String)> = None;
        for (name, root) in &self.roots {
            let Some(base) = root.path_for(Platform::current()) else {
                continue;
            };
            let base = normalize_separators(&base.to_string_lossy());
            let base = base.trim_end_matches('/').to_string();
            let base_fold = lookup_form(&base);

            let relative = if candidate_fold == base_fold {
                Some(String::new())
            } else if candidate_fold.starts_with(&base_fold)
                && candidate[base.len()..].starts_with('/')
            {
                Some(candidate[base.len() + 1..].to_string())
            } else {
                None
            };

            if let Some(rel) = relative
                && best.as_ref().is_none_or(|(len, _, _)| base.len() > *len)
            {
                best = Some((base.len(), name.clone(), rel));
            }
        }

        best.map(|(_, name, rel)| (name, rel))
            .ok_or_else(|| PathError::OutsideRoots(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StorageRoots {
        StorageRoots::from_definitions(vec![
            StorageRootDefinition {
                name: "primary".to_string(),
                linux_path: Some(PathBuf::from("/mnt/projects")),
                mac_path: Some(PathBuf::from("/Volumes/projects")),
                windows_path: Some(PathBuf::from("P:\\projects")),
                default: true,
            },
            StorageRootDefinition {
                name: "renders".to_string(),
                linux_path: Some(PathBuf::from("/mnt/renders")),
                mac_path: None,
                windows_path: None,
                default: false,
            },
        ])
        .unwrap()
    }

    #[test]
    fn resolve_per_platform() {
        let roots = sample();
        assert_eq!(
            roots.resolve_for("primary", Platform::Linux).unwrap(),
            Path::new("/mnt/projects")
        );
        assert!(matches!(
            roots.resolve_for("renders", Platform::Mac),
            Err(PathError::NoPlatformPath { .. })
        ));
        assert!(matches!(
            roots.resolve("missing"),
            Err(PathError::UnknownRoot(_))
        ));
    }

    #[test]
    fn exactly_one_primary_enforced() {
        let err = StorageRoots::from_definitions(vec![StorageRootDefinition {
            name: "a".to_string(),
            linux_path: Some(PathBuf::from("/a")),
            mac_path: None,
            windows_path: None,
            default: false,
        }])
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::NoPrimaryRoot));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn split_finds_owning_root() {
        let roots = sample();
        let (name, rel) = roots
            .split(Path::new("/mnt/projects/shots/seq_010"))
            .unwrap();
        assert_eq!(name, "primary");
        assert_eq!(rel, "shots/seq_010");

        assert!(matches!(
            roots.split(Path::new("/tmp/elsewhere")),
            Err(PathError::OutsideRoots(_))
        ));
    }
}
