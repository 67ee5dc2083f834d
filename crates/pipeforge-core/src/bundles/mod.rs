//! Versioned bundle plugins and their local cache layout.
//!
//! Bundles (apps, engines, frameworks) are described by descriptors and
//! materialized under a local bundle cache at
//! `<cache root>/<type dir>/<name>/<version>`. Fetching a bundle into the
//! cache is an external collaborator's job; this module owns the
//! descriptor types, version ordering, and cache-path resolution.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by bundle descriptor handling.
#[derive(Debug, Error)]
pub enum BundleError {
    /// A version string is not of the `vX.Y.Z` form.
    #[error("Cannot parse bundle version '{0}', expected vX.Y.Z")]
    InvalidVersion(String),

    /// The bundle cache directory could not be read.
    #[error("Cannot scan bundle cache at {path}: {reason}")]
    CacheUnreadable { path: PathBuf, reason: String },
}

/// What kind of plugin a bundle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleType {
    App,
    Engine,
    Framework,
}

impl BundleType {
    /// Directory name this bundle type lives under in the cache.
    pub const fn cache_dir(self) -> &'static str {
        match self {
            Self::App => "apps",
            Self::Engine => "engines",
            Self::Framework => "frameworks",
        }
    }
}

/// A `vX.Y.Z` bundle version with numeric ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BundleVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl BundleVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for BundleVersion {
    type Err = BundleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BundleError::InvalidVersion(s.to_string());
        let rest = s.strip_prefix('v').ok_or_else(invalid)?;
        let mut numbers = rest.split('.');
        let mut next = || -> Result<u32, BundleError> {
            numbers
                .next()
                .and_then(|n| n.parse().ok())
                .ok_or_else(invalid)
        };
        let version = Self::new(next()?, next()?, next()?);
        if numbers.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl fmt::Display for BundleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Ord for BundleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl PartialOrd for BundleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for BundleVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BundleVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identity of one bundle at one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleDescriptor {
    pub name: String,
    pub version: BundleVersion,
    #[serde(rename = "type")]
    pub bundle_type: BundleType,
}

impl BundleDescriptor {
    pub fn new(
        name: impl Into<String>,
        version: BundleVersion,
        bundle_type: BundleType,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            bundle_type,
        }
    }

    /// Where this bundle lives (or would live) under a cache root.
    pub fn cache_path(&self, cache_root: &Path) -> PathBuf {
        cache_root
            .join(self.bundle_type.cache_dir())
            .join(&self.name)
            .join(self.version.to_string())
    }

    /// True when the bundle is already materialized in the cache.
    pub fn is_cached(&self, cache_root: &Path) -> bool {
        self.cache_path(cache_root).is_dir()
    }
}

impl fmt::Display for BundleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Highest version of a bundle present in the cache, or `None` when the
/// bundle has never been cached. Directory entries that do not parse as
/// versions are ignored - the cache may contain scratch files.
pub fn latest_cached_version(
    cache_root: &Path,
    bundle_type: BundleType,
    name: &str,
) -> Result<Option<BundleVersion>, BundleError> {
    let dir = cache_root.join(bundle_type.cache_dir()).join(name);
    if !dir.exists() {
        return Ok(None);
    }

    let entries = std::fs::read_dir(&dir).map_err(|e| BundleError::CacheUnreadable {
        path: dir.clone(),
        reason: e.to_string(),
    })?;

    let mut latest: Option<BundleVersion> = None;
    for entry in entries {
        let entry = entry.map_err(|e| BundleError::CacheUnreadable {
            path: dir.clone(),
            reason: e.to_string(),
        })?;
        if !entry.path().is_dir() {
            continue;
        }
        if let Ok(version) = entry.file_name().to_string_lossy().parse::<BundleVersion>() {
            latest = Some(latest.map_or(version, |best| best.max(version)));
        }
    }
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn versions_parse_and_order_numerically() {
        let v: BundleVersion = "v1.2.3".parse().unwrap();
        assert_eq!(v, BundleVersion::new(1, 2, 3));
        assert_eq!(v.to_string(), "v1.2.3");

        // numeric, not lexicographic
        assert!("v0.10.0".parse::<BundleVersion>().unwrap()
            > "v0.9.9".parse::<BundleVersion>().unwrap());

        for bad in ["1.2.3", "v1.2", "v1.2.3.4", "va.b.c", ""] {
            assert!(bad.parse::<BundleVersion>().is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn descriptor_cache_layout() {
        let descriptor = BundleDescriptor::new(
            "tk-maya",
            BundleVersion::new(0, 9, 2),
            BundleType::Engine,
        );
        assert_eq!(
            descriptor.cache_path(Path::new("/var/bundles")),
            Path::new("/var/bundles/engines/tk-maya/v0.9.2")
        );
    }

    #[test]
    fn latest_version_scans_and_ignores_noise() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("apps/tk-multi-publish");
        for v in ["v0.1.0", "v0.2.0", "v0.10.1"] {
            std::fs::create_dir_all(base.join(v)).unwrap();
        }
        std::fs::create_dir_all(base.join("scratch")).unwrap();
        std::fs::write(base.join("notes.txt"), b"x").unwrap();

        let latest =
            latest_cached_version(tmp.path(), BundleType::App, "tk-multi-publish").unwrap();
        assert_eq!(latest, Some(BundleVersion::new(0, 10, 1)));

        let missing = latest_cached_version(tmp.path(), BundleType::App, "absent").unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn descriptor_serde_round_trip() {
        let descriptor = BundleDescriptor::new(
            "tk-multi-loader",
            BundleVersion::new(1, 0, 4),
            BundleType::App,
        );
        let json = serde_json::to_string(&descriptor).unwrap();
        assert!(json.contains("\"v1.0.4\""));
        let back: BundleDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, descriptor);
    }
}
