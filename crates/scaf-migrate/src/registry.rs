//! Memoised manifest registry.
//!
//! [`ManifestRegistry`] wraps a [`ManifestSource`] and loads it at most once,
//! handing out a shared [`ManifestIndex`]. The memo is owned by the registry
//! object rather than being process-global: construct one registry per
//! command invocation and call [`clear`](ManifestRegistry::clear) or
//! [`reload`](ManifestRegistry::reload) to pick up changed manifests.
//!
//! # Usage
//!
//! ```
//! use scaf_core::Version;
//! use scaf_migrate::{ManifestRegistry, StaticSource};
//!
//! let registry = ManifestRegistry::new(
//!     StaticSource::new().with_json("0.2.0.json", r#"{"version": "0.2.0"}"#),
//! );
//! let index = registry.manifests()?;
//! assert!(index.get(&Version::new("0.2.0")).is_some());
//! # Ok::<(), scaf_migrate::MigrateError>(())
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use camino::Utf8Path;
use parking_lot::RwLock;
use scaf_core::{MigrationManifest, Version};
use tracing::{debug, info};

use crate::error::MigrateError;
use crate::source::{DirectorySource, LoadedManifest, ManifestSource, SourceLoad};

/// Every loaded manifest, indexed and ordered by version.
///
/// Built once from a [`SourceLoad`]; immutable afterwards.
#[derive(Debug, Default)]
pub struct ManifestIndex {
    manifests: BTreeMap<Version, MigrationManifest>,
    origins: BTreeMap<Version, String>,
    failures: Vec<MigrateError>,
}

impl ManifestIndex {
    /// Indexes a source load.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::DuplicateVersion`] if two manifests declare
    /// versions that compare equal.
    pub fn build(load: SourceLoad) -> Result<Self, MigrateError> {
        let SourceLoad {
            manifests: loaded,
            failures,
        } = load;

        let mut manifests = BTreeMap::new();
        let mut origins: BTreeMap<Version, String> = BTreeMap::new();

        for LoadedManifest { origin, manifest } in loaded {
            if let Some(first) = origins.get(&manifest.version) {
                return Err(MigrateError::DuplicateVersion {
                    version: manifest.version.to_string(),
                    first: first.clone(),
                    second: origin,
                });
            }
            origins.insert(manifest.version.clone(), origin);
            manifests.insert(manifest.version.clone(), manifest);
        }

        Ok(Self {
            manifests,
            origins,
            failures,
        })
    }

    /// Returns the manifest for `version`.
    #[must_use]
    pub fn get(&self, version: &Version) -> Option<&MigrationManifest> {
        self.manifests.get(version)
    }

    /// Returns where the manifest for `version` was loaded from.
    #[must_use]
    pub fn origin(&self, version: &Version) -> Option<&str> {
        self.origins.get(version).map(String::as_str)
    }

    /// Iterates over manifests in ascending version order.
    pub fn iter(&self) -> impl Iterator<Item = &MigrationManifest> {
        self.manifests.values()
    }

    /// Iterates over indexed versions in ascending order.
    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.manifests.keys()
    }

    /// Returns the newest indexed version.
    #[must_use]
    pub fn latest(&self) -> Option<&Version> {
        self.manifests.keys().next_back()
    }

    /// Returns the number of indexed manifests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    /// Returns `true` if no manifest was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    /// Manifests that were excluded while loading.
    #[must_use]
    pub fn failures(&self) -> &[MigrateError] {
        &self.failures
    }
}

/// A lazily loaded, memoised view of a [`ManifestSource`].
///
/// # Thread Safety
///
/// The memo sits behind a [`RwLock`]; concurrent callers of
/// [`manifests`](Self::manifests) share one load.
pub struct ManifestRegistry {
    source: Box<dyn ManifestSource>,
    cache: RwLock<Option<Arc<ManifestIndex>>>,
}

impl ManifestRegistry {
    /// Creates a registry over `source`. Nothing is loaded yet.
    #[must_use]
    pub fn new(source: impl ManifestSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: RwLock::new(None),
        }
    }

    /// Creates a registry over a directory of `*.json` manifests.
    #[must_use]
    pub fn from_dir(dir: &Utf8Path) -> Self {
        Self::new(DirectorySource::new(dir))
    }

    /// Returns the manifest index, loading the source on first use.
    ///
    /// Repeated calls return the same index until [`clear`](Self::clear).
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::DuplicateVersion`] if the source declares a
    /// version twice. A failed load is not memoised.
    pub fn manifests(&self) -> Result<Arc<ManifestIndex>, MigrateError> {
        if let Some(index) = self.cache.read().as_ref() {
            return Ok(Arc::clone(index));
        }

        let mut cache = self.cache.write();
        if let Some(index) = cache.as_ref() {
            return Ok(Arc::clone(index));
        }

        let index = Arc::new(ManifestIndex::build(self.source.load())?);
        info!(
            source = %self.source.describe(),
            manifests = index.len(),
            failures = index.failures().len(),
            latest = ?index.latest().map(Version::as_str),
            "Manifest registry loaded"
        );
        *cache = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Returns `true` if the source has been loaded and memoised.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.cache.read().is_some()
    }

    /// Drops the memo; the next read re-scans the source.
    pub fn clear(&self) {
        debug!(source = %self.source.describe(), "Clearing manifest registry");
        *self.cache.write() = None;
    }

    /// Clears the memo and loads the source again.
    ///
    /// # Errors
    ///
    /// Same as [`manifests`](Self::manifests).
    pub fn reload(&self) -> Result<Arc<ManifestIndex>, MigrateError> {
        self.clear();
        self.manifests()
    }
}

impl fmt::Debug for ManifestRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestRegistry")
            .field("source", &self.source.describe())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use camino::Utf8PathBuf;

    use super::*;
    use crate::source::StaticSource;

    fn temp_dir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_missing_directory_yields_empty_registry() {
        let registry = ManifestRegistry::from_dir(Utf8Path::new("/nonexistent/scaf/manifests"));
        let index = registry.manifests().unwrap();
        assert!(index.is_empty());
        assert!(index.failures().is_empty());
    }

    #[test]
    fn test_one_valid_one_invalid() {
        let (_guard, dir) = temp_dir();
        fs::write(dir.join("0.2.0.json"), r#"{"version": "0.2.0"}"#).unwrap();
        fs::write(dir.join("0.3.0.json"), r#"{"version": "0.3.0", "migrations": ["#).unwrap();

        let registry = ManifestRegistry::from_dir(&dir);
        let index = registry.manifests().unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.get(&Version::new("0.2.0")).is_some());
        assert!(index.get(&Version::new("0.3.0")).is_none());
        assert_eq!(index.failures().len(), 1);
    }

    #[test]
    fn test_memoised_until_cleared() {
        let (_guard, dir) = temp_dir();
        fs::write(dir.join("0.2.0.json"), r#"{"version": "0.2.0"}"#).unwrap();

        let registry = ManifestRegistry::from_dir(&dir);
        assert!(!registry.is_loaded());
        let first = registry.manifests().unwrap();
        assert!(registry.is_loaded());

        fs::write(dir.join("0.3.0.json"), r#"{"version": "0.3.0"}"#).unwrap();
        let second = registry.manifests().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);

        registry.clear();
        assert!(!registry.is_loaded());
        let third = registry.manifests().unwrap();
        assert_eq!(third.len(), 2);

        fs::write(dir.join("0.4.0.json"), r#"{"version": "0.4.0"}"#).unwrap();
        assert_eq!(registry.reload().unwrap().len(), 3);
    }

    #[test]
    fn test_duplicate_versions_fail_the_load() {
        let registry = ManifestRegistry::new(
            StaticSource::new()
                .with_json("a.json", r#"{"version": "0.2.0"}"#)
                .with_json("b.json", r#"{"version": "0.2"}"#),
        );
        let err = registry.manifests().unwrap_err();
        match err {
            MigrateError::DuplicateVersion {
                version,
                first,
                second,
            } => {
                assert_eq!(version, "0.2");
                assert_eq!(first, "a.json");
                assert_eq!(second, "b.json");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!registry.is_loaded());
    }

    #[test]
    fn test_index_accessors() {
        let registry = ManifestRegistry::new(
            StaticSource::new()
                .with_json("0.3.0.json", r#"{"version": "0.3.0"}"#)
                .with_json("0.2.0-beta.1.json", r#"{"version": "0.2.0-beta.1"}"#)
                .with_json("0.2.0.json", r#"{"version": "0.2.0"}"#),
        );
        let index = registry.manifests().unwrap();
        let versions: Vec<&str> = index.versions().map(Version::as_str).collect();
        assert_eq!(versions, ["0.2.0-beta.1", "0.2.0", "0.3.0"]);
        assert_eq!(index.latest().map(Version::as_str), Some("0.3.0"));
        assert_eq!(index.origin(&Version::new("0.2.0")), Some("0.2.0.json"));
    }

    #[test]
    fn test_debug_does_not_load() {
        let registry = ManifestRegistry::new(StaticSource::new());
        let debug = format!("{registry:?}");
        assert!(debug.contains("loaded: false"));
        assert!(!registry.is_loaded());
    }

    #[test]
    fn test_bundled_manifests_are_valid() {
        let dir = Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../templates/manifests");
        let index = ManifestRegistry::from_dir(&dir).manifests().unwrap();
        assert!(index.failures().is_empty(), "{:?}", index.failures());
        assert_eq!(index.latest().map(Version::as_str), Some(env!("CARGO_PKG_VERSION")));

        let summary = index.summary(&Version::new("0.2.0"), &Version::new("0.4.0"));
        assert!(summary.breaking);
        assert_eq!(summary.guides.len(), 1);
    }
}
