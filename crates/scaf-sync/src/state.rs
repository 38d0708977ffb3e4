//! Persisted project state: the version marker and the platform selection.

use std::fmt;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use scaf_core::{Platform, PlatformSelection, ProjectConfig, ProjectPaths, Version};
use serde::Serialize;
use tracing::debug;

use crate::error::SyncError;
use crate::fsio::write_atomic;

/// Reads and writes the project's recorded tool version.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: Utf8PathBuf,
}

impl VersionStore {
    /// Creates a store for the project at `paths`.
    #[must_use]
    pub fn new(paths: &ProjectPaths) -> Self {
        Self {
            path: paths.version_file(),
        }
    }

    /// The marker file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Reads the recorded version.
    ///
    /// Returns `Ok(None)` if the marker is missing or blank.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Io`] if the marker exists but cannot be read.
    pub fn read(&self) -> Result<Option<Version>, SyncError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(None),
            Ok(text) => Ok(Some(Version::new(text))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::io(&self.path, e)),
        }
    }

    /// Records `version`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Io`] if the marker cannot be written.
    pub fn write(&self, version: &Version) -> Result<(), SyncError> {
        write_atomic(&self.path, format!("{version}\n").as_bytes())?;
        debug!(path = %self.path, version = %version, "Recorded project version");
        Ok(())
    }
}

/// Where a project's platform selection came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "platforms", rename_all = "snake_case")]
pub enum PlatformResolution {
    /// Read from the project configuration.
    Configured(PlatformSelection),
    /// No configuration exists; inferred from the platform directories
    /// present in the project.
    Inferred(PlatformSelection),
}

impl PlatformResolution {
    /// The resolved selection.
    #[must_use]
    pub fn selection(&self) -> &PlatformSelection {
        match self {
            Self::Configured(selection) | Self::Inferred(selection) => selection,
        }
    }

    /// Consumes the resolution, returning the selection.
    #[must_use]
    pub fn into_selection(self) -> PlatformSelection {
        match self {
            Self::Configured(selection) | Self::Inferred(selection) => selection,
        }
    }

    /// Returns `true` if the selection was inferred.
    #[must_use]
    pub const fn is_inferred(&self) -> bool {
        matches!(self, Self::Inferred(_))
    }
}

impl fmt::Display for PlatformResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configured(selection) => write!(f, "{selection} (configured)"),
            Self::Inferred(selection) => write!(f, "{selection} (inferred from project layout)"),
        }
    }
}

/// Resolves the platform selection of the project at `paths`.
///
/// Uses the configuration when present; otherwise falls back to
/// [`infer_platforms`].
///
/// # Errors
///
/// Returns [`SyncError::Config`] if a configuration file exists but cannot
/// be read or parsed.
pub fn resolve_platforms(paths: &ProjectPaths) -> Result<PlatformResolution, SyncError> {
    match load_config(paths)? {
        Some(config) => Ok(PlatformResolution::Configured(config.platforms)),
        None => {
            let inferred = infer_platforms(paths.root());
            debug!(root = %paths.root(), platforms = %inferred, "No configuration, inferred platforms");
            Ok(PlatformResolution::Inferred(inferred))
        }
    }
}

/// Selects every platform whose configuration directory exists under `root`.
#[must_use]
pub fn infer_platforms(root: &Utf8Path) -> PlatformSelection {
    Platform::ALL
        .into_iter()
        .filter(|platform| root.join(platform.config_dir()).is_dir())
        .collect()
}

/// Loads the project configuration, if any.
///
/// # Errors
///
/// Returns [`SyncError::Config`] on unreadable or malformed configuration.
pub fn load_config(paths: &ProjectPaths) -> Result<Option<ProjectConfig>, SyncError> {
    Ok(ProjectConfig::load(&paths.config_file())?)
}

/// Writes the project configuration.
///
/// # Errors
///
/// Returns [`SyncError::Io`] if the file cannot be written.
pub fn save_config(paths: &ProjectPaths, config: &ProjectConfig) -> Result<(), SyncError> {
    let path = paths.config_file();
    let mut json = config
        .to_json()
        .map_err(|e| SyncError::serialize(&path, e))?;
    json.push('\n');
    write_atomic(&path, json.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scaf_core::ConflictPolicy;

    fn temp_project() -> (tempfile::TempDir, ProjectPaths) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, ProjectPaths::new(root))
    }

    #[test]
    fn test_version_store_roundtrip() {
        let (_guard, paths) = temp_project();
        let store = VersionStore::new(&paths);
        assert!(store.read().unwrap().is_none());

        store.write(&Version::new("0.3.0-beta.2")).unwrap();
        assert_eq!(store.read().unwrap(), Some(Version::new("0.3.0-beta.2")));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "0.3.0-beta.2\n");
    }

    #[test]
    fn test_blank_version_marker_is_missing() {
        let (_guard, paths) = temp_project();
        fs::create_dir_all(paths.state_dir()).unwrap();
        fs::write(paths.version_file(), "  \n").unwrap();
        assert!(VersionStore::new(&paths).read().unwrap().is_none());
    }

    #[test]
    fn test_configured_selection_wins() {
        let (_guard, paths) = temp_project();
        fs::create_dir_all(paths.root().join(".cursor")).unwrap();
        let config = ProjectConfig::new([Platform::Claude].into_iter().collect());
        save_config(&paths, &config).unwrap();

        let resolution = resolve_platforms(&paths).unwrap();
        assert!(!resolution.is_inferred());
        assert!(resolution.selection().contains(Platform::Claude));
        assert!(!resolution.selection().contains(Platform::Cursor));
    }

    #[test]
    fn test_inferred_from_directories() {
        let (_guard, paths) = temp_project();
        fs::create_dir_all(paths.root().join(".cursor/rules")).unwrap();
        fs::create_dir_all(paths.root().join(".iflow")).unwrap();
        fs::write(paths.root().join(".claude"), "not a directory").unwrap();

        let resolution = resolve_platforms(&paths).unwrap();
        assert!(resolution.is_inferred());
        let selection = resolution.into_selection();
        assert_eq!(selection.to_string(), "cursor, iflow");
    }

    #[test]
    fn test_inferred_empty_project() {
        let (_guard, paths) = temp_project();
        let resolution = resolve_platforms(&paths).unwrap();
        assert_eq!(resolution, PlatformResolution::Inferred(PlatformSelection::new()));
        assert_eq!(resolution.to_string(), "(none) (inferred from project layout)");
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let (_guard, paths) = temp_project();
        fs::create_dir_all(paths.state_dir()).unwrap();
        fs::write(paths.config_file(), "{ nope").unwrap();
        assert!(matches!(resolve_platforms(&paths), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_save_config_preserves_policy() {
        let (_guard, paths) = temp_project();
        let mut config = ProjectConfig::default();
        config.conflict_policy = ConflictPolicy::Skip;
        save_config(&paths, &config).unwrap();
        assert_eq!(load_config(&paths).unwrap(), Some(config));
    }
}
