//! Read-only inspection of a project.

use std::fmt;

use camino::Utf8PathBuf;
use scaf_core::{ProjectPaths, Version};
use scaf_migrate::{ManifestIndex, MigrationPlan, PlannedMigration};
use serde::Serialize;

use crate::error::SyncError;
use crate::fingerprint::FingerprintStore;
use crate::fsio::read_optional;
use crate::state::{PlatformResolution, VersionStore, resolve_platforms};

/// A snapshot of a project's tool state.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectStatus {
    /// The recorded version, if the project was ever initialized.
    pub version: Option<Version>,
    /// The platform selection and where it came from.
    pub platforms: PlatformResolution,
    /// Number of files with a recorded fingerprint.
    pub tracked: usize,
    /// Tracked files whose content no longer matches their fingerprint.
    pub modified: Vec<Utf8PathBuf>,
    /// Tracked files that no longer exist.
    pub missing: Vec<Utf8PathBuf>,
    /// Migrations up to the recorded version whose source still exists,
    /// typically left behind by a project that was copied or restored.
    pub leftovers: Vec<PlannedMigration>,
    /// Migrations still to apply to reach the target version.
    pub pending: MigrationPlan,
}

impl ProjectStatus {
    /// Inspects the project at `paths`, measuring pending migrations
    /// against `target`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Io`] if the state files or a tracked file cannot
    /// be read, or [`SyncError::Config`] if the configuration is malformed.
    pub fn collect(
        paths: &ProjectPaths,
        index: &ManifestIndex,
        target: &Version,
    ) -> Result<Self, SyncError> {
        let version = VersionStore::new(paths).read()?;
        let platforms = resolve_platforms(paths)?;
        let store = FingerprintStore::load(&paths.fingerprint_file())?;

        let mut modified = Vec::new();
        let mut missing = Vec::new();
        for (path, hash) in store.iter() {
            match read_optional(&paths.resolve(path))? {
                Some(contents) if !hash.matches(&contents) => modified.push(path.to_owned()),
                Some(_) => {}
                None => missing.push(path.to_owned()),
            }
        }

        let recorded = version.clone().unwrap_or_else(Version::zero);
        let leftovers = if index.has_any() {
            index
                .all_items()
                .into_iter()
                .filter(|step| step.version <= recorded)
                .filter(|step| paths.resolve(step.item.source()).exists())
                .collect()
        } else {
            Vec::new()
        };

        Ok(Self {
            version,
            platforms,
            tracked: store.len(),
            modified,
            missing,
            leftovers,
            pending: index.plan(&recorded, target),
        })
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "Version: {version}")?,
            None => write!(f, "Version: not initialized")?,
        }
        write!(f, "\nPlatforms: {}", self.platforms)?;
        write!(
            f,
            "\nTracked files: {} ({} modified, {} missing)",
            self.tracked,
            self.modified.len(),
            self.missing.len()
        )?;
        for path in &self.modified {
            write!(f, "\n  modified {path}")?;
        }
        for path in &self.missing {
            write!(f, "\n  missing {path}")?;
        }
        for step in &self.leftovers {
            write!(f, "\nLeftover from {}: {}", step.version, step.item)?;
        }
        write!(f, "\n{}", self.pending)
    }
}
