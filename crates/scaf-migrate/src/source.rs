//! Backing stores for migration manifests.
//!
//! A [`ManifestSource`] produces every manifest it knows about together
//! with the failures it hit along the way. Two sources are provided:
//!
//! - [`DirectorySource`] - one `*.json` file per released version
//! - [`StaticSource`] - an explicit, ordered table of manifests (for
//!   manifests compiled into the binary with `include_str!`, and for tests)
//!
//! Sources never fail as a whole: a manifest that cannot be read, parsed,
//! or validated is reported in [`SourceLoad::failures`] and the rest are
//! still returned.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use scaf_core::MigrationManifest;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::MigrateError;

/// A manifest together with where it was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    /// Human-readable origin (file path or table label).
    pub origin: String,
    /// The parsed and validated manifest.
    pub manifest: MigrationManifest,
}

/// Everything a source produced in one load.
#[derive(Debug, Default)]
pub struct SourceLoad {
    /// Manifests that loaded successfully, in source order.
    pub manifests: Vec<LoadedManifest>,
    /// Manifests that were excluded, with the reason.
    pub failures: Vec<MigrateError>,
}

impl SourceLoad {
    fn push(&mut self, origin: String, result: Result<MigrationManifest, MigrateError>) {
        match result {
            Ok(manifest) => {
                debug!(
                    origin = %origin,
                    version = %manifest.version,
                    items = manifest.migrations.len(),
                    "Loaded manifest"
                );
                self.manifests.push(LoadedManifest { origin, manifest });
            }
            Err(e) => {
                warn!(origin = %origin, error = %e, "Skipping manifest");
                self.failures.push(e);
            }
        }
    }
}

/// A backing store of migration manifests.
pub trait ManifestSource: Send + Sync {
    /// Describes the source for log messages.
    fn describe(&self) -> String;

    /// Loads every manifest the source holds.
    fn load(&self) -> SourceLoad;
}

/// Parses and validates one manifest document.
///
/// # Errors
///
/// - [`MigrateError::Parse`] if the text is not JSON or does not match the schema
/// - [`MigrateError::MissingVersion`] if an object has no usable `version`
/// - [`MigrateError::Invalid`] if a migration path is unsafe
///
/// # Examples
///
/// ```
/// use scaf_migrate::{MigrateError, parse_manifest};
///
/// let manifest = parse_manifest("0.2.0.json", r#"{"version": "0.2.0"}"#).unwrap();
/// assert_eq!(manifest.version.as_str(), "0.2.0");
///
/// let err = parse_manifest("x.json", r#"{"migrations": []}"#).unwrap_err();
/// assert!(matches!(err, MigrateError::MissingVersion { .. }));
/// ```
pub fn parse_manifest(origin: &str, text: &str) -> Result<MigrationManifest, MigrateError> {
    let value: Value = serde_json::from_str(text).map_err(|e| MigrateError::parse(origin, e))?;

    if value.is_object() {
        let has_version = match value.get("version") {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        };
        if !has_version {
            return Err(MigrateError::MissingVersion {
                origin: origin.to_owned(),
            });
        }
    }

    let manifest: MigrationManifest =
        serde_json::from_value(value).map_err(|e| MigrateError::parse(origin, e))?;
    manifest
        .validate()
        .map_err(|e| MigrateError::invalid(origin, e))?;
    Ok(manifest)
}

/// Loads manifests from a directory holding one `*.json` file per version.
///
/// A missing directory is not an error; it simply holds no manifests.
/// Files are parsed in parallel and returned in file-name order.
///
/// # Examples
///
/// ```
/// use scaf_migrate::{DirectorySource, ManifestSource};
///
/// let source = DirectorySource::new("/nonexistent/manifests");
/// let load = source.load();
/// assert!(load.manifests.is_empty());
/// assert!(load.failures.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: Utf8PathBuf,
}

impl DirectorySource {
    /// Creates a source reading from `dir`.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory this source reads.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    fn manifest_paths(&self) -> Result<Vec<Utf8PathBuf>, MigrateError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| MigrateError::ListDir {
            path: self.dir.clone(),
            source,
        })?;

        let mut paths: Vec<Utf8PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|e| match Utf8PathBuf::try_from(e.path()) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(path = %e.as_path().display(), "Skipping non UTF-8 manifest path");
                    None
                }
            })
            .filter(|p| p.extension() == Some("json"))
            .collect();
        paths.sort();
        Ok(paths)
    }
}

impl ManifestSource for DirectorySource {
    fn describe(&self) -> String {
        format!("directory {}", self.dir)
    }

    fn load(&self) -> SourceLoad {
        let mut load = SourceLoad::default();

        if !self.dir.is_dir() {
            debug!(dir = %self.dir, "Manifest directory not found, no migrations available");
            return load;
        }

        let paths = match self.manifest_paths() {
            Ok(paths) => paths,
            Err(e) => {
                warn!(dir = %self.dir, error = %e, "Failed to list manifest directory");
                load.failures.push(e);
                return load;
            }
        };

        let results: Vec<(String, Result<MigrationManifest, MigrateError>)> = paths
            .par_iter()
            .map(|path| {
                let origin = path.to_string();
                let result = fs::read_to_string(path)
                    .map_err(|e| MigrateError::read(&origin, e))
                    .and_then(|text| parse_manifest(&origin, &text));
                (origin, result)
            })
            .collect();

        for (origin, result) in results {
            load.push(origin, result);
        }

        info!(
            dir = %self.dir,
            loaded = load.manifests.len(),
            failed = load.failures.len(),
            "Scanned manifest directory"
        );
        load
    }
}

#[derive(Debug, Clone)]
enum StaticEntry {
    Json { origin: String, text: String },
    Manifest(MigrationManifest),
}

/// An explicit, ordered table of manifests.
///
/// Entries may be JSON documents (typically `include_str!` of files shipped
/// with the tool) or already-built [`MigrationManifest`] values. Both kinds
/// go through the same validation as directory manifests.
///
/// # Examples
///
/// ```
/// use scaf_core::{MigrationItem, MigrationManifest};
/// use scaf_migrate::{ManifestSource, StaticSource};
///
/// let source = StaticSource::new()
///     .with_json("0.2.0.json", r#"{"version": "0.2.0"}"#)
///     .with_manifest(
///         MigrationManifest::new("0.3.0").with_item(MigrationItem::delete("old.md")),
///     );
/// assert_eq!(source.load().manifests.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    entries: Vec<StaticEntry>,
}

impl StaticSource {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a JSON manifest document.
    #[must_use]
    pub fn with_json(mut self, origin: impl Into<String>, text: impl Into<String>) -> Self {
        self.entries.push(StaticEntry::Json {
            origin: origin.into(),
            text: text.into(),
        });
        self
    }

    /// Appends a manifest value.
    #[must_use]
    pub fn with_manifest(mut self, manifest: MigrationManifest) -> Self {
        self.entries.push(StaticEntry::Manifest(manifest));
        self
    }

    /// Returns the number of entries in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<MigrationManifest> for StaticSource {
    fn from_iter<I: IntoIterator<Item = MigrationManifest>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(StaticEntry::Manifest).collect(),
        }
    }
}

impl ManifestSource for StaticSource {
    fn describe(&self) -> String {
        format!("static table ({} entries)", self.entries.len())
    }

    fn load(&self) -> SourceLoad {
        let mut load = SourceLoad::default();
        for entry in &self.entries {
            match entry {
                StaticEntry::Json { origin, text } => {
                    load.push(origin.clone(), parse_manifest(origin, text));
                }
                StaticEntry::Manifest(manifest) => {
                    let origin = format!("static:{}", manifest.version);
                    let result = manifest
                        .validate()
                        .map(|()| manifest.clone())
                        .map_err(|e| MigrateError::invalid(&origin, e));
                    load.push(origin, result);
                }
            }
        }
        load
    }
}
