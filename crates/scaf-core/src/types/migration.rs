//! Structural migration records.
//!
//! A [`MigrationManifest`] is authored once per released version and lists
//! the renames and deletions a project needs when upgrading past that
//! version. On disk it is a JSON document:
//!
//! ```json
//! {
//!   "version": "0.3.0",
//!   "migrations": [
//!     { "type": "rename", "from": ".claude/commands/start.md", "to": ".claude/commands/scaf/start.md" },
//!     { "type": "delete", "from": ".claude/hooks/legacy.py" }
//!   ],
//!   "changelog": "Commands moved under a namespace.",
//!   "breaking": true,
//!   "recommendMigrate": true
//! }
//! ```

use std::fmt;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::version::Version;
use crate::error::ManifestError;

/// The kind of a [`MigrationItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationKind {
    /// Move a file or directory to a new path.
    Rename,
    /// Remove a file or directory.
    Delete,
}

impl MigrationKind {
    /// Returns a lowercase label for display.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rename => "rename",
            Self::Delete => "delete",
        }
    }
}

/// A single structural change to a project.
///
/// Paths are relative to the project root. A rename always carries both
/// paths; a delete carries only its source.
///
/// # Examples
///
/// ```
/// use scaf_core::{MigrationItem, MigrationKind};
///
/// let item: MigrationItem =
///     serde_json::from_str(r#"{"type":"rename","from":"a.md","to":"b.md"}"#).unwrap();
/// assert_eq!(item.kind(), MigrationKind::Rename);
/// assert_eq!(item.destination().map(|p| p.as_str()), Some("b.md"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MigrationItem {
    /// Move `from` to `to`.
    Rename {
        /// Current path.
        from: Utf8PathBuf,
        /// New path.
        to: Utf8PathBuf,
    },
    /// Remove `from`.
    Delete {
        /// Path to remove.
        from: Utf8PathBuf,
    },
}

impl MigrationItem {
    /// Creates a rename item.
    #[must_use]
    pub fn rename(from: impl Into<Utf8PathBuf>, to: impl Into<Utf8PathBuf>) -> Self {
        Self::Rename {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Creates a delete item.
    #[must_use]
    pub fn delete(from: impl Into<Utf8PathBuf>) -> Self {
        Self::Delete { from: from.into() }
    }

    /// Returns the kind of this item.
    #[must_use]
    pub const fn kind(&self) -> MigrationKind {
        match self {
            Self::Rename { .. } => MigrationKind::Rename,
            Self::Delete { .. } => MigrationKind::Delete,
        }
    }

    /// Returns the source path.
    #[must_use]
    pub fn source(&self) -> &Utf8Path {
        match self {
            Self::Rename { from, .. } | Self::Delete { from } => from,
        }
    }

    /// Returns the destination path of a rename.
    #[must_use]
    pub fn destination(&self) -> Option<&Utf8Path> {
        match self {
            Self::Rename { to, .. } => Some(to),
            Self::Delete { .. } => None,
        }
    }
}

impl fmt::Display for MigrationItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rename { from, to } => write!(f, "rename {from} -> {to}"),
            Self::Delete { from } => write!(f, "delete {from}"),
        }
    }
}

/// The migration payload of one released version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationManifest {
    /// The version this manifest applies to.
    pub version: Version,

    /// Structural changes, in authored order.
    #[serde(default)]
    pub migrations: SmallVec<[MigrationItem; 4]>,

    /// Release notes for this version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,

    /// Whether the release contains breaking changes.
    #[serde(default)]
    pub breaking: bool,

    /// Whether users should run a full migration rather than a plain update.
    #[serde(default)]
    pub recommend_migrate: bool,

    /// Human-readable upgrade instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration_guide: Option<String>,

    /// Instructions aimed at an assistant performing the upgrade.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_instructions: Option<String>,
}

impl MigrationManifest {
    /// Creates an empty manifest for `version`.
    #[must_use]
    pub fn new(version: impl Into<Version>) -> Self {
        Self {
            version: version.into(),
            migrations: SmallVec::new(),
            changelog: None,
            breaking: false,
            recommend_migrate: false,
            migration_guide: None,
            ai_instructions: None,
        }
    }

    /// Appends a migration item.
    #[must_use]
    pub fn with_item(mut self, item: MigrationItem) -> Self {
        self.migrations.push(item);
        self
    }

    /// Checks every path in the manifest.
    ///
    /// Paths must be non-empty, relative, and must not contain `..`; a
    /// rename must not target its own source or a path inside it.
    ///
    /// # Examples
    ///
    /// ```
    /// use scaf_core::{MigrationItem, MigrationManifest};
    ///
    /// let ok = MigrationManifest::new("0.2.0").with_item(MigrationItem::delete("old.md"));
    /// assert!(ok.validate().is_ok());
    ///
    /// let bad = MigrationManifest::new("0.2.0").with_item(MigrationItem::delete("../etc"));
    /// assert!(bad.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ManifestError> {
        for item in &self.migrations {
            self.check_path(item.source())?;
            if let Some(to) = item.destination() {
                self.check_path(to)?;
                let (from, to) = (normalize(item.source()), normalize(to));
                if to == from {
                    return Err(ManifestError::SelfRename {
                        version: self.version.to_string(),
                        path: from,
                    });
                }
                if to.starts_with(&from) {
                    return Err(ManifestError::RenameIntoSelf {
                        version: self.version.to_string(),
                        from,
                        to,
                    });
                }
            }
        }
        Ok(())
    }

    fn check_path(&self, path: &Utf8Path) -> Result<(), ManifestError> {
        if path.as_str().trim().is_empty() {
            return Err(ManifestError::EmptyPath {
                version: self.version.to_string(),
            });
        }
        for component in path.components() {
            match component {
                Utf8Component::Prefix(_) | Utf8Component::RootDir => {
                    return Err(ManifestError::AbsolutePath {
                        version: self.version.to_string(),
                        path: path.to_owned(),
                    });
                }
                Utf8Component::ParentDir => {
                    return Err(ManifestError::ParentTraversal {
                        version: self.version.to_string(),
                        path: path.to_owned(),
                    });
                }
                Utf8Component::CurDir | Utf8Component::Normal(_) => {}
            }
        }
        Ok(())
    }
}

/// Drops `.` components and trailing separators.
fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    path.components()
        .filter(|c| !matches!(c, Utf8Component::CurDir))
        .collect()
}
