//! Project layout and per-project configuration.
//!
//! Every scaffolded project keeps its tool state in a `.scaf/` directory:
//!
//! | Path | Contents |
//! |---|---|
//! | `.scaf/.version` | The tool version the project was last reconciled to |
//! | `.scaf/.template-hashes.json` | Content fingerprints of tool-written files |
//! | `.scaf/config.json` | [`ProjectConfig`] (platform selection, conflict policy) |
//! | `.scaf/backups/<version>/` | User copies saved before a conflicting overwrite |

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{PlatformSelection, Version};

/// Name of the per-project state directory.
pub const STATE_DIR: &str = ".scaf";

/// File holding the recorded tool version.
pub const VERSION_FILE: &str = ".version";

/// File holding the content fingerprints.
pub const FINGERPRINT_FILE: &str = ".template-hashes.json";

/// File holding the project configuration.
pub const CONFIG_FILE: &str = "config.json";

/// Directory (inside the state directory) holding conflict backups.
pub const BACKUP_DIR: &str = "backups";

/// Resolves the well-known locations inside a project.
///
/// # Examples
///
/// ```
/// use scaf_core::{ProjectPaths, Version};
///
/// let paths = ProjectPaths::new("/work/app");
/// assert_eq!(paths.version_file().as_str(), "/work/app/.scaf/.version");
/// assert_eq!(
///     paths.backup_dir(&Version::new("0.4.0")).as_str(),
///     "/work/app/.scaf/backups/0.4.0"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    root: Utf8PathBuf,
}

impl ProjectPaths {
    /// Creates the layout for the project rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The project root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The `.scaf/` state directory.
    #[must_use]
    pub fn state_dir(&self) -> Utf8PathBuf {
        self.root.join(STATE_DIR)
    }

    /// The version marker file.
    #[must_use]
    pub fn version_file(&self) -> Utf8PathBuf {
        self.state_dir().join(VERSION_FILE)
    }

    /// The fingerprint store file.
    #[must_use]
    pub fn fingerprint_file(&self) -> Utf8PathBuf {
        self.state_dir().join(FINGERPRINT_FILE)
    }

    /// The project configuration file.
    #[must_use]
    pub fn config_file(&self) -> Utf8PathBuf {
        self.state_dir().join(CONFIG_FILE)
    }

    /// The directory receiving backups taken while upgrading to `version`.
    #[must_use]
    pub fn backup_dir(&self, version: &Version) -> Utf8PathBuf {
        self.state_dir().join(BACKUP_DIR).join(version.as_str())
    }

    /// Resolves a project-relative path to an absolute one.
    #[must_use]
    pub fn resolve(&self, relative: &Utf8Path) -> Utf8PathBuf {
        self.root.join(relative)
    }

    /// Returns `true` if `relative` points into the tool's own state.
    ///
    /// Templates and migrations never touch these paths.
    #[must_use]
    pub fn is_state_path(relative: &Utf8Path) -> bool {
        relative
            .components()
            .find(|c| !matches!(c, camino::Utf8Component::CurDir))
            .is_some_and(|c| c.as_str() == STATE_DIR)
    }
}

/// How reconciliation resolves a file the user edited whose template also changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Copy the user's version into the backup directory, then overwrite.
    #[default]
    Backup,
    /// Leave the user's version in place and report the conflict.
    Skip,
}

impl ConflictPolicy {
    /// Returns a lowercase label for display.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Backup => "backup",
            Self::Skip => "skip",
        }
    }
}

/// Per-project configuration stored in `.scaf/config.json`.
///
/// Missing fields take their defaults, so older or hand-written files load.
///
/// # Examples
///
/// ```
/// use scaf_core::{ConflictPolicy, Platform, ProjectConfig};
///
/// let config = ProjectConfig::from_json(r#"{"platforms": ["claude"]}"#).unwrap();
/// assert!(config.platforms.contains(Platform::Claude));
/// assert_eq!(config.conflict_policy, ConflictPolicy::Backup);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Platforms chosen at initialization.
    pub platforms: PlatformSelection,

    /// How conflicting edits are resolved.
    pub conflict_policy: ConflictPolicy,
}

impl ProjectConfig {
    /// Creates a configuration for the given selection.
    #[must_use]
    pub fn new(platforms: PlatformSelection) -> Self {
        Self {
            platforms,
            conflict_policy: ConflictPolicy::default(),
        }
    }

    /// Parses a configuration document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reads the configuration file at `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn load(path: &Utf8Path) -> Result<Option<Self>, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_owned(),
                    source,
                });
            }
        };

        Self::from_json(&contents)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_owned(),
                source,
            })
    }
}
