//! Assistant integrations a project can opt into.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A supported assistant integration.
///
/// Each platform owns one dot-directory in the project root, which is where
/// its templates live and how its presence is detected when no
/// configuration was recorded.
///
/// # Examples
///
/// ```
/// use scaf_core::Platform;
///
/// let platform: Platform = "cursor".parse().unwrap();
/// assert_eq!(platform, Platform::Cursor);
/// assert_eq!(platform.config_dir(), ".cursor");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Platform {
    /// Claude Code (`.claude/`).
    Claude,
    /// Cursor (`.cursor/`).
    Cursor,
    /// iFlow CLI (`.iflow/`).
    IFlow,
}

impl Platform {
    /// Every supported platform, in display order.
    pub const ALL: [Self; 3] = [Self::Claude, Self::Cursor, Self::IFlow];

    /// Returns the identifier used in configuration and on the command line.
    #[inline]
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Cursor => "cursor",
            Self::IFlow => "iflow",
        }
    }

    /// Returns the project-relative directory owned by this platform.
    #[inline]
    #[must_use]
    pub const fn config_dir(self) -> &'static str {
        match self {
            Self::Claude => ".claude",
            Self::Cursor => ".cursor",
            Self::IFlow => ".iflow",
        }
    }

    /// Returns a human-readable product name.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Claude => "Claude Code",
            Self::Cursor => "Cursor",
            Self::IFlow => "iFlow CLI",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.id().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ConfigError::UnknownPlatform(needle.to_owned()))
    }
}

/// The set of platforms a project opted into.
///
/// Reconciliation never produces files for a platform outside this set.
/// Templates that belong to no platform (common templates) are always in
/// scope.
///
/// # Examples
///
/// ```
/// use scaf_core::{Platform, PlatformSelection};
///
/// let selection: PlatformSelection = [Platform::Claude].into_iter().collect();
/// assert!(selection.includes(Some(Platform::Claude)));
/// assert!(!selection.includes(Some(Platform::Cursor)));
/// assert!(selection.includes(None));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformSelection(BTreeSet<Platform>);

impl PlatformSelection {
    /// Creates an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a platform. Returns `true` if it was not already selected.
    pub fn insert(&mut self, platform: Platform) -> bool {
        self.0.insert(platform)
    }

    /// Returns `true` if `platform` is selected.
    #[must_use]
    pub fn contains(&self, platform: Platform) -> bool {
        self.0.contains(&platform)
    }

    /// Returns `true` if a template scoped to `platform` is in scope.
    ///
    /// `None` denotes a common template, which is always in scope.
    #[must_use]
    pub fn includes(&self, platform: Option<Platform>) -> bool {
        platform.is_none_or(|p| self.contains(p))
    }

    /// Iterates over the selected platforms in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = Platform> + '_ {
        self.0.iter().copied()
    }

    /// Returns the number of selected platforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Platform> for PlatformSelection {
    fn from_iter<I: IntoIterator<Item = Platform>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for PlatformSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(none)");
        }
        for (i, platform) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(platform.id())?;
        }
        Ok(())
    }
}
