//! Error types for the scaf-migrate crate.
//!
//! This module provides the [`MigrateError`] type for errors that can occur
//! while loading migration manifests.

use camino::Utf8PathBuf;
use scaf_core::ManifestError;

/// Errors that can occur while loading migration manifests.
///
/// # Error Recovery Strategy
///
/// - **Per-manifest errors** ([`MigrateError::Read`], [`MigrateError::Parse`],
///   [`MigrateError::MissingVersion`], [`MigrateError::Invalid`]): logged,
///   the manifest is excluded, loading continues
/// - **Listing errors** ([`MigrateError::ListDir`]): logged, the source
///   contributes no manifests
/// - **Duplicate versions** ([`MigrateError::DuplicateVersion`]): fatal, the
///   index is not built
///
/// # Examples
///
/// ```
/// use scaf_migrate::MigrateError;
///
/// let err = MigrateError::MissingVersion { origin: "manifests/x.json".to_owned() };
/// assert!(err.is_recoverable());
/// assert_eq!(err.origin(), Some("manifests/x.json"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A manifest file could not be read.
    #[error("failed to read manifest {origin}: {source}")]
    Read {
        /// Where the manifest came from.
        origin: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A manifest is not valid JSON or does not match the manifest schema.
    #[error("failed to parse manifest {origin}: {source}")]
    Parse {
        /// Where the manifest came from.
        origin: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A manifest has no `version` field and cannot be indexed.
    #[error("manifest {origin} has no version field")]
    MissingVersion {
        /// Where the manifest came from.
        origin: String,
    },

    /// A manifest parsed but violates a structural rule.
    #[error("manifest {origin} is invalid: {source}")]
    Invalid {
        /// Where the manifest came from.
        origin: String,
        /// The violated rule.
        #[source]
        source: ManifestError,
    },

    /// The manifest directory exists but could not be listed.
    #[error("failed to list manifest directory {path}: {source}")]
    ListDir {
        /// The directory.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Two manifests declare the same version.
    #[error("version {version} is declared by both {first} and {second}")]
    DuplicateVersion {
        /// The contested version.
        version: String,
        /// Origin of the first manifest seen.
        first: String,
        /// Origin of the second manifest seen.
        second: String,
    },
}

impl MigrateError {
    /// Creates a new [`MigrateError::Read`] error.
    #[inline]
    pub fn read(origin: impl Into<String>, source: std::io::Error) -> Self {
        Self::Read {
            origin: origin.into(),
            source,
        }
    }

    /// Creates a new [`MigrateError::Parse`] error.
    #[inline]
    pub fn parse(origin: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            origin: origin.into(),
            source,
        }
    }

    /// Creates a new [`MigrateError::Invalid`] error.
    #[inline]
    pub fn invalid(origin: impl Into<String>, source: ManifestError) -> Self {
        Self::Invalid {
            origin: origin.into(),
            source,
        }
    }

    /// Returns `true` if loading can continue past this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::DuplicateVersion { .. })
    }

    /// Returns `true` if this error prevents building a manifest index.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the origin of the manifest this error concerns, if any.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        match self {
            Self::Read { origin, .. }
            | Self::Parse { origin, .. }
            | Self::MissingVersion { origin }
            | Self::Invalid { origin, .. } => Some(origin),
            Self::DuplicateVersion { second, .. } => Some(second),
            Self::ListDir { .. } => None,
        }
    }
}
