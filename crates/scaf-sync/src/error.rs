//! Error types for the scaf-sync crate.
//!
//! This module provides the [`SyncError`] type for errors that can occur
//! while reconciling a project.

use camino::Utf8PathBuf;
use scaf_core::{ConfigError, Version};
use scaf_migrate::MigrateError;

/// Errors that can occur while reconciling a project.
///
/// Only genuine filesystem faults and unusable inputs surface here. Expected
/// outcomes such as conflicts, refused downgrades, or already-applied
/// migrations are reported in the
/// [`ReconcileReport`](crate::ReconcileReport) instead.
///
/// # Examples
///
/// ```
/// use scaf_sync::SyncError;
/// use std::io;
///
/// let err = SyncError::io(".scaf/.version", io::Error::other("disk full"));
/// assert_eq!(err.path().map(|p| p.as_str()), Some(".scaf/.version"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A file or directory could not be read, written, moved, or removed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The path the operation targeted.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Persisted state could not be serialized.
    #[error("failed to serialize {path}: {source}")]
    Serialize {
        /// The file being written.
        path: Utf8PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to walk a directory.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] ignore::Error),

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// A target version cannot name a backup directory or be recorded.
    #[error("invalid target version '{0}': expected characters 0-9, A-Z, a-z, '.', '+', '-'")]
    InvalidVersion(Version),

    /// The project configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The manifest registry could not be built.
    #[error(transparent)]
    Migrate(#[from] MigrateError),
}

impl SyncError {
    /// Creates a new [`SyncError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`SyncError::Serialize`] error.
    #[inline]
    pub fn serialize(path: impl Into<Utf8PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialize {
            path: path.into(),
            source,
        }
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Io { path, .. } | Self::Serialize { path, .. } => Some(path),
            Self::Walk(_)
            | Self::NonUtf8Path(_)
            | Self::InvalidVersion(_)
            | Self::Config(_)
            | Self::Migrate(_) => None,
        }
    }
}
