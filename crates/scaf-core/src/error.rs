//! Error types for the scaf-core crate.
//!
//! - [`ConfigError`] covers reading and validating per-project configuration.
//! - [`ManifestError`] covers structural problems inside a migration manifest
//!   that parsed successfully but cannot be applied safely.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use scaf_core::ConfigError;
///
/// let error = ConfigError::UnknownPlatform("vim".to_owned());
/// assert!(error.to_string().contains("vim"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The provided path is invalid or malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: Utf8PathBuf,
        /// Explanation of why the path is invalid.
        reason: String,
    },

    /// A platform identifier is not one of the supported integrations.
    #[error("unknown platform '{0}' (expected one of: claude, cursor, iflow)")]
    UnknownPlatform(String),

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration {path}: {source}")]
    Io {
        /// The configuration file being read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration {path}: {source}")]
    Parse {
        /// The configuration file being parsed.
        path: Utf8PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// A manifest that deserialized but violates a structural rule.
///
/// Manifests with any of these problems are excluded from the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    /// A migration path is empty.
    #[error("manifest {version}: migration path is empty")]
    EmptyPath {
        /// The manifest version.
        version: String,
    },

    /// A migration path is absolute.
    #[error("manifest {version}: path '{path}' must be relative to the project root")]
    AbsolutePath {
        /// The manifest version.
        version: String,
        /// The offending path.
        path: Utf8PathBuf,
    },

    /// A migration path walks out of the project with `..`.
    #[error("manifest {version}: path '{path}' escapes the project root")]
    ParentTraversal {
        /// The manifest version.
        version: String,
        /// The offending path.
        path: Utf8PathBuf,
    },

    /// A rename whose source and destination are the same path.
    #[error("manifest {version}: rename of '{path}' onto itself")]
    SelfRename {
        /// The manifest version.
        version: String,
        /// The offending path.
        path: Utf8PathBuf,
    },

    /// A rename whose destination lies inside its own source.
    #[error("manifest {version}: cannot rename '{from}' into its own subtree '{to}'")]
    RenameIntoSelf {
        /// The manifest version.
        version: String,
        /// The source path.
        from: Utf8PathBuf,
        /// The destination inside it.
        to: Utf8PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_display() {
        let error = ConfigError::InvalidPath {
            path: Utf8PathBuf::from("/invalid/path"),
            reason: "not a directory".to_owned(),
        };
        let msg = error.to_string();
        assert!(msg.contains("/invalid/path"));
        assert!(msg.contains("not a directory"));
    }

    #[test]
    fn test_unknown_platform_display() {
        let error = ConfigError::UnknownPlatform("emacs".to_owned());
        let msg = error.to_string();
        assert!(msg.contains("emacs"));
        assert!(msg.contains("claude"));
    }

    #[test]
    fn test_manifest_error_display() {
        let error = ManifestError::ParentTraversal {
            version: "0.3.0".to_owned(),
            path: Utf8PathBuf::from("../outside.md"),
        };
        let msg = error.to_string();
        assert!(msg.contains("0.3.0"));
        assert!(msg.contains("../outside.md"));
    }
}
