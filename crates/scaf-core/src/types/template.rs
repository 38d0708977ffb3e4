//! Resolved template files.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use super::platform::Platform;
use crate::hash::ContentHash;

/// A template ready to be written into a project.
///
/// Templates are produced fresh on every reconciliation pass by a template
/// provider, with all placeholders already substituted. They are never
/// persisted as-is; only their [`ContentHash`] is.
///
/// # Examples
///
/// ```
/// use scaf_core::{Platform, TemplateFile};
///
/// let file = TemplateFile::new(Platform::Claude, ".claude/commands/start.md", "# Start\n");
/// assert_eq!(file.platform, Some(Platform::Claude));
/// assert!(file.hash().matches("# Start\n"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFile {
    /// The platform this template belongs to, or `None` for common templates.
    pub platform: Option<Platform>,

    /// Path relative to the project root.
    pub path: Utf8PathBuf,

    /// Fully resolved file content.
    pub content: String,
}

impl TemplateFile {
    /// Creates a template owned by `platform`.
    #[must_use]
    pub fn new(
        platform: Platform,
        path: impl Into<Utf8PathBuf>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            platform: Some(platform),
            path: path.into(),
            content: content.into(),
        }
    }

    /// Creates a template shared by every platform.
    #[must_use]
    pub fn common(path: impl Into<Utf8PathBuf>, content: impl Into<String>) -> Self {
        Self {
            platform: None,
            path: path.into(),
            content: content.into(),
        }
    }

    /// Returns the fingerprint of the template content.
    #[must_use]
    pub fn hash(&self) -> ContentHash {
        ContentHash::of(&self.content)
    }
}
