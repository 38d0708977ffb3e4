//! Template providers.
//!
//! A [`TemplateProvider`] returns the current, fully resolved template set
//! for one platform (or the common set). The reconciler never substitutes
//! placeholders itself.
//!
//! [`DirectoryTemplateProvider`] reads a template tree laid out as:
//!
//! ```text
//! <root>/common/...     files every project receives
//! <root>/claude/...     files for projects that selected claude
//! <root>/cursor/...
//! <root>/iflow/...
//! ```
//!
//! Paths under each directory mirror the project root, so
//! `<root>/claude/.claude/commands/start.md` becomes
//! `.claude/commands/start.md` in the project.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use scaf_core::{FxHashMap, Platform, TemplateFile};
use tracing::debug;

use crate::error::SyncError;
use crate::fsio::walk_files;

/// Directory holding templates shared by every platform.
pub const COMMON_DIR: &str = "common";

/// Supplies resolved templates.
pub trait TemplateProvider: Send + Sync {
    /// Returns the templates for `platform`, or the common templates for
    /// `None`.
    fn templates(&self, platform: Option<Platform>) -> Result<Vec<TemplateFile>, SyncError>;
}

/// `{{NAME}}` placeholder values.
///
/// The defaults resolve `PYTHON_CMD` to the interpreter name of the host
/// platform. Unknown placeholders are left untouched.
///
/// # Examples
///
/// ```
/// use scaf_sync::Placeholders;
///
/// let placeholders = Placeholders::empty().with("NAME", "scaf");
/// assert_eq!(placeholders.resolve("hi {{NAME}} {{OTHER}}"), "hi scaf {{OTHER}}");
/// ```
#[derive(Debug, Clone)]
pub struct Placeholders {
    values: FxHashMap<String, String>,
}

impl Default for Placeholders {
    fn default() -> Self {
        let python = if cfg!(windows) { "python" } else { "python3" };
        Self::empty().with("PYTHON_CMD", python)
    }
}

impl Placeholders {
    /// Creates a table with no placeholders.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            values: FxHashMap::default(),
        }
    }

    /// Sets the value of `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Returns the value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Substitutes every known `{{NAME}}` in `text`.
    #[must_use]
    pub fn resolve(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                out.push_str(&rest[start..]);
                return out;
            };

            let name = &after[..end];
            match self.values.get(name.trim()) {
                Some(value) => out.push_str(value),
                None => {
                    out.push_str("{{");
                    out.push_str(name);
                    out.push_str("}}");
                }
            }
            rest = &after[end + 2..];
        }

        out.push_str(rest);
        out
    }
}

/// Reads templates from a directory tree.
///
/// # Examples
///
/// ```
/// use scaf_sync::{DirectoryTemplateProvider, TemplateProvider};
///
/// let provider = DirectoryTemplateProvider::new("/nonexistent/templates");
/// assert!(provider.templates(None).unwrap().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryTemplateProvider {
    root: Utf8PathBuf,
    placeholders: Placeholders,
}

impl DirectoryTemplateProvider {
    /// Creates a provider over `root` with the default placeholders.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            placeholders: Placeholders::default(),
        }
    }

    /// Replaces the placeholder table.
    #[must_use]
    pub fn with_placeholders(mut self, placeholders: Placeholders) -> Self {
        self.placeholders = placeholders;
        self
    }

    /// The template root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn dir_for(&self, platform: Option<Platform>) -> Utf8PathBuf {
        self.root.join(platform.map_or(COMMON_DIR, Platform::id))
    }
}

impl TemplateProvider for DirectoryTemplateProvider {
    fn templates(&self, platform: Option<Platform>) -> Result<Vec<TemplateFile>, SyncError> {
        let dir = self.dir_for(platform);
        let files = walk_files(&dir)?;

        let templates = files
            .par_iter()
            .map(|relative| {
                let source = dir.join(relative);
                let raw = fs::read_to_string(&source).map_err(|e| SyncError::io(&source, e))?;
                Ok(TemplateFile {
                    platform,
                    path: relative.clone(),
                    content: self.placeholders.resolve(&raw),
                })
            })
            .collect::<Result<Vec<_>, SyncError>>()?;

        debug!(dir = %dir, count = templates.len(), "Read templates");
        Ok(templates)
    }
}

/// A fixed list of templates.
///
/// # Examples
///
/// ```
/// use scaf_core::{Platform, TemplateFile};
/// use scaf_sync::{StaticTemplateProvider, TemplateProvider};
///
/// let provider = StaticTemplateProvider::new()
///     .with(TemplateFile::common("README.md", "hi\n"))
///     .with(TemplateFile::new(Platform::Cursor, ".cursor/rules/a.mdc", "a\n"));
/// assert_eq!(provider.templates(None).unwrap().len(), 1);
/// assert_eq!(provider.templates(Some(Platform::Claude)).unwrap().len(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticTemplateProvider {
    files: Vec<TemplateFile>,
}

impl StaticTemplateProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template.
    #[must_use]
    pub fn with(mut self, file: TemplateFile) -> Self {
        self.files.push(file);
        self
    }

    /// Replaces the content of every template at `path`.
    pub fn set_content(&mut self, path: &Utf8Path, content: &str) {
        for file in self.files.iter_mut().filter(|f| f.path == path) {
            content.clone_into(&mut file.content);
        }
    }
}

impl FromIterator<TemplateFile> for StaticTemplateProvider {
    fn from_iter<I: IntoIterator<Item = TemplateFile>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

impl TemplateProvider for StaticTemplateProvider {
    fn templates(&self, platform: Option<Platform>) -> Result<Vec<TemplateFile>, SyncError> {
        Ok(self
            .files
            .iter()
            .filter(|file| file.platform == platform)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_placeholders() {
        let placeholders = Placeholders::default();
        let expected = if cfg!(windows) { "python" } else { "python3" };
        assert_eq!(placeholders.get("PYTHON_CMD"), Some(expected));
        assert_eq!(
            placeholders.resolve("{{PYTHON_CMD}} hook.py"),
            format!("{expected} hook.py")
        );
    }

    #[test]
    fn test_resolve_edge_cases() {
        let placeholders = Placeholders::empty().with("A", "1");
        assert_eq!(placeholders.resolve("{{ A }}{{A}}"), "11");
        assert_eq!(placeholders.resolve("open {{A"), "open {{A");
        assert_eq!(placeholders.resolve("{{B}}"), "{{B}}");
        assert_eq!(placeholders.resolve("no braces"), "no braces");
    }

    #[test]
    fn test_directory_provider_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("common")).unwrap();
        fs::create_dir_all(root.join("claude/.claude/hooks")).unwrap();
        fs::write(root.join("common/AGENTS.md"), "agents\n").unwrap();
        fs::write(
            root.join("claude/.claude/hooks/run.sh"),
            "{{PYTHON_CMD}} x.py\n",
        )
        .unwrap();

        let provider =
            DirectoryTemplateProvider::new(&root).with_placeholders(Placeholders::empty().with("PYTHON_CMD", "py"));

        let common = provider.templates(None).unwrap();
        assert_eq!(common, [TemplateFile::common("AGENTS.md", "agents\n")]);

        let claude = provider.templates(Some(Platform::Claude)).unwrap();
        assert_eq!(
            claude,
            [TemplateFile::new(
                Platform::Claude,
                ".claude/hooks/run.sh",
                "py x.py\n"
            )]
        );

        assert!(provider.templates(Some(Platform::IFlow)).unwrap().is_empty());
    }

    #[test]
    fn test_static_provider_set_content() {
        let mut provider: StaticTemplateProvider =
            [TemplateFile::common("a.md", "1")].into_iter().collect();
        provider.set_content(Utf8Path::new("a.md"), "2");
        assert_eq!(provider.templates(None).unwrap()[0].content, "2");
    }
}
