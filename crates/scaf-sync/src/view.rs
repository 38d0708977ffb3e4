//! A project's namespace as seen partway through a reconciliation pass.
//!
//! A real run moves files on disk as it goes, so the view is the identity.
//! A dry run must not touch the disk but still needs later steps to see
//! the namespace that earlier migrations would have produced. The overlay
//! maps a logical path to where its content physically lives, or to
//! nothing if it was (logically) removed.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use scaf_core::{FxHashMap, ProjectPaths};

use crate::error::SyncError;
use crate::fsio::{read_optional, walk_files};

/// Logical view of a project's files.
#[derive(Debug)]
pub struct ProjectView<'a> {
    paths: &'a ProjectPaths,
    overlay: FxHashMap<Utf8PathBuf, Option<Utf8PathBuf>>,
}

impl<'a> ProjectView<'a> {
    /// Creates an identity view of the project.
    #[must_use]
    pub fn new(paths: &'a ProjectPaths) -> Self {
        Self {
            paths,
            overlay: FxHashMap::default(),
        }
    }

    /// The project layout.
    #[must_use]
    pub fn paths(&self) -> &ProjectPaths {
        self.paths
    }

    /// Maps a logical path to the project-relative path holding its
    /// content, or `None` if it was removed.
    ///
    /// The most specific overlay entry wins, so a file moved into a renamed
    /// directory resolves through its own entry rather than the directory's.
    #[must_use]
    pub fn physical(&self, logical: &Utf8Path) -> Option<Utf8PathBuf> {
        for ancestor in logical.ancestors() {
            if ancestor.as_str().is_empty() {
                break;
            }
            if let Some(target) = self.overlay.get(ancestor) {
                let target = target.as_ref()?;
                let rest = logical.strip_prefix(ancestor).ok()?;
                return Some(if rest.as_str().is_empty() {
                    target.clone()
                } else {
                    target.join(rest)
                });
            }
        }
        Some(logical.to_owned())
    }

    /// Absolute location of a logical path's content.
    #[must_use]
    pub fn absolute(&self, logical: &Utf8Path) -> Option<Utf8PathBuf> {
        self.physical(logical).map(|p| self.paths.resolve(&p))
    }

    /// Returns `true` if anything exists at `logical`.
    #[must_use]
    pub fn exists(&self, logical: &Utf8Path) -> bool {
        self.absolute(logical).is_some_and(|p| p.exists())
    }

    /// Returns `true` if `logical` is a directory.
    #[must_use]
    pub fn is_dir(&self, logical: &Utf8Path) -> bool {
        self.absolute(logical).is_some_and(|p| p.is_dir())
    }

    /// Reads the file at `logical`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Io`] if the file exists but cannot be read.
    pub fn read(&self, logical: &Utf8Path) -> Result<Option<Vec<u8>>, SyncError> {
        match self.absolute(logical) {
            Some(path) if path.is_file() => read_optional(&path),
            _ => Ok(None),
        }
    }

    /// Lists the logical paths of every file under the directory `logical`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Walk`] if the directory cannot be traversed.
    pub fn files_under(&self, logical: &Utf8Path) -> Result<Vec<Utf8PathBuf>, SyncError> {
        let Some(dir) = self.absolute(logical) else {
            return Ok(Vec::new());
        };
        Ok(walk_files(&dir)?
            .into_iter()
            .map(|relative| logical.join(relative))
            .filter(|file| self.physical(file).is_some())
            .collect())
    }

    /// Records that `from` now lives at `to`.
    pub fn record_rename(&mut self, from: &Utf8Path, to: &Utf8Path) {
        let target = self.physical(from);
        self.overlay.insert(to.to_owned(), target);
        self.overlay.insert(from.to_owned(), None);
    }

    /// Records that `logical` no longer exists.
    pub fn record_removal(&mut self, logical: &Utf8Path) {
        self.overlay.insert(logical.to_owned(), None);
    }

    /// Returns `true` if the view differs from the disk.
    #[must_use]
    pub fn is_overlaid(&self) -> bool {
        !self.overlay.is_empty()
    }
}

/// Moves `from` to `to` on disk, creating `to`'s parent.
pub(crate) fn move_path(paths: &ProjectPaths, from: &Utf8Path, to: &Utf8Path) -> Result<(), SyncError> {
    let source = paths.resolve(from);
    let target = paths.resolve(to);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
    }
    fs::rename(&source, &target).map_err(|e| SyncError::io(&source, e))
}

/// Removes the file `logical` from disk.
pub(crate) fn remove_file(paths: &ProjectPaths, logical: &Utf8Path) -> Result<(), SyncError> {
    let path = paths.resolve(logical);
    fs::remove_file(&path).map_err(|e| SyncError::io(&path, e))
}
