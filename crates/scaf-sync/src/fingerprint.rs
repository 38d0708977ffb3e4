//! Content fingerprints of files the tool has written.
//!
//! The store maps project-relative paths to the [`ContentHash`] of the
//! content the tool last wrote there. A file whose on-disk content still
//! hashes to its recorded fingerprint is *pristine*; one that does not has
//! been edited by the user. A path with no fingerprint is not tool-managed.
//!
//! Persisted as `.scaf/.template-hashes.json`:
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "files": {
//!     ".claude/commands/start.md": "9f86d081884c7d65..."
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use scaf_core::ContentHash;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::fsio::write_atomic;

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct FingerprintFile {
    #[serde(default)]
    schema_version: u32,
    #[serde(default)]
    files: BTreeMap<String, ContentHash>,
}

/// Recorded fingerprints for one project.
///
/// Changes are held in memory until [`save`](Self::save).
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use scaf_sync::FingerprintStore;
///
/// let mut store = FingerprintStore::in_memory();
/// let path = Utf8Path::new(".claude/commands/start.md");
/// assert!(!store.is_tracked(path));
///
/// store.record(path, "# Start\n");
/// assert!(store.matches(path, "# Start\n"));
/// assert!(!store.matches(path, "# Start (edited)\n"));
/// ```
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    path: Option<Utf8PathBuf>,
    files: BTreeMap<String, ContentHash>,
    dirty: bool,
}

impl FingerprintStore {
    /// Creates an empty store that is never persisted.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            files: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Loads the store persisted at `path`.
    ///
    /// A missing file yields an empty store. A file that is not valid JSON
    /// also yields an empty store (with a warning), which leaves every file
    /// untracked.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Io`] if the file exists but cannot be read.
    pub fn load(path: &Utf8Path) -> Result<Self, SyncError> {
        let mut store = Self {
            path: Some(path.to_owned()),
            files: BTreeMap::new(),
            dirty: false,
        };

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path, "No fingerprint file, starting empty");
                return Ok(store);
            }
            Err(e) => return Err(SyncError::io(path, e)),
        };

        match serde_json::from_str::<FingerprintFile>(&text) {
            Ok(file) => {
                if file.schema_version > SCHEMA_VERSION {
                    warn!(
                        path = %path,
                        schema_version = file.schema_version,
                        "Fingerprint file written by a newer version"
                    );
                }
                store.files = file.files;
                debug!(path = %path, tracked = store.files.len(), "Loaded fingerprints");
            }
            Err(e) => {
                warn!(
                    path = %path,
                    error = %e,
                    "Fingerprint file is corrupt, treating every file as untracked"
                );
                store.dirty = true;
            }
        }

        Ok(store)
    }

    /// Writes the store back to the file it was loaded from.
    ///
    /// Does nothing if there are no unsaved changes or the store is in-memory.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Io`] if the file cannot be written.
    pub fn save(&mut self) -> Result<(), SyncError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }

        let file = FingerprintFile {
            schema_version: SCHEMA_VERSION,
            files: self.files.clone(),
        };
        let mut json =
            serde_json::to_string_pretty(&file).map_err(|e| SyncError::serialize(path, e))?;
        json.push('\n');
        write_atomic(path, json.as_bytes())?;

        debug!(path = %path, tracked = self.files.len(), "Saved fingerprints");
        self.dirty = false;
        Ok(())
    }

    /// Records the fingerprint of `content` for `path`.
    pub fn record(&mut self, path: &Utf8Path, content: impl AsRef<[u8]>) {
        self.record_hash(path, ContentHash::of(content));
    }

    /// Records an already computed fingerprint for `path`.
    pub fn record_hash(&mut self, path: &Utf8Path, hash: ContentHash) {
        let key = key(path);
        if self.files.get(&key) != Some(&hash) {
            self.files.insert(key, hash);
            self.dirty = true;
        }
    }

    /// Returns `true` if `path` is tracked and `content` hashes to its
    /// recorded fingerprint.
    #[must_use]
    pub fn matches(&self, path: &Utf8Path, content: impl AsRef<[u8]>) -> bool {
        self.hash_of(path).is_some_and(|hash| hash.matches(content))
    }

    /// Returns `true` if `path` has a recorded fingerprint.
    #[must_use]
    pub fn is_tracked(&self, path: &Utf8Path) -> bool {
        self.files.contains_key(&key(path))
    }

    /// Returns the recorded fingerprint of `path`.
    #[must_use]
    pub fn hash_of(&self, path: &Utf8Path) -> Option<&ContentHash> {
        self.files.get(&key(path))
    }

    /// Stops tracking `path`, returning its fingerprint.
    pub fn forget(&mut self, path: &Utf8Path) -> Option<ContentHash> {
        let removed = self.files.remove(&key(path));
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Moves the fingerprint of `from` to `to`.
    ///
    /// If `from` is a directory, every fingerprint below it moves too.
    /// Returns the number of entries moved.
    pub fn rename(&mut self, from: &Utf8Path, to: &Utf8Path) -> usize {
        let from_key = key(from);
        let to_key = key(to);
        let prefix = format!("{from_key}/");

        let moving: Vec<String> = self
            .files
            .keys()
            .filter(|k| **k == from_key || k.starts_with(&prefix))
            .cloned()
            .collect();

        for old in &moving {
            if let Some(hash) = self.files.remove(old) {
                let new = format!("{to_key}{}", &old[from_key.len()..]);
                self.files.insert(new, hash);
            }
        }

        if !moving.is_empty() {
            self.dirty = true;
        }
        moving.len()
    }

    /// Iterates over tracked paths and their fingerprints, in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Utf8Path, &ContentHash)> {
        self.files.iter().map(|(k, v)| (Utf8Path::new(k), v))
    }

    /// Returns the number of tracked paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns `true` if there are changes not yet saved.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Canonical key for a project-relative path: `/`-separated, no `.` parts.
fn key(path: &Utf8Path) -> String {
    let mut out = String::with_capacity(path.as_str().len());
    for component in path.components() {
        if matches!(component, Utf8Component::CurDir) {
            continue;
        }
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(component.as_str());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_untracked_never_matches() {
        let store = FingerprintStore::in_memory();
        assert!(!store.matches(Utf8Path::new("a.md"), ""));
        assert!(store.hash_of(Utf8Path::new("a.md")).is_none());
    }

    #[test]
    fn test_keys_are_normalised() {
        let mut store = FingerprintStore::in_memory();
        store.record(Utf8Path::new("./a/b.md"), "x");
        assert!(store.is_tracked(Utf8Path::new("a/b.md")));
        assert!(store.is_tracked(Utf8Path::new("a/./b.md")));
    }

    #[test]
    fn test_record_same_hash_is_not_a_change() {
        let mut store = FingerprintStore::in_memory();
        store.record(Utf8Path::new("a.md"), "x");
        assert!(store.is_dirty());
        store.dirty = false;
        store.record(Utf8Path::new("a.md"), "x");
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_rename_moves_directory_prefix() {
        let mut store = FingerprintStore::in_memory();
        store.record(Utf8Path::new("old/a.md"), "a");
        store.record(Utf8Path::new("old/sub/b.md"), "b");
        store.record(Utf8Path::new("older/c.md"), "c");

        assert_eq!(store.rename(Utf8Path::new("old"), Utf8Path::new("new")), 2);
        assert!(store.matches(Utf8Path::new("new/a.md"), "a"));
        assert!(store.matches(Utf8Path::new("new/sub/b.md"), "b"));
        assert!(store.is_tracked(Utf8Path::new("older/c.md")));
        assert!(!store.is_tracked(Utf8Path::new("old/a.md")));
    }

    #[test]
    fn test_forget() {
        let mut store = FingerprintStore::in_memory();
        store.record(Utf8Path::new("a.md"), "a");
        assert!(store.forget(Utf8Path::new("a.md")).is_some());
        assert!(store.forget(Utf8Path::new("a.md")).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let (_guard, dir) = temp_dir();
        let path = dir.join(".scaf/.template-hashes.json");

        let mut store = FingerprintStore::load(&path).unwrap();
        assert!(store.is_empty());
        store.record(Utf8Path::new("a.md"), "a");
        store.save().unwrap();
        assert!(!store.is_dirty());

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"schema_version\": 1"));

        let reloaded = FingerprintStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.matches(Utf8Path::new("a.md"), "a"));
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let (_guard, dir) = temp_dir();
        let path = dir.join("hashes.json");
        fs::write(&path, "{ definitely not json").unwrap();

        let mut store = FingerprintStore::load(&path).unwrap();
        assert!(store.is_empty());
        store.save().unwrap();
        let reloaded = FingerprintStore::load(&path).unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let (_guard, dir) = temp_dir();
        // A directory where the file should be cannot be read as a string.
        let path = dir.join("hashes.json");
        fs::create_dir(&path).unwrap();
        assert!(matches!(
            FingerprintStore::load(&path),
            Err(SyncError::Io { .. })
        ));
    }

    #[test]
    fn test_in_memory_save_is_a_no_op() {
        let mut store = FingerprintStore::in_memory();
        store.record(Utf8Path::new("a.md"), "a");
        store.save().unwrap();
        assert!(store.is_dirty());
    }
}
