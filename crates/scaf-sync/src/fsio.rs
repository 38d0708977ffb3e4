//! Filesystem primitives used by every writer in this crate.
//!
//! - [`write_atomic`]: write to a sibling temp file, fsync, rename over
//! - [`read_optional`]: read a file, mapping "not found" to `None`
//! - [`walk_files`]: every regular file under a directory, hidden ones included
//! - [`allocate_backup`] / [`backup_file`]: non-clobbering backup copies

use std::fs::{self, File};
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;

use crate::error::SyncError;

/// Writes `contents` to `path` so that readers see either the old file or
/// the complete new one.
///
/// Parent directories are created as needed. The temp file lives next to
/// the target so the final rename never crosses a filesystem boundary.
pub fn write_atomic(path: &Utf8Path, contents: &[u8]) -> Result<(), SyncError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;

    let tmp_path = parent.join(format!(
        ".{}.scaf-tmp-{}",
        path.file_name().unwrap_or("file"),
        std::process::id()
    ));

    let written = File::create(&tmp_path).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(SyncError::io(&tmp_path, e));
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        SyncError::io(path, e)
    })
}

/// Reads `path`, returning `Ok(None)` if it does not exist.
pub fn read_optional(path: &Utf8Path) -> Result<Option<Vec<u8>>, SyncError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SyncError::io(path, e)),
    }
}

/// Lists every regular file under `root`, relative to `root`, sorted.
///
/// Hidden files are included and ignore files are not honoured: template
/// trees and project directories are copied verbatim. A missing `root`
/// yields an empty list.
pub fn walk_files(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, SyncError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(false)
        .follow_links(false)
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = result?;
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = Utf8Path::from_path(entry.path())
            .ok_or_else(|| SyncError::NonUtf8Path(entry.path().to_owned()))?;
        if let Ok(relative) = path.strip_prefix(root) {
            files.push(relative.to_owned());
        }
    }

    files.sort();
    Ok(files)
}

/// Picks a backup location for `relative` inside `backup_dir` that is not
/// already taken, appending `.1`, `.2`, ... to the file name if needed.
#[must_use]
pub fn allocate_backup(backup_dir: &Utf8Path, relative: &Utf8Path) -> Utf8PathBuf {
    let candidate = backup_dir.join(relative);
    if !candidate.exists() {
        return candidate;
    }

    let mut n = 1_u32;
    loop {
        let numbered = Utf8PathBuf::from(format!("{candidate}.{n}"));
        if !numbered.exists() {
            return numbered;
        }
        n += 1;
    }
}

/// Copies `contents` of the project file `relative` into `backup_dir`.
///
/// Returns the backup path. With `dry_run` nothing is written and the path
/// that would have been used is returned.
pub fn backup_file(
    backup_dir: &Utf8Path,
    relative: &Utf8Path,
    contents: &[u8],
    dry_run: bool,
) -> Result<Utf8PathBuf, SyncError> {
    let target = allocate_backup(backup_dir, relative);
    if !dry_run {
        write_atomic(&target, contents)?;
    }
    Ok(target)
}

/// Removes `dir` and its empty parents, stopping at `stop` or at the first
/// directory that still has entries.
pub fn prune_empty_dirs(dir: &Utf8Path, stop: &Utf8Path) {
    let mut current = Some(dir);
    while let Some(path) = current {
        if path == stop || !path.starts_with(stop) {
            break;
        }
        if fs::remove_dir(path).is_err() {
            break;
        }
        current = path.parent();
    }
}
