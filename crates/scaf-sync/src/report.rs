//! The outcome of a reconciliation pass.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use scaf_core::{FileAction, Version};
use serde::Serialize;

/// Why a path was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum SkipReason {
    /// The file already equals its template.
    UpToDate,
    /// The user edited the file and its template has not changed.
    UserModified,
    /// A rename target is already occupied.
    DestinationExists,
    /// Something other than a regular file occupies the path.
    NotAFile,
    /// The path escapes the project or points into tool state.
    UnsafePath,
    /// Another template already claimed the path.
    DuplicateTemplate,
    /// The path lies in the directory of a platform that is not selected.
    UnselectedPlatform,
}

impl SkipReason {
    /// Returns a short description for display.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::UpToDate => "up to date",
            Self::UserModified => "user modified",
            Self::DestinationExists => "destination exists",
            Self::NotAFile => "not a regular file",
            Self::UnsafePath => "unsafe path",
            Self::DuplicateTemplate => "duplicate template",
            Self::UnselectedPlatform => "unselected platform",
        }
    }
}

/// A path that was left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPath {
    /// Project-relative path.
    pub path: Utf8PathBuf,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// A rename migration that was carried out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamedPath {
    /// Previous path.
    pub from: Utf8PathBuf,
    /// New path.
    pub to: Utf8PathBuf,
}

/// A user-edited file the tool wanted to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    /// Project-relative path.
    pub path: Utf8PathBuf,
    /// Where the user's version was saved before it was replaced, relative
    /// to the project root. `None` if the file was left in place.
    pub backup: Option<Utf8PathBuf>,
}

impl Conflict {
    /// Returns `true` if the tool replaced the user's version.
    #[must_use]
    pub fn was_overwritten(&self) -> bool {
        self.backup.is_some()
    }
}

/// What happened to the project's version marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VersionOutcome {
    /// The marker was (or in a dry run, would be) set to `to`.
    Updated {
        /// The previously recorded version, if any.
        previous: Option<Version>,
        /// The new version.
        to: Version,
    },
    /// The marker already held `version`.
    Unchanged {
        /// The recorded version.
        version: Version,
    },
    /// The target is older than the project; the marker was left alone.
    DowngradeRefused {
        /// The project's version.
        recorded: Version,
        /// The older version that was requested.
        requested: Version,
    },
}

impl fmt::Display for VersionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Updated {
                previous: Some(previous),
                to,
            } => write!(f, "{previous} -> {to}"),
            Self::Updated { previous: None, to } => write!(f, "set to {to}"),
            Self::Unchanged { version } => write!(f, "unchanged at {version}"),
            Self::DowngradeRefused {
                recorded,
                requested,
            } => write!(
                f,
                "kept at {recorded} (refused downgrade to {requested})"
            ),
        }
    }
}

/// Everything a reconciliation pass did, or in a dry run would do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// The project's version before the pass.
    pub from: Version,
    /// The version reconciled to.
    pub to: Version,
    /// `true` if nothing was written.
    pub dry_run: bool,
    /// Files written for the first time.
    pub created: Vec<Utf8PathBuf>,
    /// Pristine files replaced with a newer template.
    pub updated: Vec<Utf8PathBuf>,
    /// Paths left alone.
    pub skipped: Vec<SkippedPath>,
    /// Files removed by delete migrations.
    pub deleted: Vec<Utf8PathBuf>,
    /// Rename migrations carried out.
    pub renamed: Vec<RenamedPath>,
    /// User-edited files the tool wanted to change.
    pub conflicts: Vec<Conflict>,
    /// Number of structural migrations that changed something.
    pub migrations_applied: usize,
    /// What happened to the version marker.
    pub version: VersionOutcome,
}

impl ReconcileReport {
    pub(crate) fn new(from: &Version, to: &Version, dry_run: bool) -> Self {
        Self {
            from: from.clone(),
            to: to.clone(),
            dry_run,
            created: Vec::new(),
            updated: Vec::new(),
            skipped: Vec::new(),
            deleted: Vec::new(),
            renamed: Vec::new(),
            conflicts: Vec::new(),
            migrations_applied: 0,
            version: VersionOutcome::Unchanged {
                version: from.clone(),
            },
        }
    }

    pub(crate) fn skip(&mut self, path: &Utf8Path, reason: SkipReason) {
        self.skipped.push(SkippedPath {
            path: path.to_owned(),
            reason,
        });
    }

    /// Number of file writes, moves, and removals.
    #[must_use]
    pub fn file_operations(&self) -> usize {
        self.created.len()
            + self.updated.len()
            + self.deleted.len()
            + self.renamed.len()
            + self.conflicts.iter().filter(|c| c.was_overwritten()).count()
    }

    /// Returns `true` if the pass changed no file.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.file_operations() == 0
    }

    /// Returns `true` if any conflict was found.
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Returns `true` if the version marker was held back.
    #[must_use]
    pub fn downgrade_refused(&self) -> bool {
        matches!(self.version, VersionOutcome::DowngradeRefused { .. })
    }

    /// Per-file decisions, in report order. Renames are not included.
    pub fn actions(&self) -> impl Iterator<Item = (&Utf8Path, FileAction)> {
        let created = self.created.iter().map(|p| (p.as_path(), FileAction::Create));
        let updated = self.updated.iter().map(|p| (p.as_path(), FileAction::Update));
        let conflicts = self
            .conflicts
            .iter()
            .map(|c| (c.path.as_path(), FileAction::Conflict));
        let deleted = self.deleted.iter().map(|p| (p.as_path(), FileAction::Delete));
        let skipped = self
            .skipped
            .iter()
            .map(|s| (s.path.as_path(), FileAction::Skip));
        deleted
            .chain(created)
            .chain(updated)
            .chain(conflicts)
            .chain(skipped)
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            writeln!(f, "Dry run: no files were changed")?;
        }

        write!(f, "Migrations applied: {}", self.migrations_applied)?;
        for rename in &self.renamed {
            write!(f, "\n  rename {} -> {}", rename.from, rename.to)?;
        }
        for path in &self.deleted {
            write!(f, "\n  delete {path}")?;
        }

        let unchanged = self
            .skipped
            .iter()
            .filter(|s| s.reason == SkipReason::UpToDate)
            .count();
        write!(
            f,
            "\nFiles: {} created, {} updated, {} unchanged, {} conflicts",
            self.created.len(),
            self.updated.len(),
            unchanged,
            self.conflicts.len()
        )?;
        for path in &self.created {
            write!(f, "\n  {} {path}", FileAction::Create.label())?;
        }
        for path in &self.updated {
            write!(f, "\n  {} {path}", FileAction::Update.label())?;
        }
        for conflict in &self.conflicts {
            match &conflict.backup {
                Some(backup) => write!(
                    f,
                    "\n  {} {} (backed up to {backup})",
                    FileAction::Conflict.label(),
                    conflict.path
                )?,
                None => write!(
                    f,
                    "\n  {} {} (kept your version)",
                    FileAction::Conflict.label(),
                    conflict.path
                )?,
            }
        }
        for skipped in self.skipped.iter().filter(|s| s.reason != SkipReason::UpToDate) {
            write!(
                f,
                "\n  {} {} ({})",
                FileAction::Skip.label(),
                skipped.path,
                skipped.reason.label()
            )?;
        }

        write!(f, "\nVersion: {}", self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ReconcileReport {
        let mut report = ReconcileReport::new(&Version::new("0.1.0"), &Version::new("0.3.0"), false);
        report.renamed.push(RenamedPath {
            from: "a.md".into(),
            to: "b.md".into(),
        });
        report.deleted.push("c.md".into());
        report.migrations_applied = 2;
        report.created.push("new.md".into());
        report.updated.push("b.md".into());
        report.skip(Utf8Path::new("same.md"), SkipReason::UpToDate);
        report.skip(Utf8Path::new("mine.md"), SkipReason::UserModified);
        report.conflicts.push(Conflict {
            path: "both.md".into(),
            backup: Some(".scaf/backups/0.3.0/both.md".into()),
        });
        report.version = VersionOutcome::Updated {
            previous: Some(Version::new("0.1.0")),
            to: Version::new("0.3.0"),
        };
        report
    }

    #[test]
    fn test_file_operations() {
        let mut report = report();
        assert_eq!(report.file_operations(), 5);
        assert!(!report.is_noop());

        report.conflicts[0].backup = None;
        assert_eq!(report.file_operations(), 4);
    }

    #[test]
    fn test_empty_report_is_noop() {
        let report = ReconcileReport::new(&Version::new("0.3.0"), &Version::new("0.3.0"), false);
        assert!(report.is_noop());
        assert!(!report.has_conflicts());
        assert!(!report.downgrade_refused());
    }

    #[test]
    fn test_actions() {
        let report = report();
        let actions: Vec<(&str, FileAction)> =
            report.actions().map(|(p, a)| (p.as_str(), a)).collect();
        assert_eq!(
            actions,
            [
                ("c.md", FileAction::Delete),
                ("new.md", FileAction::Create),
                ("b.md", FileAction::Update),
                ("both.md", FileAction::Conflict),
                ("same.md", FileAction::Skip),
                ("mine.md", FileAction::Skip),
            ]
        );
    }

    #[test]
    fn test_display() {
        insta::assert_snapshot!(report().to_string(), @r"
        Migrations applied: 2
          rename a.md -> b.md
          delete c.md
        Files: 1 created, 1 updated, 1 unchanged, 1 conflicts
          create new.md
          update b.md
          conflict both.md (backed up to .scaf/backups/0.3.0/both.md)
          skip mine.md (user modified)
        Version: 0.1.0 -> 0.3.0
        ");
    }

    #[test]
    fn test_version_outcome_display() {
        let refused = VersionOutcome::DowngradeRefused {
            recorded: Version::new("0.4.0"),
            requested: Version::new("0.3.0"),
        };
        assert_eq!(refused.to_string(), "kept at 0.4.0 (refused downgrade to 0.3.0)");
    }

    #[test]
    fn test_serializes_with_status_tag() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["version"]["status"], "updated");
        assert_eq!(json["conflicts"][0]["backup"], ".scaf/backups/0.3.0/both.md");
    }
}
