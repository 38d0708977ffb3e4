//! Structural migrations applied at the start of a reconciliation pass.
//!
//! - A rename whose source is missing has already been applied and is a
//!   no-op. A rename never clobbers an occupied destination, and never
//!   moves anything into the directory of an unselected platform.
//! - A directory rename moves the whole tree along with every fingerprint
//!   under it.
//! - A delete removes pristine files. A user-modified or untracked file is
//!   backed up first under [`ConflictPolicy::Backup`], or kept and reported
//!   under [`ConflictPolicy::Skip`].

use std::fs;

use camino::Utf8Path;
use scaf_core::{ConflictPolicy, MigrationItem, ProjectPaths};
use scaf_migrate::PlannedMigration;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::fsio::{prune_empty_dirs, walk_files};
use crate::reconcile::{Pass, unselected_platform};
use crate::report::{Conflict, RenamedPath, SkipReason};
use crate::view::{move_path, remove_file};

impl Pass<'_> {
    pub(crate) fn apply_migration(&mut self, step: &PlannedMigration) -> Result<(), SyncError> {
        let touches_state = ProjectPaths::is_state_path(step.item.source())
            || step.item.destination().is_some_and(ProjectPaths::is_state_path);
        if touches_state {
            warn!(version = %step.version, item = %step.item, "Migration targets tool state, skipping");
            self.report.skip(step.item.source(), SkipReason::UnsafePath);
            return Ok(());
        }
        if let Some(platform) = step
            .item
            .destination()
            .and_then(|to| unselected_platform(self.selection, to))
        {
            warn!(
                version = %step.version,
                item = %step.item,
                platform = ?platform,
                "Migration moves into an unselected platform's directory, skipping"
            );
            self.report.skip(step.item.source(), SkipReason::UnselectedPlatform);
            return Ok(());
        }

        match &step.item {
            MigrationItem::Rename { from, to } => self.apply_rename(step, from, to),
            MigrationItem::Delete { from } => self.apply_delete(step, from),
        }
    }

    fn apply_rename(
        &mut self,
        step: &PlannedMigration,
        from: &Utf8Path,
        to: &Utf8Path,
    ) -> Result<(), SyncError> {
        if !self.view.exists(from) {
            debug!(version = %step.version, from = %from, "Rename source missing, already applied");
            return Ok(());
        }
        if self.view.exists(to) {
            warn!(
                version = %step.version,
                from = %from,
                to = %to,
                "Rename destination exists, leaving both in place"
            );
            self.report.skip(from, SkipReason::DestinationExists);
            return Ok(());
        }

        if self.options.dry_run {
            self.view.record_rename(from, to);
        } else {
            move_path(self.paths, from, to)?;
            if let Some(parent) = self.paths.resolve(from).parent() {
                prune_empty_dirs(parent, self.paths.root());
            }
        }

        let moved = self.store.rename(from, to);
        info!(version = %step.version, from = %from, to = %to, fingerprints = moved, "Renamed");
        self.report.renamed.push(RenamedPath {
            from: from.to_owned(),
            to: to.to_owned(),
        });
        self.report.migrations_applied += 1;
        Ok(())
    }

    fn apply_delete(&mut self, step: &PlannedMigration, from: &Utf8Path) -> Result<(), SyncError> {
        if !self.view.exists(from) {
            debug!(version = %step.version, path = %from, "Delete target missing, already applied");
            return Ok(());
        }

        let is_dir = self.view.is_dir(from);
        let files = if is_dir {
            self.view.files_under(from)?
        } else {
            vec![from.to_owned()]
        };

        let mut removed = 0_usize;
        let mut kept = 0_usize;
        for file in &files {
            if self.delete_file(file)? {
                removed += 1;
            } else {
                kept += 1;
            }
        }

        if is_dir && kept == 0 {
            if self.options.dry_run {
                self.view.record_removal(from);
            } else {
                let dir = self.paths.resolve(from);
                if walk_files(&dir)?.is_empty() {
                    fs::remove_dir_all(&dir).map_err(|e| SyncError::io(&dir, e))?;
                }
            }
        }
        let resolved = self.paths.resolve(from);
        if let Some(parent) = resolved.parent().filter(|_| !self.options.dry_run) {
            prune_empty_dirs(parent, self.paths.root());
        }

        if removed > 0 || (is_dir && kept == 0) {
            info!(version = %step.version, path = %from, files = removed, "Deleted");
            self.report.migrations_applied += 1;
        }
        Ok(())
    }

    /// Deletes one file. Returns `false` if it was kept.
    fn delete_file(&mut self, path: &Utf8Path) -> Result<bool, SyncError> {
        let Some(contents) = self.view.read(path)? else {
            return Ok(false);
        };

        if !self.store.matches(path, &contents) {
            match self.options.conflict_policy {
                ConflictPolicy::Backup => {
                    let backup = self.backup(path, &contents)?;
                    warn!(path = %path, backup = %backup, "Deleting a modified file, backed up");
                    self.report.conflicts.push(Conflict {
                        path: path.to_owned(),
                        backup: Some(backup),
                    });
                }
                ConflictPolicy::Skip => {
                    warn!(path = %path, "Not deleting a modified file");
                    self.report.conflicts.push(Conflict {
                        path: path.to_owned(),
                        backup: None,
                    });
                    return Ok(false);
                }
            }
        }

        if self.options.dry_run {
            self.view.record_removal(path);
        } else {
            remove_file(self.paths, path)?;
        }
        self.store.forget(path);
        self.report.deleted.push(path.to_owned());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use camino::Utf8PathBuf;
    use scaf_core::{MigrationManifest, Platform, PlatformSelection, Version};
    use scaf_migrate::{ManifestIndex, ManifestRegistry, StaticSource};

    use crate::fingerprint::FingerprintStore;
    use crate::reconcile::{ReconcileOptions, Reconciler};
    use crate::report::ReconcileReport;
    use crate::templates::StaticTemplateProvider;

    use super::*;

    struct Fixture {
        _dir: tempfile::TempDir,
        paths: ProjectPaths,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
            Self {
                _dir: dir,
                paths: ProjectPaths::new(root),
            }
        }

        /// Writes a file and records it as tool-written.
        fn tracked(&self, path: &str, contents: &str) {
            self.untracked(path, contents);
            let mut store = FingerprintStore::load(&self.paths.fingerprint_file()).unwrap();
            store.record(Utf8Path::new(path), contents);
            store.save().unwrap();
        }

        fn untracked(&self, path: &str, contents: &str) {
            let full = self.paths.resolve(Utf8Path::new(path));
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, contents).unwrap();
        }

        fn exists(&self, path: &str) -> bool {
            self.paths.resolve(Utf8Path::new(path)).exists()
        }

        fn migrate(&self, items: Vec<MigrationItem>, options: ReconcileOptions) -> ReconcileReport {
            let all: PlatformSelection = Platform::ALL.into_iter().collect();
            self.reconcile(&index(items), options, &all)
        }

        fn reconcile(
            &self,
            index: &ManifestIndex,
            options: ReconcileOptions,
            selection: &PlatformSelection,
        ) -> ReconcileReport {
            let provider = StaticTemplateProvider::new();
            Reconciler::new(&self.paths, index, &provider)
                .with_options(options)
                .reconcile(&Version::new("0.1.0"), &Version::new("0.2.0"), selection)
                .unwrap()
        }
    }

    fn index(items: Vec<MigrationItem>) -> Arc<ManifestIndex> {
        let mut manifest = MigrationManifest::new("0.2.0");
        for item in items {
            manifest = manifest.with_item(item);
        }
        ManifestRegistry::new(StaticSource::from_iter([manifest]))
            .manifests()
            .unwrap()
    }

    #[test]
    fn test_rename_file() {
        let fx = Fixture::new();
        fx.tracked("a/old.md", "x");

        let report = fx.migrate(vec![MigrationItem::rename("a/old.md", "b/new.md")], ReconcileOptions::default());
        assert_eq!(report.migrations_applied, 1);
        assert!(fx.exists("b/new.md"));
        assert!(!fx.exists("a"));

        let store = FingerprintStore::load(&fx.paths.fingerprint_file()).unwrap();
        assert!(store.matches(Utf8Path::new("b/new.md"), "x"));
        assert!(!store.is_tracked(Utf8Path::new("a/old.md")));
    }

    #[test]
    fn test_rename_missing_source_is_noop() {
        let fx = Fixture::new();
        fx.tracked("b.md", "x");

        let report = fx.migrate(vec![MigrationItem::rename("a.md", "b.md")], ReconcileOptions::default());
        assert_eq!(report.migrations_applied, 0);
        assert!(report.renamed.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_rename_never_clobbers() {
        let fx = Fixture::new();
        fx.tracked("a.md", "a");
        fx.untracked("b.md", "user b");

        let report = fx.migrate(vec![MigrationItem::rename("a.md", "b.md")], ReconcileOptions::default());
        assert_eq!(report.migrations_applied, 0);
        assert_eq!(report.skipped[0].reason, SkipReason::DestinationExists);
        assert_eq!(fs::read_to_string(fx.paths.resolve(Utf8Path::new("b.md"))).unwrap(), "user b");
        assert!(fx.exists("a.md"));
    }

    #[test]
    fn test_rename_directory_moves_fingerprints() {
        let fx = Fixture::new();
        fx.tracked(".claude/agents/x.md", "x");
        fx.tracked(".claude/agents/sub/y.md", "y");

        let report = fx.migrate(
            vec![MigrationItem::rename(".claude/agents", ".claude/scaf/agents")],
            ReconcileOptions::default(),
        );
        assert_eq!(report.migrations_applied, 1);
        assert!(fx.exists(".claude/scaf/agents/sub/y.md"));
        assert!(!fx.exists(".claude/agents"));

        let store = FingerprintStore::load(&fx.paths.fingerprint_file()).unwrap();
        assert!(store.matches(Utf8Path::new(".claude/scaf/agents/sub/y.md"), "y"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_delete_pristine_file() {
        let fx = Fixture::new();
        fx.tracked("hooks/legacy.py", "old");

        let report = fx.migrate(vec![MigrationItem::delete("hooks/legacy.py")], ReconcileOptions::default());
        assert_eq!(report.deleted, [Utf8PathBuf::from("hooks/legacy.py")]);
        assert!(report.conflicts.is_empty());
        assert!(!fx.exists("hooks"));
        assert!(!fx.exists(".scaf/backups"));
    }

    #[test]
    fn test_delete_modified_file_is_backed_up() {
        let fx = Fixture::new();
        fx.tracked("legacy.py", "old");
        fx.untracked("legacy.py", "edited");

        let report = fx.migrate(vec![MigrationItem::delete("legacy.py")], ReconcileOptions::default());
        assert!(!fx.exists("legacy.py"));
        assert_eq!(
            report.conflicts[0].backup.as_deref(),
            Some(Utf8Path::new(".scaf/backups/0.2.0/legacy.py"))
        );
        assert!(fx.exists(".scaf/backups/0.2.0/legacy.py"));
    }

    #[test]
    fn test_delete_untracked_file_kept_under_skip_policy() {
        let fx = Fixture::new();
        fx.untracked("legacy.py", "mine");

        let strict = ReconcileOptions::default().with_conflict_policy(ConflictPolicy::Skip);
        let report = fx.migrate(vec![MigrationItem::delete("legacy.py")], strict);
        assert!(fx.exists("legacy.py"));
        assert!(report.deleted.is_empty());
        assert_eq!(report.conflicts[0].backup, None);
        assert_eq!(report.migrations_applied, 0);
    }

    #[test]
    fn test_delete_directory() {
        let fx = Fixture::new();
        fx.tracked("old/a.md", "a");
        fx.tracked("old/nested/b.md", "b");

        let report = fx.migrate(vec![MigrationItem::delete("old")], ReconcileOptions::default());
        assert_eq!(report.deleted.len(), 2);
        assert_eq!(report.migrations_applied, 1);
        assert!(!fx.exists("old"));
    }

    #[test]
    fn test_delete_directory_keeps_modified_file_under_skip_policy() {
        let fx = Fixture::new();
        fx.tracked("old/a.md", "a");
        fx.untracked("old/mine.md", "mine");

        let strict = ReconcileOptions::default().with_conflict_policy(ConflictPolicy::Skip);
        let report = fx.migrate(vec![MigrationItem::delete("old")], strict);
        assert_eq!(report.deleted, [Utf8PathBuf::from("old/a.md")]);
        assert!(fx.exists("old/mine.md"));
    }

    #[test]
    fn test_state_paths_are_never_migrated() {
        let fx = Fixture::new();
        fx.tracked("a.md", "a");

        let report = fx.migrate(vec![MigrationItem::delete(".scaf")], ReconcileOptions::default());
        assert_eq!(report.skipped[0].reason, SkipReason::UnsafePath);
        assert!(fx.exists(".scaf/.template-hashes.json"));
    }

    #[test]
    fn test_rename_then_delete_in_dry_run() {
        let fx = Fixture::new();
        fx.tracked("a.md", "a");

        let dry = ReconcileOptions::default().with_dry_run(true);
        let report = fx.migrate(
            vec![MigrationItem::rename("a.md", "b.md"), MigrationItem::delete("b.md")],
            dry,
        );
        assert_eq!(report.renamed.len(), 1);
        assert_eq!(report.deleted, [Utf8PathBuf::from("b.md")]);
        assert_eq!(report.migrations_applied, 2);
        assert!(fx.exists("a.md"));
        assert!(!fx.exists("b.md"));
    }

    #[test]
    fn test_rename_into_unselected_platform_is_skipped() {
        let fx = Fixture::new();
        fx.tracked(".claude/commands/start.md", "start");
        let index = index(vec![MigrationItem::rename(".claude/commands", ".iflow/commands")]);
        let claude: PlatformSelection = [Platform::Claude].into_iter().collect();

        let report = fx.reconcile(&index, ReconcileOptions::default(), &claude);
        assert_eq!(report.migrations_applied, 0);
        assert!(report.renamed.is_empty());
        assert_eq!(report.skipped[0].reason, SkipReason::UnselectedPlatform);
        assert!(fx.exists(".claude/commands/start.md"));
        assert!(!fx.exists(".iflow"));
    }

    #[test]
    fn test_rename_into_own_subtree_is_excluded() {
        let fx = Fixture::new();
        fx.tracked(".claude/commands/start.md", "start");
        let index = index(vec![MigrationItem::rename(".claude/commands", ".claude/commands/scaf")]);
        assert_eq!(index.failures().len(), 1);
        assert!(index.is_empty());

        let all: PlatformSelection = Platform::ALL.into_iter().collect();
        let dry = fx.reconcile(&index, ReconcileOptions::default().with_dry_run(true), &all);
        let real = fx.reconcile(&index, ReconcileOptions::default(), &all);
        assert_eq!(dry.renamed, real.renamed);
        assert!(real.renamed.is_empty());
        assert_eq!(real.migrations_applied, 0);
        assert!(fx.exists(".claude/commands/start.md"));
        assert!(!fx.exists(".claude/commands/scaf"));
    }
}
