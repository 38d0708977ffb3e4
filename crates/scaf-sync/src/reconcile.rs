//! Template reconciliation.
//!
//! A pass runs in four steps:
//!
//! 1. Resolve the structural [`MigrationPlan`] for `project -> target`
//! 2. Apply it oldest version first, so later steps see the post-migration
//!    namespace
//! 3. Diff every in-scope template against the project
//! 4. Record the target version, unless that would be a downgrade
//!
//! # Decision Table
//!
//! For each template path, with `recorded` the fingerprint of the last
//! tool write:
//!
//! | On disk | disk == template | disk == recorded | recorded == template | Action |
//! |---|---|---|---|---|
//! | missing | | | | create |
//! | present | yes | | | skip (fingerprint adopted) |
//! | present | no | yes | | update |
//! | present | no | no | yes | skip, keep the user's edit |
//! | present | no | no | no (or untracked) | conflict |
//!
//! A conflict is resolved by [`ConflictPolicy`]: `Backup` copies the user's
//! file under `.scaf/backups/<target>/` and overwrites it, `Skip` leaves it
//! alone. Either way it is reported.
//!
//! # Crash Safety
//!
//! Every file is written to a temp file, synced, and renamed into place
//! before its fingerprint is recorded in memory. The fingerprint store is
//! flushed at the end of the pass, and also before an error propagates. A
//! file written just before a crash equals its template on the next run and
//! is adopted without a conflict.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use scaf_core::{
    ConflictPolicy, FxHashSet, Platform, PlatformSelection, ProjectPaths, TemplateFile, Version,
};
use scaf_migrate::{ManifestIndex, MigrationPlan};
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::fingerprint::FingerprintStore;
use crate::fsio::{backup_file, write_atomic};
use crate::report::{Conflict, ReconcileReport, SkipReason, VersionOutcome};
use crate::state::VersionStore;
use crate::templates::TemplateProvider;
use crate::view::ProjectView;

/// Options for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Compute and report every decision without touching the filesystem.
    pub dry_run: bool,
    /// How user-edited files with changed templates are resolved.
    pub conflict_policy: ConflictPolicy,
}

impl ReconcileOptions {
    /// Sets dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the conflict policy.
    #[must_use]
    pub const fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }
}

/// Reconciles a project against the current templates.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use scaf_core::{Platform, PlatformSelection, ProjectPaths, TemplateFile, Version};
/// use scaf_migrate::{ManifestRegistry, StaticSource};
/// use scaf_sync::{Reconciler, StaticTemplateProvider};
///
/// let dir = tempfile::tempdir()?;
/// let paths = ProjectPaths::new(Utf8PathBuf::try_from(dir.path().to_path_buf())?);
/// let registry = ManifestRegistry::new(StaticSource::new());
/// let index = registry.manifests()?;
/// let provider = StaticTemplateProvider::new()
///     .with(TemplateFile::new(Platform::Claude, ".claude/commands/start.md", "# Start\n"))
///     .with(TemplateFile::new(Platform::Cursor, ".cursor/rules/start.mdc", "# Start\n"));
///
/// let selection: PlatformSelection = [Platform::Claude].into_iter().collect();
/// let version = Version::new("0.4.0");
/// let reconciler = Reconciler::new(&paths, &index, &provider);
///
/// let first = reconciler.reconcile(&Version::zero(), &version, &selection)?;
/// assert_eq!(first.created.len(), 1);
///
/// let second = reconciler.reconcile(&version, &version, &selection)?;
/// assert!(second.is_noop());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Reconciler<'a> {
    paths: &'a ProjectPaths,
    index: &'a ManifestIndex,
    provider: &'a dyn TemplateProvider,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler with default options.
    #[must_use]
    pub fn new(
        paths: &'a ProjectPaths,
        index: &'a ManifestIndex,
        provider: &'a dyn TemplateProvider,
    ) -> Self {
        Self {
            paths,
            index,
            provider,
            options: ReconcileOptions::default(),
        }
    }

    /// Replaces the options.
    #[must_use]
    pub const fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    /// The options in effect.
    #[must_use]
    pub const fn options(&self) -> ReconcileOptions {
        self.options
    }

    /// Reconciles the project from `project_version` to `target`.
    ///
    /// Only templates that are common or belong to a platform in
    /// `selection` are considered. Nothing is written inside the directory
    /// of a platform outside `selection`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidVersion`] before touching anything if
    /// `target` cannot be used as a path component. Returns
    /// [`SyncError::Io`] if the fingerprint or version file cannot be read or
    /// written, or if a project file cannot be changed.
    pub fn reconcile(
        &self,
        project_version: &Version,
        target: &Version,
        selection: &PlatformSelection,
    ) -> Result<ReconcileReport, SyncError> {
        if !target.is_path_safe() {
            return Err(SyncError::InvalidVersion(target.clone()));
        }

        let dry_run = self.options.dry_run;
        let downgrade = target < project_version;
        if downgrade {
            warn!(
                project = %project_version,
                target = %target,
                "Target is older than the project, version will not be lowered"
            );
        }

        let plan = self.index.plan(project_version, target);
        let templates = self.collect_templates(selection)?;
        let store = FingerprintStore::load(&self.paths.fingerprint_file())?;

        let mut pass = Pass {
            paths: self.paths,
            selection,
            options: self.options,
            view: ProjectView::new(self.paths),
            store,
            backup_dir: self.paths.backup_dir(target),
            report: ReconcileReport::new(project_version, target, dry_run),
        };

        let outcome = pass.run(&plan, &templates);
        let saved = if dry_run { Ok(()) } else { pass.store.save() };
        outcome?;
        saved?;

        let mut report = pass.report;
        report.version = self.update_version(project_version, target, downgrade)?;

        info!(
            from = %report.from,
            to = %report.to,
            dry_run,
            migrations = report.migrations_applied,
            created = report.created.len(),
            updated = report.updated.len(),
            deleted = report.deleted.len(),
            conflicts = report.conflicts.len(),
            "Reconciliation finished"
        );
        Ok(report)
    }

    /// Gathers in-scope templates: common first, then each selected
    /// platform. The first template claiming a path wins.
    fn collect_templates(
        &self,
        selection: &PlatformSelection,
    ) -> Result<Vec<(TemplateFile, Option<SkipReason>)>, SyncError> {
        let mut candidates = self.provider.templates(None)?;
        for platform in selection.iter() {
            candidates.extend(self.provider.templates(Some(platform))?);
        }

        let mut seen = FxHashSet::default();
        let mut templates = Vec::with_capacity(candidates.len());
        for template in candidates {
            if !selection.includes(template.platform) {
                warn!(
                    path = %template.path,
                    platform = ?template.platform,
                    "Provider returned a template outside the selection, ignoring it"
                );
                continue;
            }
            if !is_safe_relative(&template.path) {
                warn!(path = %template.path, "Template path is unsafe, skipping it");
                templates.push((template, Some(SkipReason::UnsafePath)));
                continue;
            }
            if let Some(platform) = unselected_platform(selection, &template.path) {
                warn!(
                    path = %template.path,
                    platform = ?platform,
                    "Template lies in an unselected platform's directory, skipping it"
                );
                templates.push((template, Some(SkipReason::UnselectedPlatform)));
                continue;
            }
            if !seen.insert(normalize(&template.path)) {
                warn!(path = %template.path, "Duplicate template path, keeping the first");
                templates.push((template, Some(SkipReason::DuplicateTemplate)));
                continue;
            }
            templates.push((template, None));
        }

        templates.sort_by(|(a, _), (b, _)| a.path.cmp(&b.path));
        Ok(templates)
    }

    fn update_version(
        &self,
        project_version: &Version,
        target: &Version,
        downgrade: bool,
    ) -> Result<VersionOutcome, SyncError> {
        if downgrade {
            return Ok(VersionOutcome::DowngradeRefused {
                recorded: project_version.clone(),
                requested: target.clone(),
            });
        }

        let store = VersionStore::new(self.paths);
        let previous = store.read()?;
        if previous.as_ref() == Some(target) {
            return Ok(VersionOutcome::Unchanged {
                version: target.clone(),
            });
        }

        if !self.options.dry_run {
            store.write(target)?;
        }
        Ok(VersionOutcome::Updated {
            previous,
            to: target.clone(),
        })
    }
}

/// State shared by the migration and template steps of one pass.
pub(crate) struct Pass<'p> {
    pub(crate) paths: &'p ProjectPaths,
    pub(crate) selection: &'p PlatformSelection,
    pub(crate) options: ReconcileOptions,
    pub(crate) view: ProjectView<'p>,
    pub(crate) store: FingerprintStore,
    pub(crate) backup_dir: Utf8PathBuf,
    pub(crate) report: ReconcileReport,
}

impl Pass<'_> {
    fn run(
        &mut self,
        plan: &MigrationPlan,
        templates: &[(TemplateFile, Option<SkipReason>)],
    ) -> Result<(), SyncError> {
        for step in &plan.steps {
            self.apply_migration(step)?;
        }
        for (template, rejected) in templates {
            match rejected {
                Some(reason) => self.report.skip(&template.path, *reason),
                None => self.reconcile_template(template)?,
            }
        }
        Ok(())
    }

    fn reconcile_template(&mut self, template: &TemplateFile) -> Result<(), SyncError> {
        let path = template.path.as_path();
        let template_hash = template.hash();

        let Some(disk) = self.view.read(path)? else {
            if self.view.exists(path) {
                warn!(path = %path, "Template path is occupied by a non-file");
                self.report.skip(path, SkipReason::NotAFile);
                return Ok(());
            }
            debug!(path = %path, "create");
            self.write_template(template)?;
            self.report.created.push(path.to_owned());
            return Ok(());
        };

        if template_hash.matches(&disk) {
            self.store.record_hash(path, template_hash);
            self.report.skip(path, SkipReason::UpToDate);
            return Ok(());
        }

        match self.store.hash_of(path).cloned() {
            Some(recorded) if recorded.matches(&disk) => {
                debug!(path = %path, "update");
                self.write_template(template)?;
                self.report.updated.push(path.to_owned());
            }
            Some(recorded) if recorded == template_hash => {
                debug!(path = %path, "skip, user modified");
                self.report.skip(path, SkipReason::UserModified);
            }
            _ => self.resolve_conflict(template, &disk)?,
        }
        Ok(())
    }

    fn resolve_conflict(&mut self, template: &TemplateFile, disk: &[u8]) -> Result<(), SyncError> {
        let path = template.path.as_path();
        let backup = match self.options.conflict_policy {
            ConflictPolicy::Backup => {
                let backup = self.backup(path, disk)?;
                self.write_template(template)?;
                Some(backup)
            }
            ConflictPolicy::Skip => None,
        };

        warn!(
            path = %path,
            backup = ?backup.as_deref().map(Utf8Path::as_str),
            "Conflict: file was edited and its template changed"
        );
        self.report.conflicts.push(Conflict {
            path: path.to_owned(),
            backup,
        });
        Ok(())
    }

    fn write_template(&mut self, template: &TemplateFile) -> Result<(), SyncError> {
        if !self.options.dry_run {
            write_atomic(&self.paths.resolve(&template.path), template.content.as_bytes())?;
        }
        self.store.record_hash(&template.path, template.hash());
        Ok(())
    }

    /// Saves `contents` of `path` under the backup directory and returns
    /// the backup location relative to the project root.
    pub(crate) fn backup(&mut self, path: &Utf8Path, contents: &[u8]) -> Result<Utf8PathBuf, SyncError> {
        let absolute = backup_file(&self.backup_dir, path, contents, self.options.dry_run)?;
        Ok(absolute
            .strip_prefix(self.paths.root())
            .map_or_else(|_| absolute.clone(), Utf8Path::to_path_buf))
    }
}

/// Relative, non-empty, free of `..`, and outside the tool's state.
pub(crate) fn is_safe_relative(path: &Utf8Path) -> bool {
    !path.as_str().trim().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir))
        && !ProjectPaths::is_state_path(path)
}

/// The unselected platform whose directory contains `path`, if any.
pub(crate) fn unselected_platform(
    selection: &PlatformSelection,
    path: &Utf8Path,
) -> Option<Platform> {
    let first = path
        .components()
        .find(|c| !matches!(c, Utf8Component::CurDir))?;
    Platform::ALL
        .into_iter()
        .find(|p| !selection.contains(*p) && first.as_str() == p.config_dir())
}

fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    path.components()
        .filter(|c| !matches!(c, Utf8Component::CurDir))
        .collect()
}
