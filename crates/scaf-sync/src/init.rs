//! Project initialization.

use scaf_core::{PlatformSelection, ProjectConfig, ProjectPaths, Version};
use scaf_migrate::ManifestIndex;
use tracing::info;

use crate::error::SyncError;
use crate::reconcile::{ReconcileOptions, Reconciler};
use crate::report::ReconcileReport;
use crate::state::{VersionStore, load_config, save_config};
use crate::templates::TemplateProvider;

/// Initializes the project at `paths` for `selection` at `version`.
///
/// Records the selection and the conflict policy from `options` in the
/// project configuration, then reconciles every in-scope template. An
/// already initialized project keeps its recorded version as the starting
/// point, so running this twice is a no-op and it never lowers the version.
///
/// # Errors
///
/// Same as [`Reconciler::reconcile`], plus [`SyncError::Config`] if an
/// existing configuration is malformed.
pub fn init_project(
    paths: &ProjectPaths,
    selection: &PlatformSelection,
    version: &Version,
    index: &ManifestIndex,
    provider: &dyn TemplateProvider,
    options: ReconcileOptions,
) -> Result<ReconcileReport, SyncError> {
    let config = ProjectConfig {
        platforms: selection.clone(),
        conflict_policy: options.conflict_policy,
    };
    let previous = load_config(paths)?;
    if !options.dry_run && previous.as_ref() != Some(&config) {
        save_config(paths, &config)?;
    }

    let recorded = VersionStore::new(paths).read()?;
    let project_version = recorded.clone().unwrap_or_else(|| version.clone());
    info!(
        root = %paths.root(),
        platforms = %selection,
        version = %version,
        reinit = recorded.is_some(),
        "Initializing project"
    );

    Reconciler::new(paths, index, provider)
        .with_options(options)
        .reconcile(&project_version, version, selection)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use camino::{Utf8Path, Utf8PathBuf};
    use scaf_core::{ConflictPolicy, Platform, TemplateFile};
    use scaf_migrate::{ManifestRegistry, StaticSource};

    use super::*;
    use crate::report::VersionOutcome;
    use crate::state::resolve_platforms;
    use crate::templates::StaticTemplateProvider;

    fn setup() -> (tempfile::TempDir, ProjectPaths, StaticTemplateProvider) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let provider = StaticTemplateProvider::new()
            .with(TemplateFile::common("AGENTS.md", "agents\n"))
            .with(TemplateFile::new(Platform::Claude, ".claude/settings.json", "{}\n"))
            .with(TemplateFile::new(Platform::IFlow, ".iflow/settings.json", "{}\n"));
        (dir, ProjectPaths::new(root), provider)
    }

    #[test]
    fn test_init_writes_config_templates_and_version() {
        let (_guard, paths, provider) = setup();
        let index = ManifestRegistry::new(StaticSource::new()).manifests().unwrap();
        let selection: PlatformSelection = [Platform::Claude].into_iter().collect();

        let report = init_project(
            &paths,
            &selection,
            &Version::new("0.4.0"),
            &index,
            &provider,
            ReconcileOptions::default(),
        )
        .unwrap();

        assert_eq!(report.created.len(), 2);
        assert!(paths.resolve(Utf8Path::new(".claude/settings.json")).exists());
        assert!(!paths.resolve(Utf8Path::new(".iflow")).exists());
        assert_eq!(
            fs::read_to_string(paths.version_file()).unwrap().trim(),
            "0.4.0"
        );
        let resolution = resolve_platforms(&paths).unwrap();
        assert!(!resolution.is_inferred());
        assert_eq!(resolution.selection(), &selection);
    }

    #[test]
    fn test_init_twice_is_noop() {
        let (_guard, paths, provider) = setup();
        let index = ManifestRegistry::new(StaticSource::new()).manifests().unwrap();
        let selection: PlatformSelection = [Platform::Claude].into_iter().collect();
        let version = Version::new("0.4.0");
        let options = ReconcileOptions::default().with_conflict_policy(ConflictPolicy::Skip);

        init_project(&paths, &selection, &version, &index, &provider, options).unwrap();
        let again = init_project(&paths, &selection, &version, &index, &provider, options).unwrap();
        assert!(again.is_noop());
        assert_eq!(again.version, VersionOutcome::Unchanged { version });
    }

    #[test]
    fn test_init_never_lowers_version() {
        let (_guard, paths, provider) = setup();
        let index = ManifestRegistry::new(StaticSource::new()).manifests().unwrap();
        let selection = PlatformSelection::new();

        init_project(&paths, &selection, &Version::new("0.5.0"), &index, &provider, ReconcileOptions::default())
            .unwrap();
        let report = init_project(
            &paths,
            &selection,
            &Version::new("0.4.0"),
            &index,
            &provider,
            ReconcileOptions::default(),
        )
        .unwrap();
        assert!(report.downgrade_refused());
        assert_eq!(
            VersionStore::new(&paths).read().unwrap(),
            Some(Version::new("0.5.0"))
        );
    }

    #[test]
    fn test_init_dry_run_writes_nothing() {
        let (_guard, paths, provider) = setup();
        let index = ManifestRegistry::new(StaticSource::new()).manifests().unwrap();
        let selection: PlatformSelection = [Platform::IFlow].into_iter().collect();

        let report = init_project(
            &paths,
            &selection,
            &Version::new("0.4.0"),
            &index,
            &provider,
            ReconcileOptions::default().with_dry_run(true),
        )
        .unwrap();
        assert_eq!(report.created.len(), 2);
        assert!(!paths.state_dir().exists());
    }
}
