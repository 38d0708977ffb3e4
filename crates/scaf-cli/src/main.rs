//! CLI entry point for scaf.
//!
//! Scaffolds assistant-platform files into a project and upgrades them as
//! new releases ship, applying the structural migrations each release
//! declares along the way.
//!
//! # Usage
//!
//! ```bash
//! scaf [OPTIONS] <COMMAND>
//!
//! # Set up a project for Claude and Cursor
//! scaf init --platform claude --platform cursor
//!
//! # Preview an upgrade, then apply it
//! scaf update --dry-run
//! scaf update
//!
//! # Inspect what a version range would do
//! scaf plan --from 0.2.0 --to 0.4.0
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::fmt::Display;
use std::io::Write;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::bail;
use scaf_core::{ConfigError, ConflictPolicy, Platform, PlatformSelection, ProjectPaths, Version};
use scaf_migrate::{ManifestIndex, ManifestRegistry, MigrationPlan, MigrationSummary};
use scaf_sync::{
    DirectoryTemplateProvider, ProjectStatus, ReconcileOptions, ReconcileReport, Reconciler,
    VersionStore, init_project, load_config, resolve_platforms,
};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Scaffold and upgrade assistant-platform files in a project.
#[derive(Parser)]
#[command(name = "scaf", version, about, long_about = None)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Project root.
    #[arg(short, long, global = true, env = "SCAF_PROJECT", default_value = ".")]
    path: Utf8PathBuf,

    /// Template directory, holding `common/` and one directory per platform.
    #[arg(long, global = true, env = "SCAF_TEMPLATES", default_value = "templates")]
    templates: Utf8PathBuf,

    /// Migration manifest directory.
    ///
    /// Defaults to `<templates>/manifests` if not specified.
    #[arg(long, global = true, env = "SCAF_MANIFESTS")]
    manifests: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Set up the project for one or more platforms.
    Init {
        /// Platform to install (claude, cursor, iflow). Repeatable.
        #[arg(long = "platform", required = true, num_args = 1..)]
        platforms: Vec<Platform>,

        /// Version to record. Defaults to this build's version.
        #[arg(long)]
        version: Option<Version>,

        /// Report what would change without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Never overwrite files you edited.
        #[arg(long)]
        strict: bool,
    },

    /// Upgrade the project to a newer version.
    Update {
        /// Target version. Defaults to this build's version.
        #[arg(long)]
        to: Option<Version>,

        /// Report what would change without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Proceed even if the range contains breaking changes.
        #[arg(long)]
        force: bool,

        /// Never overwrite files you edited, regardless of configuration.
        #[arg(long)]
        strict: bool,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the migrations and changes between two versions.
    Plan {
        /// Starting version.
        #[arg(long)]
        from: Version,

        /// Target version. Defaults to this build's version.
        #[arg(long)]
        to: Option<Version>,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the project's recorded version, platforms, and file drift.
    Status {
        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Output format.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text.
    Text,
    /// JSON.
    Json,
}

/// Resolved locations for one invocation.
struct Context {
    paths: ProjectPaths,
    templates: Utf8PathBuf,
    manifests: Utf8PathBuf,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// Logs go to stderr so JSON output on stdout stays parseable.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},ignore=warn,globset=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Builds a [`Context`] from CLI arguments.
///
/// A missing project root is only accepted when `create` is set.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPath`] if the project root is not a
/// directory.
fn build_context(cli: &Cli, create: bool) -> color_eyre::Result<Context> {
    validate_dir(&cli.path, create)?;

    let manifests = cli
        .manifests
        .clone()
        .unwrap_or_else(|| cli.templates.join("manifests"));

    Ok(Context {
        paths: ProjectPaths::new(cli.path.clone()),
        templates: cli.templates.clone(),
        manifests,
    })
}

fn validate_dir(path: &Utf8Path, allow_missing: bool) -> Result<(), ConfigError> {
    if !path.exists() {
        if allow_missing {
            return Ok(());
        }
        return Err(ConfigError::InvalidPath {
            path: path.to_owned(),
            reason: "does not exist".to_owned(),
        });
    }

    if !path.is_dir() {
        return Err(ConfigError::InvalidPath {
            path: path.to_owned(),
            reason: "not a directory".to_owned(),
        });
    }

    Ok(())
}

/// Loads the manifest index, logging manifests that were excluded.
fn load_index(dir: &Utf8Path) -> color_eyre::Result<Arc<ManifestIndex>> {
    let index = ManifestRegistry::from_dir(dir).manifests()?;
    if !index.failures().is_empty() {
        warn!(
            dir = %dir,
            excluded = index.failures().len(),
            "Some manifests were excluded, run `scaf status` for details"
        );
    }
    Ok(index)
}

/// The version this build installs by default.
fn current_version() -> Version {
    Version::new(env!("CARGO_PKG_VERSION"))
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Installs templates for `platforms` and records the project version.
///
/// # Errors
///
/// Returns an error if manifests cannot be loaded or reconciliation fails.
fn run_init(
    ctx: &Context,
    platforms: &[Platform],
    version: Option<Version>,
    options: ReconcileOptions,
) -> color_eyre::Result<()> {
    let selection: PlatformSelection = platforms.iter().copied().collect();
    let version = version.unwrap_or_else(current_version);
    let index = load_index(&ctx.manifests)?;
    let provider = DirectoryTemplateProvider::new(ctx.templates.clone());

    let report = init_project(&ctx.paths, &selection, &version, &index, &provider, options)?;
    info!(
        files = report.file_operations(),
        conflicts = report.conflicts.len(),
        "Init finished"
    );
    print_text(&report)
}

/// Upgrades the project to `to`, or to this build's version.
///
/// Prints the migration summary first. A range with breaking changes stops
/// here unless `force` is set or nothing would be written.
///
/// # Errors
///
/// Returns an error if state cannot be read, the range is breaking and not
/// forced, or reconciliation fails.
fn run_update(
    ctx: &Context,
    to: Option<Version>,
    dry_run: bool,
    force: bool,
    strict: bool,
    format: OutputFormat,
) -> color_eyre::Result<()> {
    let index = load_index(&ctx.manifests)?;
    let from = VersionStore::new(&ctx.paths)
        .read()?
        .unwrap_or_else(Version::zero);
    let target = to.unwrap_or_else(current_version);
    let summary = index.summary(&from, &target);

    if summary.breaking && !force && !dry_run {
        emit_summary(&summary, format)?;
        bail!(
            "{from} -> {target} contains breaking changes; review the guides above, \
             then re-run with --force"
        );
    }

    let policy = if strict {
        ConflictPolicy::Skip
    } else {
        load_config(&ctx.paths)?
            .map(|config| config.conflict_policy)
            .unwrap_or_default()
    };
    let selection = resolve_platforms(&ctx.paths)?.into_selection();
    let provider = DirectoryTemplateProvider::new(ctx.templates.clone());
    let options = ReconcileOptions::default()
        .with_dry_run(dry_run)
        .with_conflict_policy(policy);

    info!(from = %from, to = %target, platforms = %selection, dry_run, "Updating project");
    let report = Reconciler::new(&ctx.paths, &index, &provider)
        .with_options(options)
        .reconcile(&from, &target, &selection)?;

    match format {
        OutputFormat::Text => {
            if !summary.is_empty() {
                print_text(&summary)?;
            }
            print_text(&report)
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Output<'a> {
                summary: &'a MigrationSummary,
                report: &'a ReconcileReport,
            }
            print_json(&Output {
                summary: &summary,
                report: &report,
            })
        }
    }
}

/// Prints the plan and summary for a version range.
///
/// # Errors
///
/// Returns an error if manifests cannot be loaded.
fn run_plan(
    ctx: &Context,
    from: &Version,
    to: Option<Version>,
    format: OutputFormat,
) -> color_eyre::Result<()> {
    let index = load_index(&ctx.manifests)?;
    let target = to.unwrap_or_else(current_version);
    let plan = index.plan(from, &target);
    let summary = index.summary(from, &target);

    match format {
        OutputFormat::Text => {
            print_text(&plan)?;
            if !summary.is_empty() {
                print_text(&summary)?;
            }
            Ok(())
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Output<'a> {
                plan: &'a MigrationPlan,
                summary: &'a MigrationSummary,
            }
            print_json(&Output {
                plan: &plan,
                summary: &summary,
            })
        }
    }
}

/// Prints the project status and any excluded manifests.
///
/// # Errors
///
/// Returns an error if project state cannot be read.
fn run_status(ctx: &Context, format: OutputFormat) -> color_eyre::Result<()> {
    let index = load_index(&ctx.manifests)?;
    let status = ProjectStatus::collect(&ctx.paths, &index, &current_version())?;

    match format {
        OutputFormat::Text => print_text(&status)?,
        OutputFormat::Json => print_json(&status)?,
    }

    if !index.failures().is_empty() {
        let stderr = std::io::stderr();
        let mut handle = stderr.lock();
        writeln!(handle)?;
        writeln!(handle, "Excluded manifests ({}):", index.failures().len())?;
        for failure in index.failures() {
            writeln!(handle, "  {failure}")?;
        }
    }

    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn print_text(value: &impl Display) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{value}")?;
    Ok(())
}

fn print_json(value: &impl Serialize) -> color_eyre::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to serialize JSON: {}", e))?;
    print_text(&json)
}

fn emit_summary(summary: &MigrationSummary, format: OutputFormat) -> color_eyre::Result<()> {
    match format {
        OutputFormat::Text => print_text(summary),
        OutputFormat::Json => print_json(summary),
    }
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Route to appropriate command
    match &cli.command {
        Commands::Init {
            platforms,
            version,
            dry_run,
            strict,
        } => {
            let ctx = build_context(&cli, true)?;
            let policy = if *strict {
                ConflictPolicy::Skip
            } else {
                ConflictPolicy::default()
            };
            let options = ReconcileOptions::default()
                .with_dry_run(*dry_run)
                .with_conflict_policy(policy);
            run_init(&ctx, platforms, version.clone(), options)
        }
        Commands::Update {
            to,
            dry_run,
            force,
            strict,
            format,
        } => {
            let ctx = build_context(&cli, false)?;
            run_update(&ctx, to.clone(), *dry_run, *force, *strict, *format)
        }
        Commands::Plan { from, to, format } => {
            let ctx = build_context(&cli, true)?;
            run_plan(&ctx, from, to.clone(), *format)
        }
        Commands::Status { format } => {
            let ctx = build_context(&cli, false)?;
            run_status(&ctx, *format)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_init_platforms() {
        let cli = Cli::try_parse_from([
            "scaf",
            "init",
            "--platform",
            "claude",
            "--platform",
            "CURSOR",
            "--version",
            "0.3.0",
        ])
        .unwrap();
        let Commands::Init {
            platforms, version, ..
        } = cli.command
        else {
            panic!("expected init");
        };
        assert_eq!(platforms, [Platform::Claude, Platform::Cursor]);
        assert_eq!(version, Some(Version::new("0.3.0")));
    }

    #[test]
    fn test_init_rejects_unknown_platform() {
        let result = Cli::try_parse_from(["scaf", "init", "--platform", "vim"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_manifests_default_under_templates() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let cli = Cli::try_parse_from([
            "scaf",
            "status",
            "--path",
            root.as_str(),
            "--templates",
            "/opt/scaf/templates",
        ])
        .unwrap();
        let ctx = build_context(&cli, false).unwrap();
        assert_eq!(ctx.manifests, Utf8PathBuf::from("/opt/scaf/templates/manifests"));
        assert_eq!(ctx.paths.root(), root);
    }

    #[test]
    fn test_validate_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let missing = root.join("missing");
        let file = root.join("file.txt");
        std::fs::write(&file, "x").unwrap();

        assert!(validate_dir(&root, false).is_ok());
        assert!(validate_dir(&missing, true).is_ok());
        assert!(matches!(
            validate_dir(&missing, false),
            Err(ConfigError::InvalidPath { .. })
        ));
        assert!(matches!(
            validate_dir(&file, true),
            Err(ConfigError::InvalidPath { .. })
        ));
    }
}
