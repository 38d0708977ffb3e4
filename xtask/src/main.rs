//! Build automation tasks for the scaf workspace.
//!
//! Run with: `cargo xt <command>`
//!
//! # Available Commands
//!
//! - `check`: Run all checks (fmt, clippy, test)
//! - `fmt`: Format code with rustfmt
//! - `lint`: Run clippy with all targets
//! - `test`: Run all tests
//! - `doc`: Build API documentation
//! - `validate-manifests`: Load a manifest directory and report problems

// xtask is a build tool - printing to stderr is expected
#![allow(clippy::print_stderr)]

use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use scaf_migrate::ManifestRegistry;
use xshell::{Shell, cmd};

/// Build automation for scaf
#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for scaf")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks (fmt --check, clippy, test)
    Check,
    /// Format code with rustfmt
    Fmt {
        /// Check formatting without modifying files
        #[arg(long)]
        check: bool,
    },
    /// Run clippy lints
    Lint {
        /// Automatically fix lint warnings
        #[arg(long)]
        fix: bool,
    },
    /// Run all tests
    Test {
        /// Run tests with release optimizations
        #[arg(long)]
        release: bool,
    },
    /// Generate documentation
    Doc {
        /// Open in browser after building
        #[arg(long)]
        open: bool,
    },
    /// Load every manifest in a directory and fail on any problem
    ValidateManifests {
        /// Manifest directory, relative to the workspace root
        #[arg(default_value = "templates/manifests")]
        dir: Utf8PathBuf,
    },
}

fn workspace_root() -> Result<Utf8PathBuf> {
    Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Utf8Path::to_path_buf)
        .context("xtask has no parent directory")
}

fn fmt(sh: &Shell, check: bool) -> Result<()> {
    let check = check.then_some("--check");
    cmd!(sh, "cargo fmt --all -- {check...}").run()?;
    Ok(())
}

fn lint(sh: &Shell, fix: bool) -> Result<()> {
    let fix: &[&str] = if fix { &["--fix", "--allow-dirty"] } else { &[] };
    cmd!(sh, "cargo clippy --workspace --all-targets {fix...} -- -D warnings").run()?;
    Ok(())
}

fn test(sh: &Shell, release: bool) -> Result<()> {
    let release = release.then_some("--release");
    cmd!(sh, "cargo test --workspace {release...}").run()?;
    Ok(())
}

fn doc(sh: &Shell, open: bool) -> Result<()> {
    let open = open.then_some("--open");
    cmd!(sh, "cargo doc --workspace --no-deps {open...}").run()?;
    Ok(())
}

fn validate_manifests(dir: &Utf8Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("manifest directory not found: {dir}");
    }

    let index = ManifestRegistry::from_dir(dir)
        .manifests()
        .with_context(|| format!("failed to load manifests from {dir}"))?;

    for manifest in index.iter() {
        eprintln!(
            "  ok {} ({} migrations{})",
            manifest.version,
            manifest.migrations.len(),
            if manifest.breaking { ", breaking" } else { "" }
        );
    }
    for failure in index.failures() {
        eprintln!("  error {failure}");
    }

    if !index.failures().is_empty() {
        bail!(
            "{} of {} manifests are invalid",
            index.failures().len(),
            index.len() + index.failures().len()
        );
    }
    eprintln!("{} manifests valid", index.len());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = workspace_root()?;
    let sh = Shell::new()?;
    sh.change_dir(&root);

    match cli.command {
        Commands::Check => {
            fmt(&sh, true)?;
            lint(&sh, false)?;
            test(&sh, false)
        }
        Commands::Fmt { check } => fmt(&sh, check),
        Commands::Lint { fix } => lint(&sh, fix),
        Commands::Test { release } => test(&sh, release),
        Commands::Doc { open } => doc(&sh, open),
        Commands::ValidateManifests { dir } => validate_manifests(&root.join(dir)),
    }
}
