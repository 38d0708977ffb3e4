//! Template reconciliation and project state for the scaf tool.
//!
//! This crate brings a scaffolded project up to date with the current
//! template set without clobbering user edits.
//!
//! # Overview
//!
//! - [`Reconciler`]: applies structural migrations, then diffs templates
//!   against the project and writes what changed
//! - [`FingerprintStore`]: content hashes of tool-written files, used to
//!   tell pristine files from user edits
//! - [`VersionStore`] and [`resolve_platforms`]: the rest of the persisted
//!   project state
//! - [`TemplateProvider`]: where templates come from
//!   ([`DirectoryTemplateProvider`], [`StaticTemplateProvider`])
//! - [`init_project`] and [`ProjectStatus`]: the init and status commands
//!
//! # Example
//!
//! ```no_run
//! use camino::Utf8Path;
//! use scaf_core::{ProjectPaths, Version};
//! use scaf_migrate::ManifestRegistry;
//! use scaf_sync::{
//!     DirectoryTemplateProvider, ReconcileOptions, Reconciler, VersionStore, resolve_platforms,
//! };
//!
//! let paths = ProjectPaths::new(".");
//! let registry = ManifestRegistry::from_dir(Utf8Path::new("templates/manifests"));
//! let index = registry.manifests()?;
//! let provider = DirectoryTemplateProvider::new("templates");
//!
//! let current = VersionStore::new(&paths).read()?.unwrap_or_else(Version::zero);
//! let selection = resolve_platforms(&paths)?.into_selection();
//! let report = Reconciler::new(&paths, &index, &provider)
//!     .with_options(ReconcileOptions::default().with_dry_run(true))
//!     .reconcile(&current, &Version::new("0.4.0"), &selection)?;
//! println!("{report}");
//! # Ok::<(), scaf_sync::SyncError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! Reconciler::reconcile
//!     │
//!     ├── ManifestIndex::plan (scaf-migrate)
//!     ├── TemplateProvider::templates (common + selected platforms)
//!     ├── FingerprintStore::load
//!     │
//!     ├── Pass
//!     │     ├── apply_migration (rename / delete, through ProjectView)
//!     │     └── reconcile_template (decision table)
//!     │
//!     ├── FingerprintStore::save (atomic)
//!     └── VersionStore::write (unless downgrade)
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod apply;
mod error;
mod fingerprint;
mod fsio;
mod init;
mod reconcile;
mod report;
mod state;
mod status;
mod templates;
mod view;

pub use error::SyncError;
pub use fingerprint::FingerprintStore;
pub use fsio::write_atomic;
pub use init::init_project;
pub use reconcile::{ReconcileOptions, Reconciler};
pub use report::{
    Conflict, ReconcileReport, RenamedPath, SkipReason, SkippedPath, VersionOutcome,
};
pub use state::{
    PlatformResolution, VersionStore, infer_platforms, load_config, resolve_platforms, save_config,
};
pub use status::ProjectStatus;
pub use templates::{
    COMMON_DIR, DirectoryTemplateProvider, Placeholders, StaticTemplateProvider, TemplateProvider,
};
pub use view::ProjectView;
