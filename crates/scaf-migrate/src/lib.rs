//! Migration manifest registry and upgrade planning.
//!
//! Every released version of the tool may ship a manifest describing the
//! structural changes (renames, deletions) a project needs when upgrading
//! past it. This crate loads those manifests and answers "what has to
//! happen between version A and version B".
//!
//! # Overview
//!
//! - [`ManifestSource`]: where manifests come from ([`DirectorySource`],
//!   [`StaticSource`])
//! - [`ManifestRegistry`]: loads a source once and memoises the result
//! - [`ManifestIndex`]: the loaded manifests ordered by version, plus the
//!   aggregation queries ([`plan`](ManifestIndex::plan),
//!   [`summary`](ManifestIndex::summary),
//!   [`has_pending`](ManifestIndex::has_pending))
//!
//! # Example
//!
//! ```
//! use scaf_core::Version;
//! use scaf_migrate::{ManifestRegistry, StaticSource};
//!
//! let registry = ManifestRegistry::new(
//!     StaticSource::new()
//!         .with_json(
//!             "0.2.0.json",
//!             r#"{"version": "0.2.0", "migrations": [{"type": "delete", "from": "old.md"}]}"#,
//!         )
//!         .with_json("broken.json", "{"),
//! );
//!
//! let index = registry.manifests()?;
//! assert_eq!(index.len(), 1);
//! assert_eq!(index.failures().len(), 1);
//!
//! let plan = index.plan(&Version::new("0.1.0"), &Version::new("0.2.0"));
//! assert_eq!(plan.len(), 1);
//! # Ok::<(), scaf_migrate::MigrateError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ManifestRegistry
//!     │
//!     ├── ManifestSource (DirectorySource | StaticSource)
//!     │       │
//!     │       └── parse_manifest (serde_json + validate)
//!     │
//!     └── RwLock<Option<Arc<ManifestIndex>>>
//!             │
//!             └── plan / summary / has_pending / all_items
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod error;
mod plan;
mod registry;
mod source;

pub use error::MigrateError;
pub use plan::{MigrationGuide, MigrationPlan, MigrationSummary, PlannedMigration};
pub use registry::{ManifestIndex, ManifestRegistry};
pub use source::{
    DirectorySource, LoadedManifest, ManifestSource, SourceLoad, StaticSource, parse_manifest,
};
