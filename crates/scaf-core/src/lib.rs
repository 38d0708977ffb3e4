//! Core types, errors, and version ordering for the scaf tool.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`Version`] and [`compare_versions`], the total order over release identifiers
//! - Migration data ([`MigrationItem`], [`MigrationManifest`])
//! - Platform and template types ([`Platform`], [`PlatformSelection`], [`TemplateFile`])
//! - [`ContentHash`] fingerprints and the `FxHashMap`/`FxHashSet` aliases
//! - Project layout and configuration ([`ProjectPaths`], [`ProjectConfig`])
//! - Error types ([`ConfigError`], [`ManifestError`])

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod types;

pub use config::{ConflictPolicy, ProjectConfig, ProjectPaths};
pub use error::{ConfigError, ManifestError};
pub use hash::{ContentHash, FxHashMap, FxHashSet};
pub use types::{
    FileAction, MigrationItem, MigrationKind, MigrationManifest, Platform, PlatformSelection,
    TemplateFile, Version, compare_versions,
};
