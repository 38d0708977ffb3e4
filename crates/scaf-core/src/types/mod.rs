//! Domain types for the scaf tool.
//!
//! # Module Organization
//!
//! - [`version`] - Release identifiers and their ordering
//! - [`migration`] - Structural migration items and per-version manifests
//! - [`platform`] - Supported integrations and a project's selection of them
//! - [`template`] - Resolved template files
//! - [`action`] - Per-file reconciliation actions
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use scaf_core::{MigrationItem, Platform, Version};
//! ```

mod action;
mod migration;
mod platform;
mod template;
mod version;

pub use action::FileAction;
pub use migration::{MigrationItem, MigrationKind, MigrationManifest};
pub use platform::{Platform, PlatformSelection};
pub use template::TemplateFile;
pub use version::{Version, compare_versions};
