//! Migration aggregation over a version range.
//!
//! A range `(from, to]` selects every indexed version `v` with
//! `from < v <= to`. The structural [`MigrationPlan`] concatenates the items
//! of those manifests oldest version first, keeping authored order within a
//! manifest. The [`MigrationSummary`] folds the non-structural metadata of
//! the same versions.
//!
//! A range with `from >= to` selects nothing; downgrades never produce
//! reverse migrations.

use std::fmt;

use scaf_core::{MigrationItem, MigrationManifest, Version};
use serde::Serialize;

use crate::registry::ManifestIndex;

/// One migration item tagged with the version that introduced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMigration {
    /// The manifest version the item comes from.
    pub version: Version,
    /// The structural change.
    pub item: MigrationItem,
}

/// The ordered structural changes needed to move from one version to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationPlan {
    /// Version the project is currently at.
    pub from: Version,
    /// Version the project is moving to.
    pub to: Version,
    /// Items in application order.
    pub steps: Vec<PlannedMigration>,
}

impl MigrationPlan {
    /// Iterates over the items in application order.
    pub fn items(&self) -> impl Iterator<Item = &MigrationItem> {
        self.steps.iter().map(|step| &step.item)
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if nothing needs to move.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for MigrationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "No migrations from {} to {}", self.from, self.to);
        }
        let noun = if self.steps.len() == 1 { "step" } else { "steps" };
        write!(
            f,
            "Migrations from {} to {} ({} {noun}):",
            self.from,
            self.to,
            self.steps.len()
        )?;
        for step in &self.steps {
            write!(f, "\n  [{}] {}", step.version, step.item)?;
        }
        Ok(())
    }
}

/// Upgrade instructions attached to one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationGuide {
    /// The manifest version.
    pub version: Version,
    /// Human-readable guide, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guide: Option<String>,
    /// Assistant instructions, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_instructions: Option<String>,
}

/// Non-structural metadata folded over a version range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    /// Version the project is currently at.
    pub from: Version,
    /// Version the project is moving to.
    pub to: Version,
    /// Changelog lines, each prefixed `v{version}: `.
    pub changelog: Vec<String>,
    /// `true` if any version in range is breaking.
    pub breaking: bool,
    /// `true` if any version in range recommends a full migration.
    pub recommend_migrate: bool,
    /// Guides in version order. Versions with neither a guide nor assistant
    /// instructions are omitted.
    pub guides: Vec<MigrationGuide>,
}

impl MigrationSummary {
    /// Returns `true` if the range carries no metadata worth showing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changelog.is_empty()
            && self.guides.is_empty()
            && !self.breaking
            && !self.recommend_migrate
    }
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Changes from {} to {}:", self.from, self.to)?;
        if self.changelog.is_empty() {
            write!(f, "\n  (no changelog entries)")?;
        }
        for line in &self.changelog {
            write!(f, "\n  {line}")?;
        }
        if self.breaking {
            write!(f, "\nBreaking changes: yes")?;
        }
        if self.recommend_migrate {
            write!(f, "\nA full migration is recommended")?;
        }
        for guide in &self.guides {
            if let Some(text) = &guide.guide {
                write!(f, "\nGuide for v{}: {text}", guide.version)?;
            }
        }
        Ok(())
    }
}

impl ManifestIndex {
    /// Iterates over manifests with `from < version <= to`, oldest first.
    pub fn applicable<'a>(
        &'a self,
        from: &'a Version,
        to: &'a Version,
    ) -> impl Iterator<Item = &'a MigrationManifest> + 'a {
        self.iter()
            .filter(move |manifest| manifest.version > *from && manifest.version <= *to)
    }

    /// Returns the ordered structural migrations for `from -> to`.
    ///
    /// # Examples
    ///
    /// ```
    /// use scaf_core::{MigrationItem, MigrationManifest, Version};
    /// use scaf_migrate::{ManifestRegistry, StaticSource};
    ///
    /// let registry = ManifestRegistry::new(StaticSource::from_iter([
    ///     MigrationManifest::new("0.2.0").with_item(MigrationItem::rename("a.md", "b.md")),
    ///     MigrationManifest::new("0.3.0").with_item(MigrationItem::delete("c.md")),
    /// ]));
    /// let index = registry.manifests()?;
    ///
    /// let plan = index.plan(&Version::new("0.1.0"), &Version::new("0.3.0"));
    /// let items: Vec<_> = plan.items().cloned().collect();
    /// assert_eq!(
    ///     items,
    ///     [MigrationItem::rename("a.md", "b.md"), MigrationItem::delete("c.md")]
    /// );
    ///
    /// assert!(index.plan(&Version::new("0.3.0"), &Version::new("0.1.0")).is_empty());
    /// # Ok::<(), scaf_migrate::MigrateError>(())
    /// ```
    #[must_use]
    pub fn plan(&self, from: &Version, to: &Version) -> MigrationPlan {
        let steps = self
            .applicable(from, to)
            .flat_map(|manifest| {
                manifest.migrations.iter().map(|item| PlannedMigration {
                    version: manifest.version.clone(),
                    item: item.clone(),
                })
            })
            .collect();

        MigrationPlan {
            from: from.clone(),
            to: to.clone(),
            steps,
        }
    }

    /// Folds changelog, flags, and guides for `from -> to`.
    #[must_use]
    pub fn summary(&self, from: &Version, to: &Version) -> MigrationSummary {
        let mut summary = MigrationSummary {
            from: from.clone(),
            to: to.clone(),
            changelog: Vec::new(),
            breaking: false,
            recommend_migrate: false,
            guides: Vec::new(),
        };

        for manifest in self.applicable(from, to) {
            if let Some(text) = manifest
                .changelog
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
            {
                summary.changelog.push(format!("v{}: {text}", manifest.version));
            }
            summary.breaking |= manifest.breaking;
            summary.recommend_migrate |= manifest.recommend_migrate;
            if manifest.migration_guide.is_some() || manifest.ai_instructions.is_some() {
                summary.guides.push(MigrationGuide {
                    version: manifest.version.clone(),
                    guide: manifest.migration_guide.clone(),
                    ai_instructions: manifest.ai_instructions.clone(),
                });
            }
        }

        summary
    }

    /// Returns `true` if `from -> to` has at least one structural migration.
    #[must_use]
    pub fn has_pending(&self, from: &Version, to: &Version) -> bool {
        self.applicable(from, to)
            .any(|manifest| !manifest.migrations.is_empty())
    }

    /// Returns `true` if any indexed manifest carries a structural migration.
    #[must_use]
    pub fn has_any(&self) -> bool {
        self.iter().any(|manifest| !manifest.migrations.is_empty())
    }

    /// Every migration item across all versions, oldest version first.
    ///
    /// Used to find leftovers of migrations a project skipped over.
    #[must_use]
    pub fn all_items(&self) -> Vec<PlannedMigration> {
        self.iter()
            .flat_map(|manifest| {
                manifest.migrations.iter().map(|item| PlannedMigration {
                    version: manifest.version.clone(),
                    item: item.clone(),
                })
            })
            .collect()
    }
}
