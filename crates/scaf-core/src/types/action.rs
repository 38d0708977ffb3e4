//! File operations decided during reconciliation.

use serde::{Deserialize, Serialize};

/// What reconciliation does with one project file.
///
/// # Examples
///
/// ```
/// use scaf_core::FileAction;
///
/// assert!(FileAction::Create.is_change());
/// assert!(!FileAction::Skip.is_change());
/// assert_eq!(FileAction::Conflict.label(), "conflict");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum FileAction {
    /// The file is missing and will be written.
    Create,

    /// The file is pristine but its template changed; it will be overwritten.
    Update,

    /// Nothing to do: the file is current or holds a user edit that the
    /// template does not touch.
    Skip,

    /// The user edited the file and its template changed too.
    ///
    /// Resolved by backing up the user's copy before overwriting, or by
    /// leaving the file alone under the stricter policy.
    Conflict,

    /// The file is removed by a structural migration.
    Delete,
}

impl FileAction {
    /// Returns `true` if this action can modify the project.
    #[inline]
    #[must_use]
    pub const fn is_change(self) -> bool {
        !matches!(self, Self::Skip)
    }

    /// Returns a lowercase label for display.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Skip => "skip",
            Self::Conflict => "conflict",
            Self::Delete => "delete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_change() {
        assert!(FileAction::Create.is_change());
        assert!(FileAction::Update.is_change());
        assert!(FileAction::Conflict.is_change());
        assert!(FileAction::Delete.is_change());
        assert!(!FileAction::Skip.is_change());
    }

    #[test]
    fn test_serialization() {
        assert_eq!(
            serde_json::to_string(&FileAction::Conflict).unwrap(),
            r#""conflict""#
        );
        let parsed: FileAction = serde_json::from_str(r#""update""#).unwrap();
        assert_eq!(parsed, FileAction::Update);
    }
}
