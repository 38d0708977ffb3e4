//! Release identifiers and their ordering.
//!
//! Versions follow `MAJOR.MINOR.PATCH[-PRERELEASE]`. The ordering is lenient:
//! malformed numeric components degrade to `0` instead of being rejected, and
//! missing trailing components are treated as `0`.
//!
//! # Ordering rules
//!
//! 1. The numeric base (left of the first `-`) is compared component-wise.
//! 2. With equal bases, a release sorts after any pre-release of it.
//! 3. Pre-release identifiers are compared field by field (split on `.`):
//!    numeric fields compare by value and sort before alphanumeric ones,
//!    alphanumeric fields compare bytewise, and a shorter prefix sorts first.
//!
//! # Examples
//!
//! ```
//! use std::cmp::Ordering;
//! use scaf_core::compare_versions;
//!
//! assert_eq!(compare_versions("1.0.0-beta.1", "1.0.0"), Ordering::Less);
//! assert_eq!(compare_versions("1.0.0-beta.2", "1.0.0-beta.10"), Ordering::Less);
//! assert_eq!(compare_versions("1.0", "1.0.0"), Ordering::Equal);
//! ```

use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Compares two version strings.
///
/// This is a total order over all strings; see the module docs for the rules.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a_base, a_pre) = split_prerelease(a);
    let (b_base, b_pre) = split_prerelease(b);

    compare_base(a_base, b_base).then_with(|| compare_prerelease(a_pre, b_pre))
}

fn split_prerelease(version: &str) -> (&str, Option<&str>) {
    match version.trim().split_once('-') {
        Some((base, pre)) => (base, Some(pre)),
        None => (version.trim(), None),
    }
}

// Non-numeric components become the empty digit string, which is zero.
fn base_components(base: &str) -> SmallVec<[&str; 4]> {
    base.split('.')
        .map(|part| if is_numeric(part) { part } else { "" })
        .collect()
}

fn compare_base(a: &str, b: &str) -> Ordering {
    let a = base_components(a);
    let b = base_components(b);
    let len = a.len().max(b.len());

    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or_default();
            let y = b.get(i).copied().unwrap_or_default();
            compare_numeric(x, y)
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn compare_prerelease(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => compare_identifiers(a, b),
    }
}

fn compare_identifiers(a: &str, b: &str) -> Ordering {
    let mut a_fields = a.split('.');
    let mut b_fields = b.split('.');

    loop {
        match (a_fields.next(), b_fields.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = compare_field(x, y);
                if ord.is_ne() {
                    return ord;
                }
            }
        }
    }
}

fn is_numeric(field: &str) -> bool {
    !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit())
}

fn compare_field(x: &str, y: &str) -> Ordering {
    match (is_numeric(x), is_numeric(y)) {
        (true, true) => compare_numeric(x, y),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => x.as_bytes().cmp(y.as_bytes()),
    }
}

// Digit strings of any length: fewer significant digits means smaller.
fn compare_numeric(x: &str, y: &str) -> Ordering {
    let x = x.trim_start_matches('0');
    let y = y.trim_start_matches('0');
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}

/// A release identifier such as `0.3.0` or `1.0.0-beta.2`.
///
/// Equality and ordering follow [`compare_versions`], so `"1.0"` and
/// `"1.0.0"` are equal. `Version` deliberately does not implement [`Hash`];
/// use ordered collections keyed by it.
///
/// # Examples
///
/// ```
/// use scaf_core::Version;
///
/// let beta = Version::new("0.3.0-beta.1");
/// let release = Version::new("0.3.0");
/// assert!(beta < release);
/// assert!(beta.is_prerelease());
/// assert_eq!(Version::new("1.0"), Version::new("1.0.0"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Creates a version from its textual form. Surrounding whitespace is removed.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        let raw: String = version.into();
        let trimmed = raw.trim();
        if trimmed.len() == raw.len() {
            Self(raw)
        } else {
            Self(trimmed.to_owned())
        }
    }

    /// The version every project is assumed to start from.
    #[must_use]
    pub fn zero() -> Self {
        Self("0.0.0".to_owned())
    }

    /// Returns the textual form.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the version can be used as a single path component.
    ///
    /// Only ASCII alphanumerics, `.`, `+` and `-` are allowed, and the
    /// version must not be `.` or `..`.
    ///
    /// # Examples
    ///
    /// ```
    /// use scaf_core::Version;
    ///
    /// assert!(Version::new("1.0.0-beta.2+build.5").is_path_safe());
    /// assert!(!Version::new("../../escaped").is_path_safe());
    /// assert!(!Version::new("..").is_path_safe());
    /// ```
    #[must_use]
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && self.0 != "."
            && self.0 != ".."
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'+' | b'-'))
    }

    /// Returns `true` if the version carries a pre-release suffix.
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        self.0.contains('-')
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_versions(&self.0, &other.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Version {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
