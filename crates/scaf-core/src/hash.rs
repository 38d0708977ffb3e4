//! Content fingerprints and fast hash collection aliases.
//!
//! [`ContentHash`] is the SHA-256 digest of a file body, rendered as
//! lowercase hex. It is what the fingerprint store persists for every file
//! the tool writes, so it must be stable across platforms and releases.
//!
//! [`FxHashMap`] and [`FxHashSet`] are used for in-memory lookup tables
//! that are never persisted or shown to the user in iteration order.
//!
//! # Examples
//!
//! ```
//! use scaf_core::ContentHash;
//!
//! let hash = ContentHash::of("hello\n");
//! assert_eq!(hash.as_str().len(), 64);
//! assert!(hash.matches("hello\n"));
//! assert!(!hash.matches("hello"));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// SHA-256 digest of file content, as 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hashes the given content.
    #[must_use]
    pub fn of(content: impl AsRef<[u8]>) -> Self {
        let digest = Sha256::digest(content.as_ref());
        Self(format!("{digest:x}"))
    }

    /// Wraps an existing hex digest, normalising it to lowercase.
    ///
    /// # Examples
    ///
    /// ```
    /// use scaf_core::ContentHash;
    ///
    /// let upper = ContentHash::from_hex("ABCDEF");
    /// assert_eq!(upper.as_str(), "abcdef");
    /// ```
    #[must_use]
    pub fn from_hex(hex: &str) -> Self {
        Self(hex.trim().to_ascii_lowercase())
    }

    /// Returns the hex digest.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if `content` hashes to this digest.
    #[must_use]
    pub fn matches(&self, content: impl AsRef<[u8]>) -> bool {
        *self == Self::of(content)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
