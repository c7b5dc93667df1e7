//! Document version counter
//!
//! Every accepted mutation of a document produces exactly one new version.
//! Versions are per-link counters: they start at [`Version::INITIAL`], are
//! incremented once per accepted mutation, never decrease, and are never
//! reused for the same link.

use serde::{Deserialize, Serialize};

/// Version of a document
///
/// ## Invariants
///
/// - Monotonically increasing within a link
/// - Incremented exactly once per accepted mutation
/// - Idempotent no-op writes leave it unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Version assigned to a freshly created document
    pub const INITIAL: Version = Version(0);

    /// Create a version from a raw counter value
    pub const fn new(n: u64) -> Self {
        Version(n)
    }

    /// Get the numeric value
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Next version
    ///
    /// Saturates instead of wrapping, so a version can never go backwards.
    pub const fn increment(&self) -> Self {
        Version(self.0.saturating_add(1))
    }

    /// Check if this is the initial version
    #[inline]
    pub const fn is_initial(&self) -> bool {
        self.0 == Self::INITIAL.0
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::INITIAL
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(n: u64) -> Self {
        Version(n)
    }
}

impl From<Version> for u64 {
    fn from(v: Version) -> Self {
        v.0
    }
}
