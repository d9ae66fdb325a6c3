//! Cache key identity shared by the memory and disk tiers.

use std::fmt;

/// Deterministic short identifier derived from a [`SourceSet`](crate::SourceSet).
///
/// Normally 16 lowercase hex characters. Keys produced by the sanitized
/// fallback scheme are longer and have no fixed length, so nothing should
/// assume a width.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wraps an already-derived key string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
