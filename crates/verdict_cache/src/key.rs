//! Cache key derivation.
//!
//! A key depends only on the membership of the source set, never on the
//! order the caller listed the sources in.

use sha2::{Digest, Sha256};
use verdict_common::{CacheKey, SourceSet};
use verdict_config::KeyScheme;

/// Number of hex characters kept from the SHA-256 digest.
const KEY_HEX_LEN: usize = 16;

/// Delimiter between identifiers in the hashed input.
const KEY_DELIMITER: &str = ",";

/// Key used by the sanitized scheme for the empty source set.
const EMPTY_SANITIZED_KEY: &str = "_";

/// Derives [`CacheKey`]s according to a [`KeyScheme`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyDeriver {
    scheme: KeyScheme,
}

impl KeyDeriver {
    /// Creates a deriver for the given scheme.
    pub fn new(scheme: KeyScheme) -> Self {
        Self { scheme }
    }

    /// The scheme in use.
    pub fn scheme(&self) -> KeyScheme {
        self.scheme
    }

    /// Derives the key for a source set.
    pub fn derive(&self, sources: &SourceSet) -> CacheKey {
        match self.scheme {
            KeyScheme::Sha256 => sha256_key(sources),
            KeyScheme::Sanitized => sanitized_key(sources),
        }
    }
}

/// Derives the default (SHA-256) key for identifiers in any order.
///
/// Duplicates collapse as they do in a [`SourceSet`], so this agrees with
/// [`KeyDeriver::derive`]. Identifiers are not validated.
pub fn derive_key<S: AsRef<str>>(sources: &[S]) -> CacheKey {
    let mut sorted: Vec<&str> = sources.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();
    sorted.dedup();
    digest_key(&sorted.join(KEY_DELIMITER))
}

fn sha256_key(sources: &SourceSet) -> CacheKey {
    digest_key(&sources.join(KEY_DELIMITER))
}

fn digest_key(joined: &str) -> CacheKey {
    let digest = Sha256::digest(joined.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(KEY_HEX_LEN);
    CacheKey::new(hex)
}

fn sanitized_key(sources: &SourceSet) -> CacheKey {
    if sources.is_empty() {
        return CacheKey::new(EMPTY_SANITIZED_KEY);
    }
    let key: String = sources
        .join("_")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    CacheKey::new(key)
}
