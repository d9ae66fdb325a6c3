//! Configuration types deserialized from `verdict.toml`.

use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

/// Default on-disk cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "./cache";

/// Default lifetime of an in-memory cache entry.
pub const DEFAULT_MEMORY_TTL: Duration = Duration::from_secs(3600);

/// The top-level configuration parsed from `verdict.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerdictConfig {
    /// Cache tier settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Options forwarded to the external compiler.
    #[serde(default)]
    pub compiler: CompilerOptions,
}

/// Settings for the two cache tiers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CacheConfig {
    /// Directory holding the `<key>.pkg` and `<key>.meta` sidecar files.
    pub cache_dir: PathBuf,
    /// How long a memory-tier entry is served before it is treated as absent.
    #[serde(rename = "memory_ttl_secs", deserialize_with = "duration_from_secs")]
    pub memory_ttl: Duration,
    /// How cache keys are derived from source sets.
    pub key_scheme: KeyScheme,
    /// Re-read the sources on a memory hit and discard the entry if any
    /// changed. When off, a memory hit is served until the TTL expires.
    pub revalidate_memory: bool,
}

impl CacheConfig {
    /// Creates a configuration rooted at `cache_dir` with default TTL and key scheme.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    /// Returns a copy with the memory TTL replaced.
    pub fn with_memory_ttl(mut self, ttl: Duration) -> Self {
        self.memory_ttl = ttl;
        self
    }

    /// Returns a copy with memory-hit revalidation switched on or off.
    pub fn with_revalidate_memory(mut self, revalidate: bool) -> Self {
        self.revalidate_memory = revalidate;
        self
    }

    /// Returns a copy with the key scheme replaced.
    pub fn with_key_scheme(mut self, scheme: KeyScheme) -> Self {
        self.key_scheme = scheme;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            memory_ttl: DEFAULT_MEMORY_TTL,
            key_scheme: KeyScheme::default(),
            revalidate_memory: true,
        }
    }
}

/// Cache key derivation scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScheme {
    /// First 16 hex characters of SHA-256 over the sorted, comma-joined identifiers.
    #[default]
    Sha256,
    /// Sorted identifiers joined with `_`, every character outside
    /// `[A-Za-z0-9_]` replaced by `_`. Variable length.
    Sanitized,
}

/// Options handed to an external compiler implementation when it is built.
///
/// These replace compiler switches that would otherwise be read from
/// process-wide properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CompilerOptions {
    /// Build the alpha network for rule evaluation.
    pub alpha_network: bool,
    /// Type-check inputs and outputs at evaluation time.
    pub runtime_type_check: bool,
    /// Tolerate recoverable model errors instead of rejecting the model.
    pub lenient_mode: bool,
    /// Compile expressions ahead of time rather than interpreting them.
    pub compiled_expressions: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            alpha_network: true,
            runtime_type_check: false,
            lenient_mode: true,
            compiled_expressions: true,
        }
    }
}

fn duration_from_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}
