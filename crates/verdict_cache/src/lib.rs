//! Two-tier cache for compiled decision packages.
//!
//! A [`BuildCoordinator`] maps a [`SourceSet`] of decision-model files to a
//! loaded package. Lookups go memory tier, then disk tier, then a fresh
//! compile through the external [`PackageCompiler`]. The disk tier stores
//! only the compiler-issued [`PackageHandle`] plus an exact snapshot of the
//! sources it was built from, so a changed source is always detected.

#![warn(missing_docs)]

pub mod compiler;
pub mod coordinator;
pub mod disk;
pub mod error;
pub mod key;
pub mod memory;
pub mod metadata;
pub mod provider;
pub mod snapshot;

pub use compiler::{CompileRequest, Package, PackageCompiler, PackageHandle, SourceUnit};
pub use coordinator::{BuildCoordinator, CacheStats, CachedPackage, PrecompileReport};
pub use disk::{DiskCacheStore, DiskEntry, DiskStats};
pub use error::{CacheError, CompilerError, ResolveError, SourceError};
pub use key::{derive_key, KeyDeriver};
pub use memory::MemoryCache;
pub use provider::{FsSourceProvider, SourceProvider};
pub use snapshot::SourceSnapshot;

pub use verdict_common::{CacheKey, ContentHash, SourceSet, SourceSetError};
pub use verdict_config::{CacheConfig, CompilerOptions, KeyScheme};
