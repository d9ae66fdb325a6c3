//! High-level cache orchestrator.
//!
//! [`BuildCoordinator`] ties together key derivation, the memory tier, the
//! disk tier and the external compiler. A lookup tries memory, then disk
//! (validated against the live sources), then builds from source.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use verdict_common::{CacheKey, SourceSet};
use verdict_config::CacheConfig;

use crate::compiler::{CompileRequest, Package, PackageCompiler, PackageHandle};
use crate::disk::DiskCacheStore;
use crate::error::{CompilerError, ResolveError};
use crate::key::KeyDeriver;
use crate::memory::MemoryCache;
use crate::provider::SourceProvider;
use crate::snapshot::SourceSnapshot;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries in the memory tier, expired ones included.
    pub memory_entries: usize,
    /// Handle files in the disk tier.
    pub disk_entries: u64,
    /// Total bytes of files in the cache directory.
    pub disk_bytes: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "memory={} entries, disk={} entries ({:.2} MB)",
            self.memory_entries,
            self.disk_entries,
            self.disk_bytes as f64 / BYTES_PER_MB
        )
    }
}

/// Outcome of [`BuildCoordinator::precompile`].
#[derive(Debug, Default)]
pub struct PrecompileReport {
    /// Source sets that resolved, with the time each took.
    pub resolved: Vec<(SourceSet, Duration)>,
    /// Source sets that failed, with their errors.
    pub failed: Vec<(SourceSet, ResolveError)>,
}

impl PrecompileReport {
    /// Returns `true` if every source set resolved.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A memory-tier entry: the shared package and the sources it was built from.
pub struct CachedPackage<T> {
    /// The loaded package.
    pub package: Arc<T>,
    /// Snapshot used to revalidate the entry on a hit.
    pub snapshot: SourceSnapshot,
}

/// Result of consulting the disk tier.
enum DiskLookup<T> {
    Hit(Arc<T>, SourceSnapshot),
    /// The entry is valid but the compiler no longer knows its handle.
    Unloadable(PackageHandle),
    Miss,
}

/// Resolves source sets to loaded packages through the two cache tiers.
///
/// Every method takes `&self` and is safe to call from many threads. No
/// lock is held while reading sources, touching the disk or calling the
/// compiler, so two threads that miss on the same key at the same moment
/// may both build it. Both results come from identical sources and are
/// interchangeable; the last disk and memory write wins. Callers that need
/// at most one build per key can serialize on the key before calling
/// [`resolve`](Self::resolve).
pub struct BuildCoordinator<C: PackageCompiler, P> {
    config: CacheConfig,
    deriver: KeyDeriver,
    memory: MemoryCache<CachedPackage<C::Package>>,
    disk: DiskCacheStore,
    compiler: C,
    sources: P,
}

impl<C, P> BuildCoordinator<C, P>
where
    C: PackageCompiler,
    P: SourceProvider,
{
    /// Creates a coordinator. The cache directory is created on first write.
    pub fn new(config: CacheConfig, compiler: C, sources: P) -> Self {
        Self {
            deriver: KeyDeriver::new(config.key_scheme),
            memory: MemoryCache::new(config.memory_ttl),
            disk: DiskCacheStore::new(&config.cache_dir),
            config,
            compiler,
            sources,
        }
    }

    /// Returns the package for `sources`, building it if no valid cached
    /// copy exists.
    ///
    /// The returned package is shared with the memory tier and with other
    /// callers. Use [`session`](Self::session) for per-caller state.
    pub fn resolve(&self, sources: &SourceSet) -> Result<Arc<C::Package>, ResolveError> {
        let key = self.deriver.derive(sources);

        if let Some(cached) = self.memory.get(&key) {
            if self.memory_entry_is_fresh(&cached, sources) {
                tracing::debug!(%key, %sources, "memory cache hit");
                return Ok(Arc::clone(&cached.package));
            }
            tracing::debug!(%key, %sources, "memory cache entry is stale");
        }

        let reuse = match self.lookup_disk(&key, sources) {
            DiskLookup::Hit(package, snapshot) => {
                tracing::debug!(%key, %sources, "disk cache hit");
                self.remember(key, Arc::clone(&package), snapshot);
                return Ok(package);
            }
            DiskLookup::Unloadable(handle) => Some(handle),
            DiskLookup::Miss => None,
        };

        self.build(key, sources, reuse.as_ref())
    }

    /// [`resolve`](Self::resolve) for identifiers in any order.
    pub fn resolve_ids<I, S>(&self, ids: I) -> Result<Arc<C::Package>, ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resolve(&SourceSet::new(ids)?)
    }

    /// [`resolve`](Self::resolve) for a single source.
    pub fn resolve_one(&self, id: &str) -> Result<Arc<C::Package>, ResolveError> {
        self.resolve(&SourceSet::single(id)?)
    }

    /// Resolves `sources` and opens a new session on the package.
    pub fn session(
        &self,
        sources: &SourceSet,
    ) -> Result<<C::Package as Package>::Session, ResolveError> {
        Ok(self.resolve(sources)?.new_session())
    }

    /// Resolves each source set in turn so later lookups are warm.
    ///
    /// A failing set is recorded and does not stop the others.
    pub fn precompile(&self, sets: &[SourceSet]) -> PrecompileReport {
        let mut report = PrecompileReport::default();
        for sources in sets {
            let started = Instant::now();
            match self.resolve(sources) {
                Ok(_) => {
                    let elapsed = started.elapsed();
                    tracing::info!(%sources, elapsed_ms = elapsed.as_millis() as u64, "precompiled");
                    report.resolved.push((sources.clone(), elapsed));
                }
                Err(e) => {
                    tracing::warn!(%sources, error = %e, "precompile failed");
                    report.failed.push((sources.clone(), e));
                }
            }
        }
        report
    }

    /// Drops every memory-tier entry. The disk tier is untouched.
    pub fn clear_memory(&self) {
        self.memory.clear();
        tracing::debug!("cleared memory cache");
    }

    /// Deletes every disk-tier entry, returning the number of files removed.
    /// The memory tier is untouched.
    pub fn clear_disk(&self) -> usize {
        let removed = self.disk.clear_all();
        tracing::debug!(removed, dir = %self.disk.dir().display(), "cleared disk cache");
        removed
    }

    /// Clears the memory tier, then the disk tier.
    pub fn clear_all(&self) {
        self.clear_memory();
        self.clear_disk();
    }

    /// Best-effort occupancy of both tiers.
    pub fn stats(&self) -> CacheStats {
        let disk = self.disk.stats();
        CacheStats {
            memory_entries: self.memory.len(),
            disk_entries: disk.entries,
            disk_bytes: disk.bytes,
        }
    }

    /// The cache key `sources` maps to.
    pub fn key_for(&self, sources: &SourceSet) -> CacheKey {
        self.deriver.derive(sources)
    }

    /// The configuration this coordinator was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The external compiler.
    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// The source provider.
    pub fn source_provider(&self) -> &P {
        &self.sources
    }

    /// The memory tier.
    pub fn memory(&self) -> &MemoryCache<CachedPackage<C::Package>> {
        &self.memory
    }

    /// The disk tier.
    pub fn disk(&self) -> &DiskCacheStore {
        &self.disk
    }

    /// Sanitized keys can collide, so the source set is always compared.
    /// Only the content re-read is gated on `revalidate_memory`.
    fn memory_entry_is_fresh(
        &self,
        cached: &CachedPackage<C::Package>,
        sources: &SourceSet,
    ) -> bool {
        if cached.snapshot.sources() != sources {
            return false;
        }
        !self.config.revalidate_memory || cached.snapshot.is_valid(&self.sources, sources)
    }

    fn lookup_disk(&self, key: &CacheKey, sources: &SourceSet) -> DiskLookup<C::Package> {
        if !self.disk.exists(key) {
            tracing::debug!(%key, %sources, "disk cache miss");
            return DiskLookup::Miss;
        }

        let entry = match self.disk.read(key) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(%key, error = %e, "ignoring unreadable disk cache entry");
                return DiskLookup::Miss;
            }
        };

        if !entry.snapshot.is_valid(&self.sources, sources) {
            tracing::debug!(%key, %sources, "disk cache entry is stale");
            return DiskLookup::Miss;
        }

        match self.compiler.load(&entry.handle) {
            Ok(package) => DiskLookup::Hit(Arc::new(package), entry.snapshot),
            Err(e) => {
                tracing::warn!(
                    %key,
                    handle = %entry.handle,
                    error = %e,
                    "cached handle no longer loads, rebuilding from source"
                );
                DiskLookup::Unloadable(entry.handle)
            }
        }
    }

    fn build(
        &self,
        key: CacheKey,
        sources: &SourceSet,
        reuse_handle: Option<&PackageHandle>,
    ) -> Result<Arc<C::Package>, ResolveError> {
        let started = Instant::now();
        let snapshot = SourceSnapshot::capture(&self.sources, sources)?;
        let units = snapshot.to_units();

        let build_failure = |source: CompilerError| {
            tracing::warn!(%key, %sources, error = %source, "package build failed");
            ResolveError::BuildFailure {
                sources: sources.clone(),
                source,
            }
        };
        let handle = self
            .compiler
            .compile(CompileRequest {
                sources: &units,
                reuse_handle,
            })
            .map_err(build_failure)?;
        let package = Arc::new(self.compiler.load(&handle).map_err(build_failure)?);

        // Disk first so a memory entry always has a disk counterpart when the
        // write succeeds. A failed write only costs a rebuild after restart.
        if let Err(e) = self.disk.write(&key, &handle, &snapshot) {
            tracing::warn!(%key, error = %e, "failed to persist package handle");
        }
        tracing::info!(
            %key,
            %sources,
            %handle,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "built package"
        );
        self.remember(key, Arc::clone(&package), snapshot);
        Ok(package)
    }

    fn remember(&self, key: CacheKey, package: Arc<C::Package>, snapshot: SourceSnapshot) {
        self.memory
            .put(key, Arc::new(CachedPackage { package, snapshot }));
    }
}
