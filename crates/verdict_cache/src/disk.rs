//! On-disk tier: one `<key>.pkg` handle file and one `<key>.meta` snapshot
//! file per cache key, both directly under the cache directory.
//!
//! Each file is written to a temporary file in the same directory and
//! renamed into place, metadata first. The metadata repeats the handle, and
//! a read whose `.pkg` disagrees with its `.meta` is reported as corrupt, so
//! interleaved writers or a read racing a write never yield a mismatched
//! pair.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use verdict_common::CacheKey;

use crate::compiler::PackageHandle;
use crate::error::CacheError;
use crate::metadata;
use crate::snapshot::SourceSnapshot;

/// Extension of the handle sidecar file.
pub const HANDLE_EXT: &str = "pkg";

/// Extension of the metadata sidecar file.
pub const META_EXT: &str = "meta";

/// Prefix `tempfile` gives in-flight writes.
const TEMP_PREFIX: &str = ".tmp";

/// A disk entry as read back from its sidecar files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskEntry {
    /// The compiler-issued handle.
    pub handle: PackageHandle,
    /// The sources the handle was built from.
    pub snapshot: SourceSnapshot,
}

/// Best-effort size of the disk tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskStats {
    /// Number of `.pkg` files.
    pub entries: u64,
    /// Total size in bytes of every regular file in the cache directory.
    pub bytes: u64,
}

/// Reads and writes sidecar file pairs in a cache directory.
///
/// The directory may be shared between processes.
#[derive(Debug, Clone)]
pub struct DiskCacheStore {
    dir: PathBuf,
}

impl DiskCacheStore {
    /// Creates a store rooted at `dir`. Nothing is created until the first write.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the cache directory if it does not exist.
    pub fn ensure_dir(&self) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| CacheError::Io {
            path: self.dir.clone(),
            source: e,
        })
    }

    /// Path of the handle file for `key`.
    pub fn handle_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.{HANDLE_EXT}"))
    }

    /// Path of the metadata file for `key`.
    pub fn meta_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.{META_EXT}"))
    }

    /// Returns `true` if both sidecar files exist for `key`.
    pub fn exists(&self, key: &CacheKey) -> bool {
        self.handle_path(key).is_file() && self.meta_path(key).is_file()
    }

    /// Persists `handle` and `snapshot` under `key`, replacing any existing entry.
    pub fn write(
        &self,
        key: &CacheKey,
        handle: &PackageHandle,
        snapshot: &SourceSnapshot,
    ) -> Result<(), CacheError> {
        self.ensure_dir()?;
        let meta = metadata::encode(handle, snapshot);
        self.write_atomic(&self.meta_path(key), meta.as_bytes())?;
        self.write_atomic(&self.handle_path(key), handle.as_str().as_bytes())
    }

    /// Reads the entry stored under `key`.
    ///
    /// Fails with [`CacheError::CorruptEntry`] if either file is missing,
    /// unreadable or malformed, or if the handle file does not hold the
    /// handle recorded in the metadata.
    pub fn read(&self, key: &CacheKey) -> Result<DiskEntry, CacheError> {
        let meta_path = self.meta_path(key);
        let text = read_sidecar(&meta_path)?;
        let entry = metadata::decode(&meta_path, &text)?;

        let handle_path = self.handle_path(key);
        let stored = read_sidecar(&handle_path)?;
        if stored.is_empty() {
            return Err(CacheError::CorruptEntry {
                path: handle_path,
                reason: "empty handle".to_string(),
            });
        }
        if stored != entry.handle.as_str() {
            return Err(CacheError::CorruptEntry {
                path: handle_path,
                reason: format!(
                    "handle {stored:?} does not match metadata handle {:?}",
                    entry.handle.as_str()
                ),
            });
        }
        Ok(entry)
    }

    /// Removes the entry stored under `key`. Missing files are not an error.
    pub fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        remove_if_present(&self.handle_path(key))?;
        remove_if_present(&self.meta_path(key))
    }

    /// Removes every sidecar file (and stray temporary file) in the cache
    /// directory. Files that cannot be removed are logged and skipped.
    ///
    /// Returns the number of files removed.
    pub fn clear_all(&self) -> usize {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return 0,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "failed to list disk cache");
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !is_cache_file(&path) {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to delete cache file");
                }
            }
        }
        removed
    }

    /// Counts entries and bytes in the cache directory.
    ///
    /// Never fails. Unreadable directories or files are logged and count
    /// as zero.
    pub fn stats(&self) -> DiskStats {
        let mut stats = DiskStats::default();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return stats,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "failed to read disk cache statistics");
                return stats;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "skipping unreadable cache entry");
                    continue;
                }
            };
            let path = entry.path();
            match entry.metadata() {
                Ok(meta) if meta.is_file() => {
                    stats.bytes += meta.len();
                    if has_extension(&path, HANDLE_EXT) {
                        stats.entries += 1;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to stat cache file");
                }
            }
        }
        stats
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), CacheError> {
        let io_err = |source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(data).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

fn read_sidecar(path: &Path) -> Result<String, CacheError> {
    std::fs::read_to_string(path).map_err(|e| CacheError::CorruptEntry {
        path: path.to_path_buf(),
        reason: format!("unreadable: {e}"),
    })
}

fn remove_if_present(path: &Path) -> Result<(), CacheError> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
        _ => Ok(()),
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

fn is_cache_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let stray_temp = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(TEMP_PREFIX));
    stray_temp || has_extension(path, HANDLE_EXT) || has_extension(path, META_EXT)
}
