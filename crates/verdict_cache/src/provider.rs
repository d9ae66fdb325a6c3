//! Source provider collaborator.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::SourceError;

/// Resolves logical source identifiers to their raw bytes.
///
/// Implementations must be safe to call from several threads at once.
pub trait SourceProvider: Send + Sync {
    /// Reads the full content of `id`.
    fn read(&self, id: &str) -> Result<Vec<u8>, SourceError>;
}

impl<P: SourceProvider + ?Sized> SourceProvider for &P {
    fn read(&self, id: &str) -> Result<Vec<u8>, SourceError> {
        (**self).read(id)
    }
}

impl<P: SourceProvider + ?Sized> SourceProvider for std::sync::Arc<P> {
    fn read(&self, id: &str) -> Result<Vec<u8>, SourceError> {
        (**self).read(id)
    }
}

/// Reads sources as files relative to a root directory.
///
/// Identifiers are relative paths. Absolute paths and paths that climb out
/// of the root resolve to [`SourceError::NotFound`].
#[derive(Debug, Clone)]
pub struct FsSourceProvider {
    root: PathBuf,
}

impl FsSourceProvider {
    /// Creates a provider rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, id: &str) -> Option<PathBuf> {
        let rel = Path::new(id);
        let contained = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        contained.then(|| self.root.join(rel))
    }
}

impl SourceProvider for FsSourceProvider {
    fn read(&self, id: &str) -> Result<Vec<u8>, SourceError> {
        let path = self.resolve(id).ok_or_else(|| SourceError::NotFound {
            id: id.to_string(),
        })?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SourceError::NotFound { id: id.to_string() },
            _ => SourceError::Io {
                id: id.to_string(),
                source: e,
            },
        })
    }
}
