//! Error types for the package cache and its collaborators.

use std::path::PathBuf;

use verdict_common::{SourceSet, SourceSetError};

/// Errors raised by the disk tier.
///
/// These never reach callers of
/// [`BuildCoordinator::resolve`](crate::BuildCoordinator::resolve): a disk
/// entry that cannot be read is a cache miss, and a failed write only costs
/// a future rebuild.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A sidecar file exists but could not be understood.
    #[error("corrupt cache entry {path}: {reason}")]
    CorruptEntry {
        /// The sidecar file that failed to parse.
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },
}

/// Errors raised by a [`SourceProvider`](crate::SourceProvider).
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The identifier does not resolve to any source.
    #[error("source '{id}' not found")]
    NotFound {
        /// The unresolved identifier.
        id: String,
    },

    /// The source exists but reading it failed.
    #[error("failed to read source '{id}': {source}")]
    Io {
        /// The identifier being read.
        id: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl SourceError {
    /// The identifier this error refers to.
    pub fn id(&self) -> &str {
        match self {
            SourceError::NotFound { id } | SourceError::Io { id, .. } => id,
        }
    }
}

/// Errors raised by a [`PackageCompiler`](crate::PackageCompiler).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompilerError {
    /// The compiler rejected the sources.
    #[error("compilation failed: {}", .messages.join("; "))]
    Compile {
        /// Diagnostic messages reported by the compiler.
        messages: Vec<String>,
    },

    /// The handle no longer resolves in the compiler's own repository.
    #[error("package handle '{handle}' not found")]
    HandleNotFound {
        /// The handle that failed to load.
        handle: String,
    },

    /// Any other compiler failure.
    #[error("compiler error: {reason}")]
    Internal {
        /// Description of the failure.
        reason: String,
    },
}

/// Errors surfaced by [`BuildCoordinator`](crate::BuildCoordinator).
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The requested identifiers do not form a valid source set.
    #[error(transparent)]
    InvalidSourceSet(#[from] SourceSetError),

    /// A requested source could not be read.
    #[error("source '{id}' could not be read")]
    SourceNotFound {
        /// The unreadable identifier.
        id: String,
        /// The provider error.
        source: SourceError,
    },

    /// The external compiler failed to produce a loadable package.
    #[error("failed to build package for {sources}")]
    BuildFailure {
        /// The source set being built.
        sources: SourceSet,
        /// The compiler error.
        source: CompilerError,
    },
}

impl From<SourceError> for ResolveError {
    fn from(source: SourceError) -> Self {
        ResolveError::SourceNotFound {
            id: source.id().to_string(),
            source,
        }
    }
}
