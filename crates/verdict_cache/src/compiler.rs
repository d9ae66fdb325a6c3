//! External compiler collaborator.
//!
//! The cache never looks inside a compiled package. It asks the compiler to
//! build sources into its own repository, keeps the returned handle, and
//! later exchanges that handle for a loaded package.

use std::fmt;

use crate::error::CompilerError;

/// Opaque reference to a package held in the compiler's own repository.
///
/// This is what the disk tier persists. It is not the compiled artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageHandle(String);

impl PackageHandle {
    /// Wraps a compiler-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as issued by the compiler.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One source handed to the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Logical identifier.
    pub id: String,
    /// Raw content.
    pub content: Vec<u8>,
}

/// Input to [`PackageCompiler::compile`].
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    /// Sources in sorted identifier order.
    pub sources: &'a [SourceUnit],
    /// A previously issued handle for the same sources whose artifact has
    /// disappeared. The compiler may rebuild under this identity or issue a
    /// new handle.
    pub reuse_handle: Option<&'a PackageHandle>,
}

/// A loaded, evaluable package.
///
/// The cache shares one package between callers and hands each caller its
/// own session.
pub trait Package: Send + Sync + 'static {
    /// Per-caller evaluation state.
    type Session;

    /// Creates a new, independent session.
    fn new_session(&self) -> Self::Session;
}

/// Builds and reloads packages.
///
/// Compiler configuration is supplied when the implementation is
/// constructed (see [`CompilerOptions`](verdict_config::CompilerOptions)).
pub trait PackageCompiler: Send + Sync {
    /// The loaded package type.
    type Package: Package;

    /// Compiles sources into the compiler's repository and returns a handle.
    ///
    /// Fails with [`CompilerError::Compile`] when the sources are invalid.
    fn compile(&self, request: CompileRequest<'_>) -> Result<PackageHandle, CompilerError>;

    /// Loads a previously compiled package.
    ///
    /// Fails with [`CompilerError::HandleNotFound`] when the artifact is
    /// gone from the repository.
    fn load(&self, handle: &PackageHandle) -> Result<Self::Package, CompilerError>;
}
