//! Test doubles for the source provider and external compiler.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use verdict_cache::{
    CacheConfig, CompileRequest, CompilerError, CompilerOptions, Package, PackageCompiler,
    PackageHandle, SourceError, SourceProvider,
};

/// Installs a test-writer subscriber once. Controlled by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory sources that tests can edit between lookups.
#[derive(Default)]
pub struct MapSources {
    files: RwLock<HashMap<String, Vec<u8>>>,
    reads: AtomicUsize,
}

impl MapSources {
    pub fn with(files: &[(&str, &str)]) -> Self {
        let sources = Self::default();
        for (id, content) in files {
            sources.set(id, content);
        }
        sources
    }

    pub fn set(&self, id: &str, content: &str) {
        self.files
            .write()
            .insert(id.to_string(), content.as_bytes().to_vec());
    }

    pub fn remove(&self, id: &str) {
        self.files.write().remove(id);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl SourceProvider for MapSources {
    fn read(&self, id: &str) -> Result<Vec<u8>, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.files
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound { id: id.to_string() })
    }
}

/// A loaded mock package.
#[derive(Debug)]
pub struct MockPackage {
    pub handle: PackageHandle,
    pub sources: Vec<String>,
    pub options: CompilerOptions,
    sessions: AtomicUsize,
}

/// A session opened on a [`MockPackage`].
#[derive(Debug, PartialEq, Eq)]
pub struct MockSession {
    pub handle: String,
    pub serial: usize,
}

impl Package for MockPackage {
    type Session = MockSession;

    fn new_session(&self) -> MockSession {
        MockSession {
            handle: self.handle.to_string(),
            serial: self.sessions.fetch_add(1, Ordering::SeqCst),
        }
    }
}

/// Call-counting compiler with an in-memory repository.
///
/// Sources whose content contains `INVALID` are rejected. Handles are
/// minted as `H1`, `H2`, ... unless a reuse hint is offered and
/// `honor_reuse` is set.
pub struct MockCompiler {
    options: CompilerOptions,
    repository: RwLock<HashMap<String, Vec<String>>>,
    compiles: AtomicUsize,
    loads: AtomicUsize,
    next_handle: AtomicUsize,
    honor_reuse: bool,
    handle_padding: &'static str,
    reuse_hints: Mutex<Vec<Option<String>>>,
}

impl MockCompiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            repository: RwLock::new(HashMap::new()),
            compiles: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
            next_handle: AtomicUsize::new(1),
            honor_reuse: false,
            handle_padding: "",
            reuse_hints: Mutex::new(Vec::new()),
        }
    }

    pub fn honoring_reuse(mut self) -> Self {
        self.honor_reuse = true;
        self
    }

    /// Mints handles with `padding` on both sides, e.g. ` H1 `.
    pub fn padding_handles(mut self, padding: &'static str) -> Self {
        self.handle_padding = padding;
        self
    }

    pub fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Reuse hints received by each compile call, in order.
    pub fn reuse_hints(&self) -> Vec<Option<String>> {
        self.reuse_hints.lock().clone()
    }

    /// Forgets every compiled artifact, as after a restart with a cleared
    /// build repository.
    pub fn evict_all(&self) {
        self.repository.write().clear();
    }
}

impl Default for MockCompiler {
    fn default() -> Self {
        Self::new(CompilerOptions::default())
    }
}

impl PackageCompiler for MockCompiler {
    type Package = MockPackage;

    fn compile(&self, request: CompileRequest<'_>) -> Result<PackageHandle, CompilerError> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        self.reuse_hints
            .lock()
            .push(request.reuse_handle.map(|h| h.to_string()));

        let messages: Vec<String> = request
            .sources
            .iter()
            .filter(|unit| String::from_utf8_lossy(&unit.content).contains("INVALID"))
            .map(|unit| format!("{}: invalid decision table", unit.id))
            .collect();
        if !messages.is_empty() {
            return Err(CompilerError::Compile { messages });
        }

        let handle = match request.reuse_handle {
            Some(h) if self.honor_reuse => h.to_string(),
            _ => format!(
                "{pad}H{}{pad}",
                self.next_handle.fetch_add(1, Ordering::SeqCst),
                pad = self.handle_padding
            ),
        };
        let ids = request.sources.iter().map(|u| u.id.clone()).collect();
        self.repository.write().insert(handle.clone(), ids);
        Ok(PackageHandle::new(handle))
    }

    fn load(&self, handle: &PackageHandle) -> Result<MockPackage, CompilerError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let sources = self
            .repository
            .read()
            .get(handle.as_str())
            .cloned()
            .ok_or_else(|| CompilerError::HandleNotFound {
                handle: handle.to_string(),
            })?;
        Ok(MockPackage {
            handle: handle.clone(),
            sources,
            options: self.options,
            sessions: AtomicUsize::new(0),
        })
    }
}

/// Cache configuration rooted in a fresh temporary directory.
pub fn temp_config() -> (tempfile::TempDir, CacheConfig) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = CacheConfig::new(dir.path().join("cache"));
    (dir, config)
}
