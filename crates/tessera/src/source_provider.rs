//! Access to compiled component output and the root document
//!
//! The planner never touches the filesystem directly. Production builds use
//! [`OsSourceProvider`]; tests and hosts that keep sources in memory use
//! [`InMemorySourceProvider`].

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use rustc_hash::FxHashMap;

/// Shared handle to a source provider, usable from the parallel scan phase
pub type SourceProviderRef = Arc<dyn SourceProvider>;

/// Reads source text by path
pub trait SourceProvider: std::fmt::Debug + Send + Sync {
    /// Read the whole file as UTF-8, failing with `NotFound` when it does not exist
    fn read_text(&self, path: &Path) -> io::Result<String>;
}

/// Reads from the OS filesystem, resolving relative paths against `root`
#[derive(Debug, Clone, Default)]
pub struct OsSourceProvider {
    root: Option<PathBuf>,
}

impl OsSourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl SourceProvider for OsSourceProvider {
    fn read_text(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(self.resolve(path))
    }
}

/// Keeps every file in memory, keyed by the exact path it was added under
#[derive(Debug, Clone, Default)]
pub struct InMemorySourceProvider {
    files: FxHashMap<PathBuf, String>,
}

impl InMemorySourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_file(&mut self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.write_file(path, contents);
        self
    }
}

impl SourceProvider for InMemorySourceProvider {
    fn read_text(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )
        })
    }
}
