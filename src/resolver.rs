//! The resolution context: configuration plus process-lifetime caches.
//!
//! All operations in this crate are methods on [`Resolver`]. The resolver
//! owns every cache the pipeline uses — file contents keyed by path and
//! invalidated on mtime advance, name⇄path mappings, per-strategy import
//! lists, and transitive-closure memos — so there is no ambient global
//! state and a fresh resolver per test is hermetic. Nothing persists past
//! the value's lifetime.
//!
//! Caches are `RwLock`-guarded maps. The design is single-threaded and
//! synchronous; the locks exist so that `&self` methods can fill caches,
//! and guards are never held across recursion or toolchain invocations.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::names::LibraryName;
use crate::toolchain::{ArtifactGateway, CoqToolchain};

// ============================================================================
// File Cache Entries
// ============================================================================

/// Cached contents of one source file.
pub(crate) struct CachedFile {
    pub(crate) contents: String,
    pub(crate) mtime: SystemTime,
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolution context for one workspace.
pub struct Resolver {
    config: Config,
    gateway: Box<dyn ArtifactGateway>,
    pub(crate) files: RwLock<HashMap<PathBuf, CachedFile>>,
    pub(crate) lib_paths: RwLock<HashMap<(String, String), PathBuf>>,
    pub(crate) path_libs: RwLock<HashMap<PathBuf, LibraryName>>,
    pub(crate) glob_imports: RwLock<HashMap<LibraryName, Vec<LibraryName>>>,
    pub(crate) text_imports: RwLock<HashMap<LibraryName, Vec<LibraryName>>>,
    pub(crate) closures: RwLock<HashMap<(LibraryName, bool), Vec<LibraryName>>>,
}

impl Resolver {
    /// Create a resolver that talks to the real Coq toolchain.
    pub fn new(config: Config) -> Self {
        Resolver::with_gateway(config, Box::new(CoqToolchain))
    }

    /// Create a resolver with a custom artifact gateway.
    pub fn with_gateway(config: Config, gateway: Box<dyn ArtifactGateway>) -> Self {
        Resolver {
            config,
            gateway,
            files: RwLock::new(HashMap::new()),
            lib_paths: RwLock::new(HashMap::new()),
            path_libs: RwLock::new(HashMap::new()),
            glob_imports: RwLock::new(HashMap::new()),
            text_imports: RwLock::new(HashMap::new()),
            closures: RwLock::new(HashMap::new()),
        }
    }

    /// The configuration this resolver was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn gateway(&self) -> &dyn ArtifactGateway {
        self.gateway.as_ref()
    }

    /// Absolute form of a workspace-relative path.
    pub(crate) fn absolute(&self, rel: &Path) -> PathBuf {
        self.config.root.join(rel)
    }

    /// Whether a library is implemented by a file in this workspace.
    ///
    /// Libraries without a backing file are external/opaque dependencies:
    /// they appear in import lists but are never expanded.
    pub fn library_is_local(&self, library: &LibraryName) -> bool {
        let rel = self.path_of_library(library, ".v");
        self.absolute(&rel).is_file()
    }

    /// Raw contents of a workspace-relative file, through the mtime cache.
    ///
    /// The cached entry is reused until the file's modification time
    /// advances past the cached stamp.
    pub fn source_text(&self, rel: &Path) -> Result<String> {
        let abs = self.absolute(rel);
        let mtime = fs::metadata(&abs)?.modified()?;
        {
            let files = self.files.read().expect("file cache RwLock poisoned");
            if let Some(cached) = files.get(rel) {
                if cached.mtime >= mtime {
                    return Ok(cached.contents.clone());
                }
            }
        }
        debug!(path = %rel.display(), "reading source");
        let contents = fs::read_to_string(&abs)?;
        self.files
            .write()
            .expect("file cache RwLock poisoned")
            .insert(
                rel.to_path_buf(),
                CachedFile {
                    contents: contents.clone(),
                    mtime,
                },
            );
        Ok(contents)
    }

    /// Drop the memoized import lists (both strategies) for one library.
    ///
    /// Transitive-closure memos and the file-content cache are unaffected.
    pub fn clear_import_cache(&self, library: &LibraryName) {
        self.glob_imports
            .write()
            .expect("import cache RwLock poisoned")
            .remove(library);
        self.text_imports
            .write()
            .expect("import cache RwLock poisoned")
            .remove(library);
    }
}

// ============================================================================
// Tests
// ============================================================================
