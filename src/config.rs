//! Resolver configuration.

use std::path::PathBuf;

use crate::names::SearchTable;

/// Configuration for a [`Resolver`](crate::resolver::Resolver).
///
/// Everything here is a plain value; the resolver never reads ambient
/// process state beyond the filesystem under `root`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace root; all resolved paths are relative to it.
    pub root: PathBuf,
    /// Ordered physical/logical bindings used for name resolution.
    pub search_table: SearchTable,
    /// Compiler binary handed to the makefile generator (`COQC=`).
    pub coqc: String,
    /// Makefile generator binary.
    pub coq_makefile: String,
    /// Whether glob generation feeds every `.v` file under the root to the
    /// makefile generator, not just the requested ones.
    pub walk_tree: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            root: PathBuf::from("."),
            search_table: SearchTable::default(),
            coqc: "coqc".to_string(),
            coq_makefile: "coq_makefile".to_string(),
            walk_tree: true,
        }
    }
}

impl Config {
    /// Create a config rooted at `root` with the default search table.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Config {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Replace the search table.
    pub fn with_table(mut self, table: SearchTable) -> Self {
        self.search_table = table;
        self
    }

    /// Use a different compiler binary.
    pub fn with_coqc(mut self, coqc: impl Into<String>) -> Self {
        self.coqc = coqc.into();
        self
    }

    /// Use a different makefile generator binary.
    pub fn with_coq_makefile(mut self, coq_makefile: impl Into<String>) -> Self {
        self.coq_makefile = coq_makefile.into();
        self
    }

    /// Restrict glob generation to the requested files only.
    pub fn without_tree_walk(mut self) -> Self {
        self.walk_tree = false;
        self
    }
}
