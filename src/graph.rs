//! Transitive import closure.
//!
//! The closure of a library is computed depth-first: the closures of its
//! direct imports come first, in import order, then the library itself,
//! with only the first occurrence of each name kept. Results are memoized
//! per (library, strategy) for the resolver's lifetime.
//!
//! The traversal carries its own stack, so re-entering a library that is
//! still being expanded is detected and reported as a cycle instead of
//! recursing forever.

use tracing::debug;

use crate::error::{Error, Result};
use crate::names::LibraryName;
use crate::resolver::Resolver;

impl Resolver {
    /// Every library reachable from `library` through import edges,
    /// deduplicated, in depth-first imports-before-self order, ending with
    /// `library` itself.
    ///
    /// `fast` selects the heuristic extraction strategy (no artifact work);
    /// without it, artifacts are proactively regenerated for each level's
    /// direct imports before recursing.
    pub fn transitive_imports(&self, library: &LibraryName, fast: bool) -> Result<Vec<LibraryName>> {
        let mut stack = Vec::new();
        self.closure_of(&self.normalize(library), fast, &mut stack)
    }

    fn closure_of(
        &self,
        library: &LibraryName,
        fast: bool,
        stack: &mut Vec<LibraryName>,
    ) -> Result<Vec<LibraryName>> {
        let key = (library.clone(), fast);
        if let Some(hit) = self
            .closures
            .read()
            .expect("closure cache RwLock poisoned")
            .get(&key)
        {
            return Ok(hit.clone());
        }

        if let Some(position) = stack.iter().position(|l| l == library) {
            let mut chain: Vec<LibraryName> = stack[position..].to_vec();
            chain.push(library.clone());
            return Err(Error::CyclicImport { chain });
        }

        // A library with no backing file is opaque: its closure is itself.
        let closure = if !self.library_is_local(library) {
            vec![library.clone()]
        } else {
            stack.push(library.clone());
            let imports = self.direct_imports(library, fast)?;
            if !fast {
                self.ensure_globs(&imports)?;
            }
            let mut merged: Vec<LibraryName> = Vec::new();
            for import in &imports {
                for name in self.closure_of(import, fast, stack)? {
                    if !merged.contains(&name) {
                        merged.push(name);
                    }
                }
            }
            if !merged.contains(library) {
                merged.push(library.clone());
            }
            stack.pop();
            merged
        };

        debug!(library = %library, size = closure.len(), "memoizing import closure");
        self.closures
            .write()
            .expect("closure cache RwLock poisoned")
            .insert(key, closure.clone());
        Ok(closure)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::names::{PathBinding, SearchTable};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn root_resolver(root: &Path) -> Resolver {
        Resolver::new(
            Config::new(root).with_table(SearchTable::new(vec![PathBinding::new(".", "")])),
        )
    }

    fn write(root: &Path, rel: &str, text: &str) {
        fs::write(root.join(rel), text).unwrap();
    }

    #[test]
    fn diamond_closure_orders_imports_before_self() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "Top.v", "Require Import A B.\n");
        write(tmp.path(), "A.v", "Require Import B.\n");
        write(tmp.path(), "B.v", "");
        let resolver = root_resolver(tmp.path());
        let closure = resolver
            .transitive_imports(&LibraryName::new("Top"), true)
            .unwrap();
        assert_eq!(
            closure,
            vec![
                LibraryName::new("B"),
                LibraryName::new("A"),
                LibraryName::new("Top"),
            ]
        );
    }

    #[test]
    fn closure_ends_with_the_library_and_has_no_duplicates() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "Top.v", "Require Import A B C.\n");
        write(tmp.path(), "A.v", "Require Import C.\n");
        write(tmp.path(), "B.v", "Require Import C A.\n");
        write(tmp.path(), "C.v", "");
        let resolver = root_resolver(tmp.path());
        let closure = resolver
            .transitive_imports(&LibraryName::new("Top"), true)
            .unwrap();
        assert_eq!(closure.last(), Some(&LibraryName::new("Top")));
        let mut deduped = closure.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), closure.len());
    }

    #[test]
    fn opaque_library_is_a_singleton_closure() {
        let tmp = TempDir::new().unwrap();
        let resolver = root_resolver(tmp.path());
        let closure = resolver
            .transitive_imports(&LibraryName::new("Coq.Lists.List"), true)
            .unwrap();
        assert_eq!(closure, vec![LibraryName::new("Coq.Lists.List")]);
    }

    #[test]
    fn external_dependencies_are_not_expanded() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "A.v", "Require Import Coq.Lists.List.\n");
        let resolver = root_resolver(tmp.path());
        let closure = resolver
            .transitive_imports(&LibraryName::new("A"), true)
            .unwrap();
        assert_eq!(
            closure,
            vec![LibraryName::new("Coq.Lists.List"), LibraryName::new("A")]
        );
    }

    #[test]
    fn cycles_fail_fast_with_the_chain() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "A.v", "Require Import B.\n");
        write(tmp.path(), "B.v", "Require Import A.\n");
        let resolver = root_resolver(tmp.path());
        let err = resolver
            .transitive_imports(&LibraryName::new("A"), true)
            .unwrap_err();
        match err {
            Error::CyclicImport { chain } => {
                assert_eq!(
                    chain,
                    vec![
                        LibraryName::new("A"),
                        LibraryName::new("B"),
                        LibraryName::new("A"),
                    ]
                );
            }
            other => panic!("expected CyclicImport, got {other}"),
        }
    }

    #[test]
    fn closures_are_memoized_per_strategy() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "A.v", "Require Import B.\n");
        write(tmp.path(), "B.v", "");
        let resolver = root_resolver(tmp.path());
        let lib = LibraryName::new("A");
        let first = resolver.transitive_imports(&lib, true).unwrap();

        // Import-cache clears do not touch closure memos.
        resolver.clear_import_cache(&lib);
        fs::write(tmp.path().join("A.v"), "").unwrap();
        let second = resolver.transitive_imports(&lib, true).unwrap();
        assert_eq!(first, second);
    }
}
