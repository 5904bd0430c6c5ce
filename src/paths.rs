//! Library⇄file name mapping.
//!
//! Resolution is driven by the ordered search table: the first binding
//! whose logical prefix matches a leading segment of the library name (for
//! name→path) or whose physical directory is a prefix of the path (for
//! path→name) wins. Names that match no binding fall back to a best-effort
//! filesystem search, and finally to the naive dot-to-separator mapping.
//! Both directions are pure functions of (input, table) and are cached on
//! the resolver.

use std::path::{Component, Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::names::LibraryName;
use crate::resolver::Resolver;

/// Extensions stripped when turning a path back into a library name.
const KNOWN_EXTENSIONS: &[&str] = &[".v", ".glob"];

// ============================================================================
// Path Helpers
// ============================================================================

/// Normalize a relative path textually: drop `.` components and resolve
/// `..` against preceding normal components where possible.
pub(crate) fn clean_rel(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop =
                    matches!(out.components().next_back(), Some(Component::Normal(_)));
                if !can_pop || !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

/// Map a dotted name to its relative path form (`A.B.C` → `A/B/C`).
fn dots_to_path(dotted: &str) -> PathBuf {
    dotted.split('.').collect()
}

/// Map a relative path to its dotted form (`A/B/C` → `A.B.C`).
fn path_to_dots(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Whether a cleaned relative path escapes the root via parent traversal.
fn escapes_root(path: &Path) -> bool {
    matches!(path.components().next(), Some(Component::ParentDir))
}

/// Append an extension (given with its leading dot) to a path.
pub(crate) fn append_extension(path: PathBuf, ext: &str) -> PathBuf {
    let mut s = path.into_os_string();
    s.push(ext);
    PathBuf::from(s)
}

// ============================================================================
// Resolver Methods
// ============================================================================

impl Resolver {
    /// The workspace-relative path implementing `library`, with `ext`
    /// appended (e.g. `".v"`).
    ///
    /// The result is a mapping, not a promise: when no binding matches and
    /// no existing file is found under the root, the naive segment-mapped
    /// path is returned regardless of existence.
    pub fn path_of_library(&self, library: &LibraryName, ext: &str) -> PathBuf {
        let key = (library.as_str().to_string(), ext.to_string());
        if let Some(hit) = self
            .lib_paths
            .read()
            .expect("path cache RwLock poisoned")
            .get(&key)
        {
            return hit.clone();
        }
        let path = self.compute_path(library, ext);
        self.lib_paths
            .write()
            .expect("path cache RwLock poisoned")
            .insert(key, path.clone());
        path
    }

    fn compute_path(&self, library: &LibraryName, ext: &str) -> PathBuf {
        for binding in self.config().search_table.bindings() {
            let prefix = binding.logical_prefix();
            let rest = if prefix.is_empty() {
                Some(library.as_str())
            } else {
                library.as_str().strip_prefix(&prefix)
            };
            if let Some(rest) = rest {
                let mapped = clean_rel(&binding.physical.join(dots_to_path(rest)));
                return append_extension(mapped, ext);
            }
        }

        // No binding matched: best-effort search for an existing file under
        // the root, then the naive segment mapping.
        let mapped = append_extension(clean_rel(&dots_to_path(library.as_str())), ext);
        let root = &self.config().root;
        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            if !entry.file_type().is_dir() {
                continue;
            }
            let candidate = entry.path().join(&mapped);
            if candidate.is_file() {
                if let Ok(rel) = candidate.strip_prefix(root) {
                    return clean_rel(rel);
                }
            }
        }
        mapped
    }

    /// The library name implemented by a workspace-relative file path.
    ///
    /// Known extensions are stripped first. The root binding (physical
    /// directory `.`) accepts any path that does not escape the workspace;
    /// a path under no binding keeps its own segments as the name.
    pub fn library_of_path(&self, path: &Path) -> LibraryName {
        let key = path.to_path_buf();
        if let Some(hit) = self
            .path_libs
            .read()
            .expect("path cache RwLock poisoned")
            .get(&key)
        {
            return hit.clone();
        }
        let library = self.compute_library(path);
        self.path_libs
            .write()
            .expect("path cache RwLock poisoned")
            .insert(key, library.clone());
        library
    }

    fn compute_library(&self, path: &Path) -> LibraryName {
        let mut p = clean_rel(path);
        if let Some(name) = p
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
        {
            for ext in KNOWN_EXTENSIONS {
                if let Some(stem) = name.strip_suffix(ext) {
                    if !stem.is_empty() {
                        p.set_file_name(stem);
                    }
                    break;
                }
            }
        }

        for binding in self.config().search_table.bindings() {
            let physical = clean_rel(&binding.physical);
            let remainder: Option<PathBuf> = if physical == Path::new(".") {
                if escapes_root(&p) {
                    None
                } else {
                    Some(p.clone())
                }
            } else {
                p.strip_prefix(&physical).ok().map(Path::to_path_buf)
            };
            if let Some(remainder) = remainder {
                warn_on_unsafe_name(&remainder);
                return LibraryName::new(format!(
                    "{}{}",
                    binding.logical_prefix(),
                    path_to_dots(&remainder)
                ));
            }
        }

        warn_on_unsafe_name(&p);
        LibraryName::new(path_to_dots(&p))
    }

    /// Canonical spelling of a library name: the name of the file it
    /// resolves to, when that file exists; otherwise the input unchanged
    /// (an external/opaque dependency).
    pub fn normalize(&self, library: &LibraryName) -> LibraryName {
        let rel = self.path_of_library(library, ".v");
        if self.absolute(&rel).is_file() {
            self.library_of_path(&rel)
        } else {
            library.clone()
        }
    }
}

/// A literal dot inside a path component collides with the segment
/// separator and makes the reconstructed name ambiguous.
fn warn_on_unsafe_name(path: &Path) {
    let has_dotted_component = path.components().any(
        |component| matches!(component, Component::Normal(name) if name.to_string_lossy().contains('.')),
    );
    if has_dotted_component {
        warn!(
            path = %path.display(),
            "path component contains a dot; the library name round-trip is unsafe"
        );
    }
}

// ============================================================================
// Tests
// ============================================================================
