//! Logical library names and the physical/logical search table.
//!
//! A Coq library is addressed by a dotted logical name (`Algebra.Groups`)
//! that is independent of the file implementing it. The translation between
//! the two worlds is driven by an ordered table of bindings, each mapping a
//! physical directory to a logical name prefix (the `-R` flags of the Coq
//! toolchain). Order matters: the first binding whose prefix matches wins.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ============================================================================
// Library Names
// ============================================================================

/// Dotted logical identifier for a source module (e.g. `Algebra.Groups`).
///
/// A `LibraryName` is a surface spelling; the canonical spelling of a name
/// is obtained through `Resolver::normalize`, which maps a name to the name
/// of the file it resolves to when that file exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibraryName(String);

impl LibraryName {
    /// Create a library name from its dotted spelling.
    pub fn new(name: impl Into<String>) -> Self {
        LibraryName(name.into())
    }

    /// The dotted spelling.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The dot-separated segments of the name.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }
}

impl fmt::Display for LibraryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LibraryName {
    fn from(name: &str) -> Self {
        LibraryName(name.to_string())
    }
}

impl From<String> for LibraryName {
    fn from(name: String) -> Self {
        LibraryName(name)
    }
}

/// Render a logical prefix in its "leading segment" form.
///
/// The empty prefix (also spelled `""` or `''` on tool command lines) binds
/// the root namespace and contributes nothing; any other prefix matches with
/// a trailing dot so that `Top` matches `Top.Foo` but not `Topology`.
pub(crate) fn prefix_with_dot(logical: &str) -> String {
    if logical.is_empty() || logical == "\"\"" || logical == "''" {
        String::new()
    } else {
        format!("{logical}.")
    }
}

// ============================================================================
// Path Bindings
// ============================================================================

/// A single (physical directory, logical prefix) binding.
///
/// Physical directories are interpreted relative to the workspace root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathBinding {
    /// Directory holding the sources, relative to the workspace root.
    pub physical: PathBuf,
    /// Logical prefix bound to that directory ("" binds the root namespace).
    pub logical: String,
}

impl PathBinding {
    /// Create a new binding.
    pub fn new(physical: impl Into<PathBuf>, logical: impl Into<String>) -> Self {
        PathBinding {
            physical: physical.into(),
            logical: logical.into(),
        }
    }

    /// The logical prefix in matchable form ("" or "Prefix.").
    pub(crate) fn logical_prefix(&self) -> String {
        prefix_with_dot(&self.logical)
    }
}

impl fmt::Display for PathBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.physical.display(), self.logical)
    }
}

impl FromStr for PathBinding {
    type Err = String;

    /// Parse a `PHYSICAL=LOGICAL` pair; the logical half may be empty
    /// (`src=` binds `src/` to the root namespace).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (physical, logical) = s
            .split_once('=')
            .ok_or_else(|| format!("expected PHYSICAL=LOGICAL, got '{s}'"))?;
        if physical.is_empty() {
            return Err(format!("empty physical directory in binding '{s}'"));
        }
        Ok(PathBinding::new(physical, logical))
    }
}

// ============================================================================
// Search Table
// ============================================================================

/// Ordered list of path bindings; the first matching binding wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTable(Vec<PathBinding>);

impl SearchTable {
    /// Create a table from an ordered list of bindings.
    pub fn new(bindings: Vec<PathBinding>) -> Self {
        SearchTable(bindings)
    }

    /// The conventional single-binding table mapping the workspace root to
    /// the `Top` namespace.
    pub fn top() -> Self {
        SearchTable(vec![PathBinding::new(".", "Top")])
    }

    /// The bindings, in match order.
    pub fn bindings(&self) -> &[PathBinding] {
        &self.0
    }

    /// Append a binding at the end of the match order.
    pub fn push(&mut self, binding: PathBinding) {
        self.0.push(binding);
    }

    /// Whether the table holds no bindings.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for SearchTable {
    fn default() -> Self {
        SearchTable::top()
    }
}

impl FromIterator<PathBinding> for SearchTable {
    fn from_iter<I: IntoIterator<Item = PathBinding>>(iter: I) -> Self {
        SearchTable(iter.into_iter().collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
