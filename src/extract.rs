//! Direct-import extraction: authoritative and heuristic strategies.
//!
//! Two independent strategies produce the direct import set of a library:
//!
//! - [`GlobExtractor`] reads the compiler-emitted `.glob` artifact and is
//!   authoritative, but needs the artifact to exist and to be at least as
//!   fresh as the source. When it is not, the artifact is regenerated once
//!   through the gateway before giving up.
//! - [`TextExtractor`] scans the raw source for `Require`/`Load` statement
//!   forms. It is heuristic but always available, and doubles as both the
//!   fast path and the fallback when artifact generation fails.
//!
//! Both strategies normalize, deduplicate and sort their results, so the
//! two agree whenever the artifact reflects the source. Names that
//! normalize to themselves (no backing file in the workspace) stay in the
//! result as external/opaque dependencies; the graph builder never expands
//! them.

use std::fs;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::glob::parse_glob;
use crate::names::LibraryName;
use crate::resolver::Resolver;
use crate::toolchain::glob_is_fresh;

// ============================================================================
// Strategy Interface
// ============================================================================

/// One way of computing the direct imports of a library.
pub trait ImportExtractor {
    /// Short strategy name for diagnostics.
    fn name(&self) -> &'static str;

    /// Extract the direct imports of `library`, normalized, deduplicated
    /// and sorted. `Ok(None)` means the strategy cannot produce an answer
    /// for this library (e.g. no usable artifact); the caller is expected
    /// to fall back to another strategy.
    fn extract(
        &self,
        resolver: &Resolver,
        library: &LibraryName,
    ) -> Result<Option<Vec<LibraryName>>>;
}

// ============================================================================
// Authoritative Strategy
// ============================================================================

/// Imports read from the compiler-emitted `.glob` artifact.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobExtractor;

impl ImportExtractor for GlobExtractor {
    fn name(&self) -> &'static str {
        "glob"
    }

    fn extract(
        &self,
        resolver: &Resolver,
        library: &LibraryName,
    ) -> Result<Option<Vec<LibraryName>>> {
        if let Some(hit) = resolver
            .glob_imports
            .read()
            .expect("import cache RwLock poisoned")
            .get(library)
        {
            return Ok(Some(hit.clone()));
        }
        debug!(library = %library, strategy = self.name(), "extracting direct imports");

        resolver.ensure_globs(std::slice::from_ref(library))?;

        let v_rel = resolver.path_of_library(library, ".v");
        let glob_rel = resolver.path_of_library(library, ".glob");
        let glob_abs = resolver.absolute(&glob_rel);
        if !glob_abs.is_file() {
            return Ok(None);
        }
        if !glob_is_fresh(&glob_abs, &resolver.absolute(&v_rel)) {
            warn!(
                library = %library,
                artifact = %glob_rel.display(),
                "artifact is older than its source; ignoring it"
            );
            return Ok(None);
        }

        let artifact = fs::read_to_string(&glob_abs)?;
        let mut imports: Vec<LibraryName> = parse_glob(&artifact)
            .iter()
            .filter(|record| record.is_import())
            .map(|record| resolver.normalize(&LibraryName::from(record.referenced.as_str())))
            .collect();
        imports.sort();
        imports.dedup();

        resolver
            .glob_imports
            .write()
            .expect("import cache RwLock poisoned")
            .insert(library.clone(), imports.clone());
        Ok(Some(imports))
    }
}

// ============================================================================
// Heuristic Strategy
// ============================================================================

/// Statement forms recognized by the source scan, up to the terminating
/// period followed by whitespace or end-of-text.
static IMPORT_STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ms)^\s*(?:Require\s+Import|Require\s+Export|Require|Load\s+Verbose|Load)\s+(.*?)\.(?:\s|$)",
    )
    .unwrap()
});

/// The whitespace-separated name tokens of every import statement in
/// `source`, in statement order, before normalization.
pub(crate) fn scan_import_statements(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for caps in IMPORT_STATEMENT.captures_iter(source) {
        if let Some(group) = caps.get(1) {
            tokens.extend(group.as_str().split_whitespace().map(str::to_string));
        }
    }
    tokens
}

/// Imports scanned out of the raw source text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtractor;

impl ImportExtractor for TextExtractor {
    fn name(&self) -> &'static str {
        "source"
    }

    fn extract(
        &self,
        resolver: &Resolver,
        library: &LibraryName,
    ) -> Result<Option<Vec<LibraryName>>> {
        if let Some(hit) = resolver
            .text_imports
            .read()
            .expect("import cache RwLock poisoned")
            .get(library)
        {
            return Ok(Some(hit.clone()));
        }
        debug!(library = %library, strategy = self.name(), "extracting direct imports");

        let v_rel = resolver.path_of_library(library, ".v");
        let contents = resolver.source_text(&v_rel)?;
        let mut imports: Vec<LibraryName> = scan_import_statements(&contents)
            .iter()
            .map(|token| resolver.normalize(&LibraryName::from(token.as_str())))
            .collect();
        imports.sort();
        imports.dedup();

        resolver
            .text_imports
            .write()
            .expect("import cache RwLock poisoned")
            .insert(library.clone(), imports.clone());
        Ok(Some(imports))
    }
}

// ============================================================================
// Fallback Policy
// ============================================================================

impl Resolver {
    /// Direct imports of `library`, normalized, deduplicated and sorted.
    ///
    /// With `fast` the heuristic source scan is used outright (no artifact
    /// work at all). Otherwise the authoritative strategy is tried first
    /// and the scan only used when no usable artifact could be produced.
    pub fn direct_imports(&self, library: &LibraryName, fast: bool) -> Result<Vec<LibraryName>> {
        let library = self.normalize(library);
        if !fast {
            match GlobExtractor.extract(self, &library)? {
                Some(imports) => return Ok(imports),
                None => warn!(
                    library = %library,
                    "no usable glob artifact; falling back to source scanning"
                ),
            }
        }
        Ok(TextExtractor.extract(self, &library)?.unwrap_or_default())
    }
}

// ============================================================================
// Tests
// ============================================================================
