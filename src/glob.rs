//! Parser for compiler-emitted `.glob` cross-reference artifacts.
//!
//! A `.glob` file records, for one source file, every identifier reference
//! the compiler resolved: its byte span in the source, the library the
//! reference points at, an optional appended suffix, and a declaration-kind
//! tag. The format is line-oriented; the lines this module cares about look
//! like
//!
//! ```text
//! R<start>:<end> <referenced> <> <appendOrPlaceholder> <kind>
//! ```
//!
//! Offsets are 0-based byte offsets into the source file; the recorded end
//! offset is inclusive, so parsing adds 1 to obtain the half-open span used
//! everywhere else in this crate. `<>` is the placeholder for "no suffix".
//! Lines of any other shape (file headers, definition lines) are ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use winnow::ascii::digit1;
use winnow::prelude::*;
use winnow::token::take_while;
use winnow::ModalResult;

// ============================================================================
// Declaration Kinds
// ============================================================================

/// Kinds whose references are import statements (`Require` forms).
pub const IMPORT_ABSOLUTIZE_KINDS: &[&str] = &["lib"];

/// Every declaration kind whose references can be absolutized.
///
/// Qualifying all of these is enough to leave only absolute names in the
/// rewritten source; see [`covers_all_kinds`].
pub const ALL_ABSOLUTIZE_KINDS: &[&str] = &[
    "lib", "proj", "rec", "ind", "constr", "def", "syndef", "class", "thm", "lem", "prf", "ax",
    "inst", "prfax", "coind", "scheme", "vardef",
];

/// Whether absolutizing the given kinds is enough to guarantee that the
/// rewritten source uses only absolute names.
pub fn covers_all_kinds(kinds: &[&str]) -> bool {
    ALL_ABSOLUTIZE_KINDS.iter().all(|k| kinds.contains(k))
}

// ============================================================================
// Glob Records
// ============================================================================

/// One positioned reference annotation from a `.glob` artifact.
///
/// The derived ordering sorts by start offset first, which gives `BTreeSet`
/// iteration a deterministic ascending order; the rewriter walks it in
/// reverse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GlobRecord {
    /// Start byte offset into the source file (inclusive).
    pub start: usize,
    /// End byte offset (exclusive; the artifact's inclusive end plus 1).
    pub end: usize,
    /// The library (or library-qualified location) the span resolves to.
    pub referenced: String,
    /// Appended suffix, when the reference names a member of `referenced`.
    pub append: Option<String>,
    /// Declaration-kind tag, kept verbatim (the set is open).
    pub kind: String,
}

impl GlobRecord {
    /// Whether this record is an import-type reference (a `Require` form):
    /// kind `lib` with no appended suffix.
    pub fn is_import(&self) -> bool {
        self.kind == "lib" && self.append.is_none()
    }

    /// The text this record spans, when the span is in bounds.
    pub fn span_text<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.start..self.end)
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse one `R<start>:<end> <loc> <> <append> <kind>` line.
fn record_line(input: &mut &str) -> ModalResult<GlobRecord> {
    let _ = 'R'.parse_next(input)?;
    let start: usize = digit1.parse_to().parse_next(input)?;
    let _ = ':'.parse_next(input)?;
    let end: usize = digit1.parse_to().parse_next(input)?;
    let _ = ' '.parse_next(input)?;
    let referenced: &str = take_while(1.., |c: char| c != ' ').parse_next(input)?;
    let _ = " <> ".parse_next(input)?;
    let append: &str = take_while(1.., |c: char| c != ' ').parse_next(input)?;
    let _ = ' '.parse_next(input)?;
    let kind: &str = take_while(1.., |c: char| c != ' ').parse_next(input)?;

    Ok(GlobRecord {
        start,
        end: end + 1,
        referenced: referenced.to_string(),
        append: (append != "<>").then(|| append.to_string()),
        kind: kind.to_string(),
    })
}

/// Parse a `.glob` artifact into its set of reference annotations.
///
/// Non-matching lines are ignored; duplicate records collapse through the
/// set. The artifact carries no ordering guarantee, so the set's canonical
/// (start-offset) order is the only order callers should rely on.
pub fn parse_glob(artifact: &str) -> BTreeSet<GlobRecord> {
    artifact
        .lines()
        .filter_map(|line| record_line.parse(line.trim_end()).ok())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
