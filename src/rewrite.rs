//! Span-based identifier absolutization.
//!
//! Given a source text and the reference annotations the compiler emitted
//! for it, [`absolutize`] rewrites short identifier references into their
//! fully-qualified forms. Records are considered in descending start order
//! so that replacing one span never invalidates the offsets of the spans
//! still to be processed; the output is assembled by an immutable builder
//! that copies the untouched segments between accepted spans, never by
//! splicing a shared buffer in place.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::Result;
use crate::glob::{parse_glob, GlobRecord};
use crate::names::LibraryName;
use crate::paths::{append_extension, clean_rel};
use crate::resolver::Resolver;
use crate::toolchain::glob_is_fresh;

/// Identity name transform; qualifies with the referenced name as-is.
pub fn identity_transform(name: &str) -> String {
    name.to_string()
}

/// The trailing identifier segment of a span's text: the last dot-separated
/// component of its first space-separated word.
///
/// Used as a sanity check before substituting a span that carries an
/// appended suffix; record-builder notation and similar syntactic forms
/// produce spans whose trailing segment does not match the suffix, and
/// substituting those would corrupt the source.
fn trailing_segment(span_text: &str) -> &str {
    let first_word = span_text.split(' ').next().unwrap_or("");
    first_word.rsplit('.').next().unwrap_or(first_word)
}

/// Rewrite `source`, replacing annotated reference spans with qualified
/// names.
///
/// A record is applied when its kind is listed in `kinds` and it points at a
/// library other than `owner` (references to the owning library are already
/// local). Records whose appended suffix does not match the span's trailing
/// identifier are skipped, as are records whose span falls outside the
/// source. The replacement for an accepted record is
/// `transform(referenced)`, plus `"." + append` when a suffix is present.
///
/// The result is a pure function of the inputs; record sets compare equal
/// regardless of insertion order, and so does the output.
pub fn absolutize(
    source: &str,
    records: &BTreeSet<GlobRecord>,
    owner: &LibraryName,
    kinds: &[&str],
    transform: &dyn Fn(&str) -> String,
) -> String {
    // Decide replacements walking spans from the end of the text backwards.
    // `limit` tracks the start of the previously accepted span; anything
    // reaching past it overlaps and is dropped.
    let mut replacements: Vec<(usize, usize, String)> = Vec::new();
    let mut limit = source.len();

    for record in records.iter().rev() {
        if !kinds.contains(&record.kind.as_str()) || record.referenced == owner.as_str() {
            debug!(
                kind = %record.kind,
                referenced = %record.referenced,
                start = record.start,
                "skipping reference"
            );
            continue;
        }
        let Some(span_text) = record.span_text(source) else {
            warn!(
                start = record.start,
                end = record.end,
                len = source.len(),
                "annotation span out of bounds; skipping"
            );
            continue;
        };
        if record.end > limit {
            warn!(
                start = record.start,
                end = record.end,
                "annotation span overlaps an already-qualified span; skipping"
            );
            continue;
        }
        if let Some(append) = &record.append {
            if trailing_segment(span_text) != append {
                debug!(
                    span = span_text,
                    append = %append,
                    "appended suffix does not match span text; skipping"
                );
                continue;
            }
        }

        let mut replacement = transform(&record.referenced);
        if let Some(append) = &record.append {
            replacement.push('.');
            replacement.push_str(append);
        }
        debug!(from = span_text, to = %replacement, "qualifying reference");
        limit = record.start;
        replacements.push((record.start, record.end, replacement));
    }

    // Accumulate untouched segments between the accepted spans, in text
    // order (the replacements were collected back-to-front).
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for (start, end, replacement) in replacements.iter().rev() {
        out.push_str(&source[cursor..*start]);
        out.push_str(replacement);
        cursor = *end;
    }
    out.push_str(&source[cursor..]);
    out
}

// ============================================================================
// Resolver Integration
// ============================================================================

impl Resolver {
    /// The text of a source file with its references absolutized.
    ///
    /// `path` is workspace-relative; a missing `.v` extension is appended.
    /// The raw text is read through the mtime cache and never overwritten
    /// with the qualified form. With `update_globs` the artifact is brought
    /// up to date through the gateway first. A missing artifact, or one
    /// older than the source, leaves the text unqualified (the stale case
    /// is warned about); an empty kind set short-circuits to the raw text.
    pub fn qualified_source(
        &self,
        path: &Path,
        kinds: &[&str],
        update_globs: bool,
        transform: &dyn Fn(&str) -> String,
    ) -> Result<String> {
        let mut rel = clean_rel(path);
        if rel.extension().and_then(|e| e.to_str()) != Some("v") {
            rel = append_extension(rel, ".v");
        }
        let owner = self.library_of_path(&rel);
        let raw = self.source_text(&rel)?;
        if kinds.is_empty() {
            return Ok(raw);
        }

        if update_globs {
            self.ensure_globs(std::slice::from_ref(&owner))?;
        }

        let glob_rel = rel.with_extension("glob");
        let glob_abs = self.absolute(&glob_rel);
        if !glob_abs.is_file() {
            return Ok(raw);
        }
        if !glob_is_fresh(&glob_abs, &self.absolute(&rel)) {
            warn!(
                artifact = %glob_rel.display(),
                source = %rel.display(),
                "assuming the artifact is not a valid reflection of the source because the source is newer"
            );
            return Ok(raw);
        }

        let records = parse_glob(&fs::read_to_string(&glob_abs)?);
        Ok(absolutize(&raw, &records, &owner, kinds, transform))
    }
}

// ============================================================================
// Tests
// ============================================================================
