//! Import resolution and identifier absolutization for Coq source trees.
//!
//! Given a library name, this crate determines which file implements it,
//! which other libraries it depends on, and — using the compiler-emitted
//! `.glob` cross-reference artifacts — rewrites ambiguous short identifiers
//! in the source text into fully-qualified names:
//!
//! - Library⇄file name mapping over an ordered physical/logical search
//!   table, with best-effort fallbacks for unbound names
//! - Direct-import extraction, authoritative (from artifacts) or heuristic
//!   (from `Require`/`Load` statements), with an explicit fallback policy
//! - Memoized transitive import closures with cycle detection
//! - Span-based absolutization of identifier references
//!
//! All state lives in a [`Resolver`] value; nothing is ambient and nothing
//! persists past the process.

pub mod config;
pub mod error;
pub mod extract;
pub mod glob;
pub mod graph;
pub mod names;
pub mod paths;
pub mod resolver;
pub mod rewrite;
pub mod toolchain;

pub use config::Config;
pub use error::{Error, Result};
pub use extract::{GlobExtractor, ImportExtractor, TextExtractor};
pub use glob::{
    covers_all_kinds, parse_glob, GlobRecord, ALL_ABSOLUTIZE_KINDS, IMPORT_ABSOLUTIZE_KINDS,
};
pub use names::{LibraryName, PathBinding, SearchTable};
pub use resolver::Resolver;
pub use rewrite::{absolutize, identity_transform};
pub use toolchain::{ArtifactGateway, CoqToolchain, GenerationOutcome};
