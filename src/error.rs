//! Unified error type for coqmap.
//!
//! Only genuinely fatal conditions are errors: a missing external tool, a
//! cyclic import chain, or an IO failure. Everything else the resolution
//! pipeline can recover from locally (stale or missing artifacts, suspicious
//! annotations, ambiguous round-trip names) is reported through `tracing`
//! and never aborts the caller.

use std::io;

use thiserror::Error;

use crate::names::LibraryName;

/// Errors that abort a resolution operation.
#[derive(Debug, Error)]
pub enum Error {
    /// A required external tool binary is missing or cannot be spawned.
    ///
    /// This is a configuration problem the library cannot recover from;
    /// the CLI exits on it.
    #[error("required tool '{tool}' is not available: {reason}")]
    Configuration { tool: String, reason: String },

    /// The import graph contains a cycle.
    ///
    /// The chain lists the libraries along the cycle, starting and ending
    /// at the library that was re-entered.
    #[error("cyclic import chain: {}", format_chain(.chain))]
    CyclicImport { chain: Vec<LibraryName> },

    /// IO failure while reading sources or artifacts.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Exit code for the CLI: configuration problems get their own code so
    /// wrapper scripts can tell "install the toolchain" from everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Configuration { .. } => 2,
            _ => 1,
        }
    }
}

fn format_chain(chain: &[LibraryName]) -> String {
    chain
        .iter()
        .map(LibraryName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
