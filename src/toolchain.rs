//! Artifact generation through the external Coq toolchain.
//!
//! `.glob` cross-reference artifacts are produced by the compiler, not by
//! this crate. The [`ArtifactGateway`] trait is the seam to that external
//! collaborator; the production implementation pipes a makefile generated
//! by `coq_makefile` into `make` to rebuild the requested `.glob` targets.
//! Invocations are blocking with no timeout: a hanging toolchain hangs the
//! pipeline, and callers needing responsiveness must wrap externally.
//!
//! A missing tool binary is a fatal configuration error. A tool that runs
//! but leaves an artifact missing is not: the import extractor falls back
//! to scanning the source text.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::SystemTime;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::names::LibraryName;
use crate::resolver::Resolver;

// ============================================================================
// Gateway Interface
// ============================================================================

/// Captured output of one toolchain invocation.
#[derive(Debug, Clone, Default)]
pub struct GenerationOutcome {
    /// Standard output of the build step.
    pub stdout: String,
    /// Standard error of the build step.
    pub stderr: String,
    /// Exit code of the build step, when it terminated normally.
    pub status: Option<i32>,
}

impl GenerationOutcome {
    /// Whether the build step reported success.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// External collaborator that (re)generates `.glob` artifacts.
///
/// `sources` are the `.v` files to describe to the build system and
/// `targets` the `.glob` files to bring up to date, both relative to
/// `config.root`. Implementations report *how the tool ran*; whether usable
/// artifacts exist afterwards is judged by the caller from the filesystem.
pub trait ArtifactGateway {
    /// Run the toolchain. Blocking; returns once output is fully captured.
    fn generate_globs(
        &self,
        config: &Config,
        sources: &[PathBuf],
        targets: &[PathBuf],
    ) -> Result<GenerationOutcome>;
}

// ============================================================================
// Production Toolchain
// ============================================================================

/// The real Coq toolchain: `coq_makefile` piped into `make -k -f -`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoqToolchain;

impl ArtifactGateway for CoqToolchain {
    fn generate_globs(
        &self,
        config: &Config,
        sources: &[PathBuf],
        targets: &[PathBuf],
    ) -> Result<GenerationOutcome> {
        let coq_makefile =
            which::which(&config.coq_makefile).map_err(|e| Error::Configuration {
                tool: config.coq_makefile.clone(),
                reason: e.to_string(),
            })?;
        let make = which::which("make").map_err(|e| Error::Configuration {
            tool: "make".to_string(),
            reason: e.to_string(),
        })?;

        let mut cmd = Command::new(&coq_makefile);
        cmd.current_dir(&config.root);
        cmd.args(["COQC", "=", config.coqc.as_str()]);
        for binding in config.search_table.bindings() {
            cmd.arg("-R");
            cmd.arg(&binding.physical);
            if binding.logical.is_empty() {
                cmd.arg("\"\"");
            } else {
                cmd.arg(&binding.logical);
            }
        }
        for source in sources {
            cmd.arg(source);
        }
        debug!(command = ?cmd, "generating makefile");
        let makefile = cmd.output().map_err(|e| Error::Configuration {
            tool: config.coq_makefile.clone(),
            reason: e.to_string(),
        })?;
        if !makefile.stderr.is_empty() {
            debug!(
                stderr = %String::from_utf8_lossy(&makefile.stderr),
                "makefile generator diagnostics"
            );
        }

        let mut child = Command::new(&make)
            .args(["-k", "-f", "-"])
            .args(targets)
            .current_dir(&config.root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Configuration {
                tool: "make".to_string(),
                reason: e.to_string(),
            })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&makefile.stdout)?;
        }
        let output = child.wait_with_output()?;

        let outcome = GenerationOutcome {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        };
        if !outcome.success() {
            warn!(status = ?outcome.status, "glob generation exited unsuccessfully");
        }
        Ok(outcome)
    }
}

// ============================================================================
// Freshness Policy
// ============================================================================

/// Whether an artifact is a valid reflection of its source: it exists and
/// its modification time is not older than the source's.
pub(crate) fn glob_is_fresh(glob: &Path, source: &Path) -> bool {
    fn mtime(path: &Path) -> Option<SystemTime> {
        fs::metadata(path).ok()?.modified().ok()
    }
    match (mtime(glob), mtime(source)) {
        (Some(glob_time), Some(source_time)) => glob_time >= source_time,
        _ => false,
    }
}

/// Every `.v` file under `root`, relative to it, following symlinks.
fn all_v_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some("v"))
        .filter_map(|entry| entry.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect()
}

// ============================================================================
// Resolver Integration
// ============================================================================

impl Resolver {
    /// Bring the `.glob` artifacts for `libraries` up to date.
    ///
    /// Libraries with no backing source file are ignored; if every
    /// remaining artifact is already fresh the toolchain is not invoked at
    /// all. An unsuccessful build is not an error here — artifacts that are
    /// still missing afterwards surface as a fallback to heuristic
    /// extraction at the call site. Only a missing tool binary aborts.
    pub fn ensure_globs(&self, libraries: &[LibraryName]) -> Result<()> {
        let extant: Vec<&LibraryName> = libraries
            .iter()
            .filter(|lib| self.library_is_local(lib))
            .collect();
        if extant.is_empty() {
            return Ok(());
        }

        let v_files: Vec<PathBuf> = extant
            .iter()
            .map(|lib| self.path_of_library(lib, ".v"))
            .collect();
        let glob_files: Vec<PathBuf> = extant
            .iter()
            .map(|lib| self.path_of_library(lib, ".glob"))
            .collect();

        let root = self.config().root.clone();
        let fresh = v_files
            .iter()
            .zip(&glob_files)
            .all(|(v, glob)| glob_is_fresh(&root.join(glob), &root.join(v)));
        if fresh {
            return Ok(());
        }

        let mut sources = v_files;
        if self.config().walk_tree {
            for extra in all_v_files(&root) {
                if !sources.contains(&extra) {
                    sources.push(extra);
                }
            }
        }
        sources.sort();

        let outcome = self
            .gateway()
            .generate_globs(self.config(), &sources, &glob_files)?;
        if !outcome.success() {
            warn!(
                status = ?outcome.status,
                "glob generation did not complete cleanly; missing artifacts fall back to source scanning"
            );
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, text: &str) -> PathBuf {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    mod freshness {
        use super::*;

        #[test]
        fn artifact_newer_or_equal_is_fresh() {
            let tmp = TempDir::new().unwrap();
            let v = write(tmp.path(), "A.v", "");
            let glob = write(tmp.path(), "A.glob", "");
            // The artifact was written second; same-second timestamps count
            // as fresh because validity only requires "not older".
            assert!(glob_is_fresh(&glob, &v));
        }

        #[test]
        fn artifact_older_than_source_is_stale() {
            let tmp = TempDir::new().unwrap();
            let v = write(tmp.path(), "A.v", "");
            let glob = write(tmp.path(), "A.glob", "");
            let past = SystemTime::now() - Duration::from_secs(60);
            File::options()
                .write(true)
                .open(&glob)
                .unwrap()
                .set_modified(past)
                .unwrap();
            assert!(!glob_is_fresh(&glob, &v));
        }

        #[test]
        fn missing_artifact_is_stale() {
            let tmp = TempDir::new().unwrap();
            let v = write(tmp.path(), "A.v", "");
            assert!(!glob_is_fresh(&tmp.path().join("A.glob"), &v));
        }
    }

    mod tree_walk {
        use super::*;

        #[test]
        fn finds_nested_sources() {
            let tmp = TempDir::new().unwrap();
            write(tmp.path(), "A.v", "");
            write(tmp.path(), "sub/B.v", "");
            write(tmp.path(), "sub/notes.txt", "");
            let mut files = all_v_files(tmp.path());
            files.sort();
            assert_eq!(files, vec![PathBuf::from("A.v"), PathBuf::from("sub/B.v")]);
        }
    }
}
