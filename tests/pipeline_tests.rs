//! End-to-end pipeline tests over real temporary workspaces.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use coqmap::{
    identity_transform, ArtifactGateway, Config, Error, GenerationOutcome, LibraryName,
    PathBinding, Resolver, SearchTable, IMPORT_ABSOLUTIZE_KINDS,
};

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

fn root_config(root: &Path) -> Config {
    Config::new(root).with_table(SearchTable::new(vec![PathBinding::new(".", "")]))
}

fn lib(name: &str) -> LibraryName {
    LibraryName::new(name)
}

/// Gateway that "builds" by writing canned artifacts for requested targets.
struct WritingGateway {
    calls: Arc<AtomicUsize>,
    artifacts: HashMap<PathBuf, String>,
}

impl ArtifactGateway for WritingGateway {
    fn generate_globs(
        &self,
        config: &Config,
        _sources: &[PathBuf],
        targets: &[PathBuf],
    ) -> coqmap::Result<GenerationOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for target in targets {
            if let Some(text) = self.artifacts.get(target) {
                fs::write(config.root.join(target), text)?;
            }
        }
        Ok(GenerationOutcome {
            status: Some(0),
            ..Default::default()
        })
    }
}

/// Gateway that runs "successfully" but never produces anything.
struct BrokenGateway;

impl ArtifactGateway for BrokenGateway {
    fn generate_globs(
        &self,
        _config: &Config,
        _sources: &[PathBuf],
        _targets: &[PathBuf],
    ) -> coqmap::Result<GenerationOutcome> {
        Ok(GenerationOutcome {
            status: Some(2),
            stderr: "make: *** No rule to make target".to_string(),
            ..Default::default()
        })
    }
}

#[test]
fn fast_closure_of_a_small_tree() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "Top.v", "Require Import A B.\n");
    write(tmp.path(), "A.v", "Require Import B.\n");
    write(tmp.path(), "B.v", "");
    let resolver = Resolver::new(root_config(tmp.path()));

    let closure = resolver.transitive_imports(&lib("Top"), true).unwrap();
    assert_eq!(closure, vec![lib("B"), lib("A"), lib("Top")]);
}

#[test]
fn heuristic_imports_are_sorted_and_keep_external_names() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "A.v", "Require Import Foo.Bar Baz.\n");
    let resolver = Resolver::new(root_config(tmp.path()));

    let imports = resolver.direct_imports(&lib("A"), true).unwrap();
    assert_eq!(imports, vec![lib("Baz"), lib("Foo.Bar")]);
}

#[test]
fn authoritative_closure_generates_artifacts_on_demand() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "Top.v", "Require Import A B.\n");
    write(tmp.path(), "A.v", "Require Import B.\n");
    write(tmp.path(), "B.v", "");

    let calls = Arc::new(AtomicUsize::new(0));
    let artifacts = HashMap::from([
        (
            PathBuf::from("Top.glob"),
            "R15:15 A <> <> lib\nR17:17 B <> <> lib\n".to_string(),
        ),
        (PathBuf::from("A.glob"), "R15:15 B <> <> lib\n".to_string()),
        (PathBuf::from("B.glob"), "F B\n".to_string()),
    ]);
    let resolver = Resolver::with_gateway(
        root_config(tmp.path()),
        Box::new(WritingGateway {
            calls: Arc::clone(&calls),
            artifacts,
        }),
    );

    let closure = resolver.transitive_imports(&lib("Top"), false).unwrap();
    assert_eq!(closure, vec![lib("B"), lib("A"), lib("Top")]);
    assert!(calls.load(Ordering::SeqCst) >= 1);
    assert!(tmp.path().join("Top.glob").is_file());
    assert!(tmp.path().join("A.glob").is_file());

    // Everything is fresh now: another run does no further generation.
    let before = calls.load(Ordering::SeqCst);
    let again = resolver.transitive_imports(&lib("Top"), false).unwrap();
    assert_eq!(again, closure);
    assert_eq!(calls.load(Ordering::SeqCst), before);
}

#[test]
fn failed_generation_falls_back_to_source_scanning() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "Top.v", "Require Import A.\n");
    write(tmp.path(), "A.v", "");
    let resolver = Resolver::with_gateway(root_config(tmp.path()), Box::new(BrokenGateway));

    let closure = resolver.transitive_imports(&lib("Top"), false).unwrap();
    assert_eq!(closure, vec![lib("A"), lib("Top")]);
}

#[test]
fn missing_toolchain_binary_is_a_fatal_configuration_error() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "A.v", "Require Import B.\n");
    let config = root_config(tmp.path()).with_coq_makefile("coqmap-no-such-tool-4f1");
    let resolver = Resolver::new(config);

    let err = resolver.direct_imports(&lib("A"), false).unwrap_err();
    match err {
        Error::Configuration { tool, .. } => assert_eq!(tool, "coqmap-no-such-tool-4f1"),
        other => panic!("expected Configuration, got {other}"),
    }
}

#[test]
fn qualify_rewrites_imports_under_a_named_binding() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "theories/Algebra.v", "Require Import Groups.\n");
    write(tmp.path(), "theories/Groups.v", "");
    write(
        tmp.path(),
        "theories/Algebra.glob",
        "R15:20 MyLib.Groups <> <> lib\n",
    );
    let config = Config::new(tmp.path())
        .with_table(SearchTable::new(vec![PathBinding::new("theories", "MyLib")]));
    let resolver = Resolver::new(config);

    let out = resolver
        .qualified_source(
            Path::new("theories/Algebra.v"),
            IMPORT_ABSOLUTIZE_KINDS,
            false,
            &identity_transform,
        )
        .unwrap();
    assert_eq!(out, "Require Import MyLib.Groups.\n");
}

#[test]
fn qualify_leaves_already_local_references_alone() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "A.v", "Definition one := 1.\nCheck one.\n");
    // The only reference points back at the owning library.
    write(tmp.path(), "A.glob", "R27:29 A <> one def\n");
    let resolver = Resolver::new(root_config(tmp.path()));

    let out = resolver
        .qualified_source(
            Path::new("A.v"),
            coqmap::ALL_ABSOLUTIZE_KINDS,
            false,
            &identity_transform,
        )
        .unwrap();
    assert_eq!(out, "Definition one := 1.\nCheck one.\n");
}
