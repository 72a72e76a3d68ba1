//! End-to-end vendoring tests.
//!
//! These drive the library against temporary GOPATH-style trees with a
//! scripted fetch tool in place of `go get`.

use govend::config::ProjectContext;
use govend::deps::{
    FetchOutcome, FetchTool, FetchToolError, VendorOptions, vendor_imports, vendor_project,
};
use govend::error::VendorError;
use govend::scanner::ImportSet;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Stages a fixed set of files per import and records every call.
#[derive(Default)]
struct ScriptedFetcher {
    files: HashMap<String, Vec<(String, Vec<u8>)>>,
    not_found: HashSet<String>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    fn stage(mut self, import: &str, rel: &str, content: &[u8]) -> Self {
        self.files
            .entry(import.to_string())
            .or_default()
            .push((rel.to_string(), content.to_vec()));
        self
    }

    fn not_found(mut self, import: &str) -> Self {
        self.not_found.insert(import.to_string());
        self
    }

    fn failing(mut self, import: &str) -> Self {
        self.failing.insert(import.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }
}

impl FetchTool for ScriptedFetcher {
    fn fetch(&self, import_path: &str, workspace: &Path) -> Result<String, FetchToolError> {
        self.calls.lock().unwrap().push(import_path.to_string());
        if self.not_found.contains(import_path) {
            return Err(FetchToolError::NotFound(format!(
                "cannot find package \"{import_path}\""
            )));
        }
        if self.failing.contains(import_path) {
            return Err(FetchToolError::Failed("network is unreachable".to_string()));
        }
        for (rel, content) in self.files.get(import_path).into_iter().flatten() {
            let path = workspace.join("src").join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        Ok(String::new())
    }
}

struct Workspace {
    tmp: TempDir,
    ctx: ProjectContext,
}

impl Workspace {
    /// A project at `<tmp>/src/acme/app`.
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let root = src.join("acme").join("app");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(tmp.path().join("staging")).unwrap();
        let ctx = ProjectContext::resolve(&root, &src).unwrap();
        Self { tmp, ctx }
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.ctx.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn staging_parent(&self) -> PathBuf {
        self.tmp.path().join("staging")
    }

    fn options(&self, jobs: usize) -> VendorOptions {
        VendorOptions {
            jobs,
            staging_parent: Some(self.staging_parent()),
            ..VendorOptions::default()
        }
    }

    fn staging_is_empty(&self) -> bool {
        fs::read_dir(self.staging_parent()).unwrap().next().is_none()
    }

    fn vendor(&self, rel: &str) -> PathBuf {
        self.ctx.vendor_root.join(rel)
    }

    /// Every file under vendor/, relative, with its bytes.
    fn vendor_tree(&self) -> Vec<(PathBuf, Vec<u8>)> {
        let mut out: Vec<(PathBuf, Vec<u8>)> = WalkDir::new(&self.ctx.vendor_root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let rel = e.path().strip_prefix(&self.ctx.vendor_root).unwrap().to_path_buf();
                (rel, fs::read(e.path()).unwrap())
            })
            .collect();
        out.sort();
        out
    }
}

fn import_set(paths: &[&str]) -> ImportSet {
    paths.iter().map(|p| p.to_string()).collect()
}

#[test]
fn test_scenario_self_and_external_imports() {
    let ws = Workspace::new();
    ws.write(
        "main.go",
        "package main\n\nimport (\n\t\"acme/app/util\"\n\t\"github.com/x/lib\"\n)\n",
    );
    ws.write("util/util.go", "package util\n");
    let lib_bytes = b"package lib\n\nfunc Hello() string { return \"hi\" }\n";
    let tool = ScriptedFetcher::default().stage("github.com/x/lib", "github.com/x/lib/lib.go", lib_bytes);

    let report = vendor_project(&ws.ctx, &tool, &ws.options(1)).unwrap();

    assert_eq!(tool.calls(), vec!["github.com/x/lib"]);
    assert_eq!(fs::read(ws.vendor("github.com/x/lib/lib.go")).unwrap(), lib_bytes);
    assert!(!ws.vendor("acme").exists());
    assert_eq!(report.vendored().collect::<Vec<_>>(), vec!["github.com/x/lib"]);
    assert!(ws.staging_is_empty());
}

#[test]
fn test_builtin_tolerance() {
    let ws = Workspace::new();
    ws.write(
        "main.go",
        "package main\nimport (\n\"fmt\"\n\"github.com/x/lib\"\n)\n",
    );
    let tool = ScriptedFetcher::default()
        .not_found("fmt")
        .stage("github.com/x/lib", "github.com/x/lib/lib.go", b"package lib\n");

    let report = vendor_project(&ws.ctx, &tool, &ws.options(2)).unwrap();

    assert!(!ws.vendor("fmt").exists());
    assert!(ws.vendor("github.com/x/lib/lib.go").is_file());
    let fmt = report.results.iter().find(|r| r.import_path == "fmt").unwrap();
    assert_eq!(fmt.outcome, FetchOutcome::AssumedBuiltin);
    assert_eq!(report.builtin().collect::<Vec<_>>(), vec!["fmt"]);
}

#[test]
fn test_fetch_failure_aborts_and_releases_staging() {
    let ws = Workspace::new();
    ws.write(
        "main.go",
        "package main\nimport (\n\"a.com/ok\"\n\"b.com/broken\"\n\"c.com/ok\"\n)\n",
    );
    let tool = ScriptedFetcher::default()
        .stage("a.com/ok", "a.com/ok/ok.go", b"package ok\n")
        .failing("b.com/broken")
        .stage("c.com/ok", "c.com/ok/ok.go", b"package ok\n");

    let err = vendor_project(&ws.ctx, &tool, &ws.options(1)).unwrap_err();

    match err {
        VendorError::Fetch {
            import_path,
            message,
        } => {
            assert_eq!(import_path, "b.com/broken");
            assert!(message.contains("unreachable"));
        }
        other => panic!("unexpected error: {other}"),
    }
    // With one worker, nothing after the failing import is started.
    assert_eq!(tool.calls(), vec!["a.com/ok", "b.com/broken"]);
    assert!(ws.vendor("a.com/ok/ok.go").is_file());
    assert!(!ws.vendor("c.com").exists());
    assert!(ws.staging_is_empty());
}

#[test]
fn test_scan_error_aborts_before_fetching() {
    let ws = Workspace::new();
    ws.write("main.go", "package main\nimport \"a.com/ok\"\n");
    ws.write("pkg/bad.go", "package pkg\nimport (\n\"a.com/never\"\n");
    ws.write("vendor/old.com/keep/keep.go", "package keep\n");
    let tool = ScriptedFetcher::default();

    let err = vendor_project(&ws.ctx, &tool, &ws.options(1)).unwrap_err();

    assert!(matches!(err, VendorError::Scan { .. }));
    assert!(tool.calls().is_empty());
    assert!(ws.vendor("old.com/keep/keep.go").is_file());
}

#[test]
fn test_revendoring_is_idempotent() {
    let ws = Workspace::new();
    ws.write("main.go", "package main\nimport \"github.com/x/lib\"\n");
    ws.write("vendor/stale.com/gone/gone.go", "package gone\n");
    let tool = ScriptedFetcher::default()
        .stage("github.com/x/lib", "github.com/x/lib/lib.go", b"package lib\n")
        .stage("github.com/x/lib", "github.com/x/lib/sub/sub.go", b"package sub\n");

    vendor_project(&ws.ctx, &tool, &ws.options(1)).unwrap();
    let first = ws.vendor_tree();
    vendor_project(&ws.ctx, &tool, &ws.options(1)).unwrap();
    let second = ws.vendor_tree();

    assert_eq!(first, second);
    assert!(!ws.vendor("stale.com").exists());
    assert_eq!(
        first.iter().map(|(p, _)| p.clone()).collect::<Vec<_>>(),
        vec![
            PathBuf::from("github.com/x/lib/lib.go"),
            PathBuf::from("github.com/x/lib/sub/sub.go"),
        ]
    );
}

#[test]
fn test_only_qualifying_files_are_vendored() {
    let ws = Workspace::new();
    ws.write("main.go", "package main\nimport \"github.com/x/lib\"\n");
    let mut tool = ScriptedFetcher::default();
    for rel in [
        "vendor/nested.com/n/n.go",
        "testdata/fixture.go",
        ".hidden/h.go",
        "_hidden/h.go",
        "foo_test.go",
        "foo.go",
        "foo.txt",
    ] {
        tool = tool.stage(
            "github.com/x/lib",
            &format!("github.com/x/lib/{rel}"),
            b"package lib\n",
        );
    }

    vendor_project(&ws.ctx, &tool, &ws.options(1)).unwrap();

    let files: Vec<PathBuf> = ws.vendor_tree().into_iter().map(|(p, _)| p).collect();
    assert_eq!(files, vec![PathBuf::from("github.com/x/lib/foo.go")]);
}

#[test]
fn test_worker_pool_vendors_every_import_and_shared_transitives() {
    let ws = Workspace::new();
    let imports: Vec<String> = (0..8).map(|i| format!("host{i}.com/pkg")).collect();
    let mut tool = ScriptedFetcher::default();
    for import in &imports {
        tool = tool
            .stage(import, &format!("{import}/pkg.go"), import.as_bytes())
            .stage(import, "shared.com/dep/dep.go", b"package dep\n");
    }
    let set: ImportSet = imports.iter().cloned().collect();

    let report = vendor_imports(&ws.ctx, &set, &tool, &ws.options(4)).unwrap();

    assert_eq!(report.results.len(), 8);
    for import in &imports {
        let bytes = fs::read(ws.vendor(&format!("{import}/pkg.go"))).unwrap();
        assert_eq!(bytes, import.as_bytes());
    }
    assert_eq!(
        fs::read(ws.vendor("shared.com/dep/dep.go")).unwrap(),
        b"package dep\n"
    );
    assert_eq!(tool.calls().len(), 8);
    assert!(ws.staging_is_empty());
}

#[test]
fn test_empty_import_set_leaves_empty_vendor() {
    let ws = Workspace::new();
    ws.write("vendor/stale.com/s/s.go", "package s\n");
    let tool = ScriptedFetcher::default();

    let report = vendor_imports(&ws.ctx, &import_set(&[]), &tool, &ws.options(1)).unwrap();

    assert!(report.results.is_empty());
    assert!(ws.ctx.vendor_root.is_dir());
    assert!(ws.vendor_tree().is_empty());
}

#[test]
fn test_fetched_but_empty_import_counts_as_builtin() {
    let ws = Workspace::new();
    let tool = ScriptedFetcher::default();

    let report = vendor_imports(&ws.ctx, &import_set(&["os"]), &tool, &ws.options(1)).unwrap();

    assert_eq!(report.results[0].outcome, FetchOutcome::Fetched);
    assert_eq!(report.builtin().collect::<Vec<_>>(), vec!["os"]);
    assert!(!ws.vendor("os").exists());
}

#[test]
fn test_project_outside_source_root_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let project = tmp.path().join("elsewhere").join("app");
    fs::create_dir_all(&project).unwrap();

    let err = ProjectContext::resolve(&project, &tmp.path().join("src")).unwrap_err();
    assert!(matches!(err, VendorError::Configuration { .. }));
}
