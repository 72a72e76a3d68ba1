//! Run configuration: `govend.toml` plus the project/source-root layout.
//!
//! ```toml
//! source_root = "/home/me/go/src"
//!
//! [vendor]
//! jobs = 4
//! extra_extensions = ["proto"]
//!
//! [scan]
//! include_tests = true
//!
//! [fetch]
//! program = "go"
//! args = ["get", "-d"]
//! timeout_secs = 600
//! ```
//!
//! The default fetch command, `go get -d` with `GO111MODULE=off`, needs a Go
//! toolchain that still supports GOPATH mode (Go 1.21 or older). Go 1.22
//! removed `go get` outside modules: it exits non-zero with output that
//! matches no not-found pattern, so every import fails the run. On newer
//! toolchains point `[fetch]` at a tool that clones into `$GOPATH/src`:
//!
//! ```toml
//! [fetch]
//! program = "sh"
//! args = ["-c", 'git clone --depth 1 "https://$0" "$GOPATH/src/$0"']
//! env = {}
//! not_found_patterns = ["could not resolve host", "repository .* not found"]
//! ```
//!
//! The import path is passed as the last argument, which `sh -c` binds to
//! `$0`. Only imports that name a repository root can be cloned this way.

use crate::error::{Result, VendorError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const CONFIG_FILE: &str = "govend.toml";

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct VendorConfig {
    pub source_root: Option<PathBuf>,
    #[serde(default)]
    pub vendor: VendorSection,
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct VendorSection {
    /// Worker pool size. Defaults to the machine's available parallelism.
    pub jobs: Option<usize>,
    #[serde(default)]
    pub extra_extensions: Vec<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ScanSection {
    #[serde(default = "default_true")]
    pub include_tests: bool,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            include_tests: true,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default = "default_env")]
    pub env: BTreeMap<String, String>,
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_not_found_patterns")]
    pub not_found_patterns: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            env: default_env(),
            timeout_secs: None,
            not_found_patterns: default_not_found_patterns(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_program() -> String {
    "go".to_string()
}

fn default_args() -> Vec<String> {
    vec!["get".to_string(), "-d".to_string()]
}

fn default_env() -> BTreeMap<String, String> {
    // GOPATH mode: `go get` only honors GOPATH when modules are off.
    BTreeMap::from([("GO111MODULE".to_string(), "off".to_string())])
}

fn default_not_found_patterns() -> Vec<String> {
    [
        "cannot find package",
        "unrecognized import path",
        "is not in GOROOT",
        "is not in std",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Load `govend.toml` from the project root, or defaults when absent.
pub fn load_config(project_root: &Path) -> Result<VendorConfig> {
    let path = project_root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(VendorConfig::default());
    }
    let content = fs::read_to_string(&path).map_err(|e| VendorError::InvalidConfig {
        path: path.clone(),
        message: e.to_string(),
    })?;
    parse_config(&content).map_err(|message| VendorError::InvalidConfig { path, message })
}

fn parse_config(content: &str) -> std::result::Result<VendorConfig, String> {
    let config: VendorConfig = toml::from_str(content).map_err(|e| e.to_string())?;
    if config.vendor.jobs == Some(0) {
        return Err("vendor.jobs must be at least 1".to_string());
    }
    if config.fetch.program.trim().is_empty() {
        return Err("fetch.program must not be empty".to_string());
    }
    Ok(config)
}

/// `$GOPATH/src` for the first GOPATH entry, falling back to `~/go/src`.
pub fn default_source_root() -> Option<PathBuf> {
    if let Some(gopath) = std::env::var_os("GOPATH")
        && let Some(first) = std::env::split_paths(&gopath).find(|p| !p.as_os_str().is_empty())
    {
        return Some(first.join("src"));
    }
    dirs::home_dir().map(|home| home.join("go").join("src"))
}

/// The project being vendored and where it sits under the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    pub root: PathBuf,
    pub source_root: PathBuf,
    /// The project's own import path, e.g. `acme/app`.
    pub import_path: String,
    pub vendor_root: PathBuf,
}

impl ProjectContext {
    /// Resolve `dir` (made absolute) against `source_root`. Fails with a
    /// configuration error unless the project lies strictly inside it.
    pub fn resolve(dir: &Path, source_root: &Path) -> Result<Self> {
        let root = absolute(dir);
        let source_root = absolute(source_root);
        let Some(import_path) = import_path_of(&root, &source_root) else {
            return Err(VendorError::Configuration {
                project: root,
                source_root,
            });
        };
        Ok(Self {
            vendor_root: root.join("vendor"),
            root,
            source_root,
            import_path,
        })
    }

    /// Whether an import refers back into this project.
    pub fn is_self_import(&self, import: &str) -> bool {
        import.starts_with(&self.import_path)
    }
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Project root relative to the source root, joined with `/`.
fn import_path_of(root: &Path, source_root: &Path) -> Option<String> {
    let rel = root.strip_prefix(source_root).ok()?;
    let segments: Vec<String> = rel
        .components()
        .map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Option<_>>()?;
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}
