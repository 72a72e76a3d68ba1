//! Which filesystem entries take part in scanning and vendoring.
//!
//! The same [`IgnorePolicy`] is consulted by the import scanner and by the
//! materializer, so both phases agree on what matters. Decisions depend only
//! on the entry's base name and kind, never on the filesystem, which makes
//! the policy testable against a virtual listing of [`FileEntry`] values.

use std::path::{Component, Path, PathBuf};

/// Extensions the Go toolchain builds from: Go sources, assembly, and the
/// C/C++/Objective-C, SWIG and object files consumed by cgo.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "go", "s", "S", "sx", "c", "h", "cc", "cpp", "cxx", "hh", "hpp", "hxx", "m", "swig",
    "swigcxx", "syso",
];

/// Directory names whose whole subtree is skipped.
const SKIPPED_DIRS: &[&str] = &["vendor", "testdata"];

const TEST_SUFFIX: &str = "_test.go";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Include,
    /// Omit this file.
    SkipEntry,
    /// Omit this directory and do not descend into it.
    SkipSubtree,
}

/// An entry seen during a tree walk, relative to the walk root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub rel_path: PathBuf,
    pub is_dir: bool,
}

impl FileEntry {
    pub fn file(rel_path: impl Into<PathBuf>) -> Self {
        Self {
            rel_path: rel_path.into(),
            is_dir: false,
        }
    }

    pub fn dir(rel_path: impl Into<PathBuf>) -> Self {
        Self {
            rel_path: rel_path.into(),
            is_dir: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IgnorePolicy {
    extensions: Vec<String>,
    skip_tests: bool,
}

impl Default for IgnorePolicy {
    fn default() -> Self {
        Self {
            extensions: SOURCE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            skip_tests: true,
        }
    }
}

impl IgnorePolicy {
    /// Default policy plus extra admitted extensions (leading dots are ignored).
    pub fn with_extra_extensions<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policy = Self::default();
        for ext in extra {
            let ext = ext.as_ref().trim_start_matches('.');
            if !ext.is_empty() && !policy.extensions.iter().any(|e| e == ext) {
                policy.extensions.push(ext.to_string());
            }
        }
        policy
    }

    /// Keep `_test.go` files. The scanner uses this to read a project's test
    /// imports; the materializer never does.
    pub fn keeping_tests(mut self) -> Self {
        self.skip_tests = false;
        self
    }

    pub fn decide(&self, path: &Path, is_dir: bool) -> Decision {
        let Some(name) = path.file_name() else {
            // "..", "/" and friends carry no base name to judge.
            return Decision::Include;
        };
        let name = name.to_string_lossy();
        let name: &str = name.as_ref();
        let hidden = name.starts_with('.') || name.starts_with('_');

        if is_dir {
            if hidden || SKIPPED_DIRS.contains(&name) {
                return Decision::SkipSubtree;
            }
            return Decision::Include;
        }

        if hidden {
            return Decision::SkipEntry;
        }
        if self.skip_tests && name.ends_with(TEST_SUFFIX) {
            return Decision::SkipEntry;
        }
        let admitted = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext));
        if admitted {
            Decision::Include
        } else {
            Decision::SkipEntry
        }
    }

    /// Whether an entry survives a walk from the root: every ancestor
    /// segment is judged as a directory, then the entry itself.
    pub fn admits(&self, entry: &FileEntry) -> bool {
        let segments: Vec<&std::ffi::OsStr> = entry
            .rel_path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s),
                _ => None,
            })
            .collect();
        let Some((last, ancestors)) = segments.split_last() else {
            return false;
        };
        if ancestors
            .iter()
            .any(|seg| self.decide(Path::new(seg), true) == Decision::SkipSubtree)
        {
            return false;
        }
        self.decide(Path::new(last), entry.is_dir) == Decision::Include
    }

    /// Files of a virtual listing that would be copied.
    pub fn filter_listing<'a>(&self, listing: &'a [FileEntry]) -> Vec<&'a FileEntry> {
        listing
            .iter()
            .filter(|e| !e.is_dir && self.admits(e))
            .collect()
    }
}
