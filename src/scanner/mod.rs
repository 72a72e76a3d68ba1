//! Project import scanning.
//!
//! Walks the project tree directory by directory, reads the import header
//! of every Go file in each directory and collects the external import
//! paths. Imports that point back into the project itself are dropped.
//! One malformed file fails the whole scan: a partial import set would
//! silently under-vendor.

mod parse;

pub use parse::{ImportSpec, ParseError, parse_imports};

use crate::config::ProjectContext;
use crate::error::{Result, VendorError};
use crate::ignore::{Decision, IgnorePolicy};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Unique import paths, ordered for stable output.
pub type ImportSet = BTreeSet<String>;

pub fn scan(ctx: &ProjectContext, include_tests: bool) -> Result<ImportSet> {
    let policy = if include_tests {
        IgnorePolicy::default().keeping_tests()
    } else {
        IgnorePolicy::default()
    };

    let dirs = package_dirs(&ctx.root, &policy)?;
    let per_dir = dirs
        .par_iter()
        .map(|dir| scan_dir(dir, &policy))
        .collect::<Result<Vec<_>>>()?;

    Ok(per_dir
        .into_iter()
        .flatten()
        .filter(|import| !ctx.is_self_import(import))
        .collect())
}

/// Every directory under `root` the ignore policy lets us descend into,
/// `root` included.
fn package_dirs(root: &Path, policy: &IgnorePolicy) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        e.depth() == 0
            || !e.file_type().is_dir()
            || policy.decide(e.path(), true) != Decision::SkipSubtree
    });

    let mut dirs = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| VendorError::Scan {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
            line: None,
            message: e.to_string(),
        })?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

/// Imports of every Go file directly inside `dir`, in file-name order.
pub fn scan_dir(dir: &Path, policy: &IgnorePolicy) -> Result<Vec<String>> {
    let read_err = |path: &Path, e: std::io::Error| VendorError::Scan {
        path: path.to_path_buf(),
        line: None,
        message: e.to_string(),
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| read_err(dir, e))? {
        let entry = entry.map_err(|e| read_err(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("go") {
            continue;
        }
        if policy.decide(&path, false) == Decision::Include {
            files.push(path);
        }
    }
    files.sort();

    let mut imports = Vec::new();
    for file in files {
        // Invalid UTF-8 past the header must not fail the file; inside an
        // import path it decodes to U+FFFD, which the parser rejects.
        let bytes = fs::read(&file).map_err(|e| read_err(&file, e))?;
        let src = String::from_utf8_lossy(&bytes);
        let specs = parse_imports(&src).map_err(|e| VendorError::Scan {
            path: file.clone(),
            line: Some(e.line),
            message: e.message,
        })?;
        imports.extend(specs.into_iter().map(|s| s.path));
    }
    Ok(imports)
}
