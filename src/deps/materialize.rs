//! Copying staged packages into the project's `vendor/` tree.
//!
//! A file at `<staging src>/<import path>/<file>` lands at
//! `<vendor>/<import path>/<file>`; only entries the [`IgnorePolicy`]
//! includes are copied, byte for byte.

use crate::error::{Result, VendorError};
use crate::ignore::{Decision, IgnorePolicy};
use std::fs;
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// Remove whatever a previous run left in `vendor_root` and recreate it
/// empty, so re-vendoring never accretes stale packages.
pub fn clear_vendor_root(vendor_root: &Path) -> Result<()> {
    match fs::remove_dir_all(vendor_root) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(VendorError::materialize("clearing", vendor_root, e)),
    }
    fs::create_dir_all(vendor_root)
        .map_err(|e| VendorError::materialize("creating directory", vendor_root, e))
}

/// Clear `vendor_root`, then copy every qualifying file of `staging_src`.
pub fn materialize(staging_src: &Path, vendor_root: &Path, policy: &IgnorePolicy) -> Result<usize> {
    clear_vendor_root(vendor_root)?;
    copy_tree(staging_src, vendor_root, policy)
}

/// Copy qualifying files of `staging_src` under `vendor_root`, keeping their
/// relative paths. Existing files are replaced. Returns the number of files
/// copied; a missing `staging_src` copies nothing.
pub fn copy_tree(staging_src: &Path, vendor_root: &Path, policy: &IgnorePolicy) -> Result<usize> {
    if !staging_src.exists() {
        return Ok(0);
    }

    let walker = WalkDir::new(staging_src).into_iter().filter_entry(|e| {
        e.depth() == 0
            || !e.file_type().is_dir()
            || policy.decide(e.path(), true) != Decision::SkipSubtree
    });

    let mut copied = 0;
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(staging_src).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| io::Error::other("filesystem loop"));
            VendorError::materialize("walking", path, source)
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        if !path.is_file() || policy.decide(path, false) != Decision::Include {
            continue;
        }
        let Ok(rel) = path.strip_prefix(staging_src) else {
            continue;
        };
        copy_file(path, &vendor_root.join(rel))?;
        copied += 1;
    }
    Ok(copied)
}

/// Copy one file through a temporary sibling and rename it into place, so
/// `dst` is either the old file or the complete new one.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    let parent = dst
        .parent()
        .ok_or_else(|| VendorError::materialize("copying", dst, io::Error::other("no parent directory")))?;
    fs::create_dir_all(parent)
        .map_err(|e| VendorError::materialize("creating directory", parent, e))?;

    let mut input = fs::File::open(src).map_err(|e| VendorError::materialize("opening", src, e))?;
    let mut staged =
        NamedTempFile::new_in(parent).map_err(|e| VendorError::materialize("creating", dst, e))?;
    io::copy(&mut input, &mut staged).map_err(|e| VendorError::materialize("copying", dst, e))?;
    // Temp files are created 0600; carry the source's mode over instead.
    let permissions = input
        .metadata()
        .map_err(|e| VendorError::materialize("reading metadata", src, e))?
        .permissions();
    staged
        .as_file()
        .set_permissions(permissions)
        .map_err(|e| VendorError::materialize("setting permissions", dst, e))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|e| VendorError::materialize("flushing", dst, e))?;
    staged
        .persist(dst)
        .map_err(|e| VendorError::materialize("renaming", dst, e.error))?;
    Ok(())
}
