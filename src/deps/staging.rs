//! Run-scoped staging area for fetched packages.
//!
//! Each import gets its own slot, `<staging>/<digest>`, used as the fetch
//! tool's GOPATH, so concurrent fetches never share a workspace. The whole
//! tree is removed when the [`StagingRoot`] is dropped, on every exit path.

use crate::error::{Result, VendorError};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct StagingRoot {
    dir: TempDir,
}

impl StagingRoot {
    /// Create a fresh staging root in the system temp directory.
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("govend-staging-")
            .tempdir()
            .map_err(VendorError::Staging)?;
        Ok(Self { dir })
    }

    /// Create the staging root under `parent` instead.
    pub fn create_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("govend-staging-")
            .tempdir_in(parent)
            .map_err(VendorError::Staging)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Workspace root handed to the fetch tool for `import_path`.
    pub fn slot(&self, import_path: &str) -> PathBuf {
        self.path().join(slot_name(import_path))
    }

    /// Where a fetched tree lands inside a slot; paths below it are import
    /// paths.
    pub fn slot_src(&self, import_path: &str) -> PathBuf {
        self.slot(import_path).join("src")
    }

    /// Create the slot directory for `import_path`.
    pub fn prepare_slot(&self, import_path: &str) -> Result<PathBuf> {
        let slot = self.slot(import_path);
        fs::create_dir_all(slot.join("src")).map_err(VendorError::Staging)?;
        Ok(slot)
    }

    /// Remove the staging tree now, reporting failures. Dropping does the
    /// same but silently.
    pub fn close(self) -> Result<()> {
        self.dir.close().map_err(VendorError::Staging)
    }
}

fn slot_name(import_path: &str) -> String {
    let digest = Sha256::digest(import_path.as_bytes());
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}
