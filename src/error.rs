//! Error taxonomy for a vendoring run.
//!
//! Every variant except [`VendorError::Cancelled`] is fatal and names the
//! operation that failed together with the path or import it targeted.
//! A fetch that reports "not found" never becomes a `VendorError`: it is
//! downgraded to [`crate::deps::FetchOutcome::AssumedBuiltin`] instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VendorError {
    /// The project root does not live under the configured source root.
    #[error("project root {} is not inside the source root {}", project.display(), source_root.display())]
    Configuration {
        project: PathBuf,
        source_root: PathBuf,
    },

    /// `govend.toml` exists but could not be read or parsed.
    #[error("invalid config {}: {message}", path.display())]
    InvalidConfig { path: PathBuf, message: String },

    /// A source file could not be read or its import header is malformed.
    #[error("scanning {}{}: {message}", path.display(), line.map(|l| format!(":{l}")).unwrap_or_default())]
    Scan {
        path: PathBuf,
        /// Set for parse errors; I/O failures have no line.
        line: Option<usize>,
        message: String,
    },

    /// The fetch tool failed for a reason other than "not found".
    #[error("fetching {import_path}: {message}")]
    Fetch {
        import_path: String,
        message: String,
    },

    /// Creating, clearing or copying into the vendor tree failed.
    #[error("{op} {}: {source}", path.display())]
    Materialize {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The staging root could not be created or torn down.
    #[error("staging root: {0}")]
    Staging(#[source] io::Error),

    #[error("building worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// Another worker failed first; this unit of work was never started.
    #[error("cancelled after an earlier failure")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, VendorError>;

impl VendorError {
    pub(crate) fn materialize(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        VendorError::Materialize {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, VendorError::Cancelled)
    }
}
