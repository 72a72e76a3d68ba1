//! Dependency fetching and vendoring.
//!
//! - **Staging**: a run-scoped temporary tree, one slot per import
//! - **Fetching**: run the fetch tool for an import into its slot
//! - **Materializing**: copy qualifying staged files into `vendor/`
//! - **Vendoring**: the whole run, fanned out over a worker pool

mod fetch;
mod materialize;
mod staging;
mod vendor;

pub use fetch::{CommandFetcher, FetchOutcome, FetchReport, FetchTool, FetchToolError, fetch};
pub use materialize::{clear_vendor_root, copy_file, copy_tree, materialize};
pub use staging::StagingRoot;
pub use vendor::{ImportResult, VendorOptions, VendorReport, vendor_imports, vendor_project};
