//! # govend - vendor a Go project's imports without touching GOPATH
//!
//! govend finds every external package a project imports, fetches each one
//! into a throwaway staging area, and copies the files that matter into the
//! project's `vendor/` directory, mirroring each import path.
//!
//! ## Quick Start
//!
//! ```bash
//! # Vendor the project in the current directory
//! govend
//!
//! # List what would be vendored
//! govend scan --dir ~/go/src/acme/app
//! ```
//!
//! ## Module Organization
//!
//! - [`scanner`] - Import discovery over the project tree
//! - [`ignore`] - Which files take part in scanning and vendoring
//! - [`deps`] - Staging, fetching and materializing into `vendor/`
//! - [`config`] - `govend.toml` and project/source-root layout

/// Configuration file parsing (`govend.toml`) and project layout.
pub mod config;

/// Staging, fetching and vendoring of dependencies.
pub mod deps;

/// Error types shared by every phase of a run.
pub mod error;

/// Ignore policy for scanning and vendoring.
pub mod ignore;

/// Project import scanning.
pub mod scanner;

/// Terminal UI utilities (tables, progress, summary).
pub mod ui;
