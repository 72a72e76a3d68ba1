//! The vendoring run: scan, fetch, materialize.
//!
//! Imports are processed by a bounded worker pool. Each worker fetches one
//! import into its staging slot and then copies that slot into `vendor/`.
//! The first fatal error raises a shared cancellation flag that every
//! worker checks before starting its next unit of work. The staging root
//! is only released after all workers have joined.

use super::fetch::{FetchOutcome, FetchTool, fetch};
use super::materialize::{clear_vendor_root, copy_tree};
use super::staging::StagingRoot;
use crate::config::{ProjectContext, VendorConfig};
use crate::error::{Result, VendorError};
use crate::ignore::IgnorePolicy;
use crate::scanner::{ImportSet, scan};
use crate::ui;
use colored::*;
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone)]
pub struct VendorOptions {
    /// Worker pool size; 1 processes imports strictly one after another.
    pub jobs: usize,
    pub include_tests: bool,
    pub policy: IgnorePolicy,
    pub verbose: bool,
    /// Directory to create the staging root in; the system temp dir if unset.
    pub staging_parent: Option<PathBuf>,
}

impl Default for VendorOptions {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            include_tests: true,
            policy: IgnorePolicy::default(),
            verbose: false,
            staging_parent: None,
        }
    }
}

impl VendorOptions {
    pub fn from_config(config: &VendorConfig) -> Self {
        Self {
            jobs: config.vendor.jobs.unwrap_or_else(default_jobs).max(1),
            include_tests: config.scan.include_tests,
            policy: IgnorePolicy::with_extra_extensions(&config.vendor.extra_extensions),
            ..Self::default()
        }
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResult {
    pub import_path: String,
    pub outcome: FetchOutcome,
    pub files: usize,
}

#[derive(Debug, Clone, Default)]
pub struct VendorReport {
    /// One entry per scanned import, in import-path order.
    pub results: Vec<ImportResult>,
}

impl VendorReport {
    /// Imports that contributed at least one file.
    pub fn vendored(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.outcome == FetchOutcome::Fetched && r.files > 0)
            .map(|r| r.import_path.as_str())
    }

    /// Imports the fetch tool could not resolve, or that fetched to nothing.
    pub fn builtin(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.outcome == FetchOutcome::AssumedBuiltin || r.files == 0)
            .map(|r| r.import_path.as_str())
    }

    pub fn files_copied(&self) -> usize {
        self.results.iter().map(|r| r.files).sum()
    }
}

/// Scan the project and vendor everything it imports.
pub fn vendor_project(
    ctx: &ProjectContext,
    tool: &dyn FetchTool,
    options: &VendorOptions,
) -> Result<VendorReport> {
    println!(
        "{} Scanning {} ({})...",
        "⚡".yellow(),
        ctx.root.display(),
        ctx.import_path.cyan()
    );
    let imports = scan(ctx, options.include_tests)?;
    vendor_imports(ctx, &imports, tool, options)
}

/// Vendor an already-scanned import set into `ctx.vendor_root`.
pub fn vendor_imports(
    ctx: &ProjectContext,
    imports: &ImportSet,
    tool: &dyn FetchTool,
    options: &VendorOptions,
) -> Result<VendorReport> {
    // 1. Create the staging root
    let staging = match &options.staging_parent {
        Some(parent) => StagingRoot::create_in(parent)?,
        None => StagingRoot::create()?,
    };

    // 2. Prepare vendor directory
    clear_vendor_root(&ctx.vendor_root)?;

    if imports.is_empty() {
        println!("{} No external imports to vendor.", "!".yellow());
        staging.close()?;
        return Ok(VendorReport::default());
    }

    println!(
        "{} Vendoring {} imports into {}...",
        "📦".blue(),
        imports.len(),
        ctx.vendor_root.display()
    );

    // 3. Fetch and copy every import on the worker pool. `staging` is
    // borrowed by the pool, so it is only released after all workers return.
    let results = run_pool(ctx, imports, tool, options, &staging)?;

    // 4. Tear down staging
    staging.close()?;

    Ok(VendorReport { results })
}

fn run_pool(
    ctx: &ProjectContext,
    imports: &ImportSet,
    tool: &dyn FetchTool,
    options: &VendorOptions,
    staging: &StagingRoot,
) -> Result<Vec<ImportResult>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs.max(1))
        .thread_name(|i| format!("govend-worker-{}", i))
        .build()?;

    // Raised by the first fatal error; checked before each fetch and copy.
    let cancelled = AtomicBool::new(false);
    let pb = ui::progress_bar(imports.len() as u64, "Fetching...");
    let work: Vec<&String> = imports.iter().collect();

    let outcomes: Vec<Result<ImportResult>> = pool.install(|| {
        work.par_iter()
            .map(|import| {
                let result = vendor_one(import, ctx, tool, options, staging, &cancelled, &pb);
                if let Err(err) = &result
                    && !err.is_cancelled()
                {
                    cancelled.store(true, Ordering::SeqCst);
                    pb.println(format!("{} {} {}", "x".red(), import, err));
                }
                pb.inc(1);
                result
            })
            .collect()
    });
    pb.finish_and_clear();

    // First real error wins over the `Cancelled` markers it caused.
    let mut results = Vec::with_capacity(outcomes.len());
    let mut first_error = None;
    for outcome in outcomes {
        match outcome {
            Ok(r) => results.push(r),
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(err) => Err(err),
        None if results.len() < work.len() => Err(VendorError::Cancelled),
        None => Ok(results),
    }
}

fn vendor_one(
    import: &str,
    ctx: &ProjectContext,
    tool: &dyn FetchTool,
    options: &VendorOptions,
    staging: &StagingRoot,
    cancelled: &AtomicBool,
    pb: &ProgressBar,
) -> Result<ImportResult> {
    if cancelled.load(Ordering::SeqCst) {
        return Err(VendorError::Cancelled);
    }
    pb.set_message(format!("Fetching {}", import));
    let report = fetch(tool, import, staging)?;
    if options.verbose && !report.log.trim().is_empty() {
        pb.println(format!("   {}", report.log.trim().dimmed()));
    }

    if report.outcome == FetchOutcome::AssumedBuiltin {
        if options.verbose {
            pb.println(format!(
                "   {} {} not found, assuming builtin",
                "-".dimmed(),
                import
            ));
        }
        return Ok(ImportResult {
            import_path: import.to_string(),
            outcome: FetchOutcome::AssumedBuiltin,
            files: 0,
        });
    }

    if cancelled.load(Ordering::SeqCst) {
        return Err(VendorError::Cancelled);
    }
    let files = copy_tree(&staging.slot_src(import), &ctx.vendor_root, &options.policy)?;
    if files > 0 {
        pb.println(format!("   {} {} ({} files)", "+".green(), import, files));
    } else if options.verbose {
        pb.println(format!("   {} {} (nothing to copy)", "-".dimmed(), import));
    }

    Ok(ImportResult {
        import_path: import.to_string(),
        outcome: FetchOutcome::Fetched,
        files,
    })
}
