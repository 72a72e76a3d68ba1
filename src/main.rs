//! # govend CLI Entry Point
//!
//! Parses arguments with clap and dispatches to the library.
//!
//! - `govend` / `govend vendor` - scan, fetch and populate `vendor/`
//! - `govend scan` - list the external imports of a project
//! - `govend completion <shell>` - print shell completions

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::path::PathBuf;
use std::time::Duration;

use govend::config::{self, ProjectContext, VendorConfig};
use govend::deps::{self, CommandFetcher, VendorOptions};
use govend::scanner;
use govend::ui;

#[derive(Parser)]
#[command(name = "govend")]
#[command(about = "Vendor a Go project's imports without touching GOPATH", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every external import and copy it into vendor/
    Vendor {
        #[command(flatten)]
        project: ProjectArgs,
        /// Number of imports fetched in parallel
        #[arg(short, long)]
        jobs: Option<usize>,
        /// Per-fetch time limit in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Show fetch tool output and skipped imports
        #[arg(short, long)]
        verbose: bool,
    },
    /// List the external imports of a project
    Scan {
        #[command(flatten)]
        project: ProjectArgs,
        /// Print the import list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Default)]
struct ProjectArgs {
    /// Project directory to walk for imports [default: current directory]
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Root all import paths are resolved under [default: $GOPATH/src]
    #[arg(long)]
    source_root: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => run_vendor(&ProjectArgs::default(), None, None, false),
        Some(Commands::Vendor {
            project,
            jobs,
            timeout,
            verbose,
        }) => run_vendor(&project, jobs, timeout, verbose),
        Some(Commands::Scan { project, json }) => run_scan(&project, json),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Resolve the project layout, honoring flag > govend.toml > GOPATH.
fn load_project(args: &ProjectArgs) -> Result<(ProjectContext, VendorConfig)> {
    let dir = match &args.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }

    let config = config::load_config(&dir)?;
    let source_root = args
        .source_root
        .clone()
        .or_else(|| config.source_root.clone())
        .or_else(config::default_source_root)
        .context("Could not determine the source root. Set GOPATH or pass --source-root")?;

    let ctx = ProjectContext::resolve(&dir, &source_root).map_err(|e| {
        anyhow::anyhow!("{}\n\n💡 Tip: pass --source-root or set GOPATH.", e)
    })?;
    Ok((ctx, config))
}

fn run_vendor(args: &ProjectArgs, jobs: Option<usize>, timeout: Option<u64>, verbose: bool) -> Result<()> {
    let (ctx, config) = load_project(args)?;

    let mut options = VendorOptions::from_config(&config);
    if let Some(jobs) = jobs {
        options.jobs = jobs.max(1);
    }
    options.verbose = verbose;

    let fetcher = CommandFetcher::from_config(&config.fetch)?.with_timeout(timeout.map(Duration::from_secs));

    let report = deps::vendor_project(&ctx, &fetcher, &options)
        .with_context(|| format!("Vendoring {} failed", ctx.import_path))?;
    ui::print_summary(&report);
    Ok(())
}

fn run_scan(args: &ProjectArgs, json: bool) -> Result<()> {
    let (ctx, config) = load_project(args)?;
    let imports = scanner::scan(&ctx, config.scan.include_tests)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&imports)?);
        return Ok(());
    }

    if imports.is_empty() {
        println!("{} No external imports in {}.", "!".yellow(), ctx.import_path);
        return Ok(());
    }

    println!(
        "{} {} external imports in {}",
        "⚡".yellow(),
        imports.len(),
        ctx.import_path.cyan()
    );
    let mut table = ui::Table::new(&["Import", "Host"]);
    for import in &imports {
        let host = import.split('/').next().unwrap_or_default();
        let host = if host.contains('.') {
            host.to_string()
        } else {
            "(no host)".dimmed().to_string()
        };
        table.add_row(vec![import.green().to_string(), host]);
    }
    table.print();
    Ok(())
}
