//! Fetching packages into the staging root.
//!
//! The fetch tool is an external command (`go get -d` by default) run with
//! `GOPATH` pointed at the import's staging slot, so the host's shared
//! package cache is never touched. A tool that cannot resolve a path is
//! taken to be reporting a standard-library or environment-provided
//! package: the import becomes [`FetchOutcome::AssumedBuiltin`] and the run
//! goes on. Any other failure is fatal.

use super::staging::StagingRoot;
use crate::config::{CONFIG_FILE, FetchConfig};
use crate::error::{Result, VendorError};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched,
    AssumedBuiltin,
}

#[derive(Debug, Clone)]
pub struct FetchReport {
    pub outcome: FetchOutcome,
    /// Whatever the tool printed.
    pub log: String,
}

#[derive(Debug, Error)]
pub enum FetchToolError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Failed(String),
}

/// Retrieves a package's source into a workspace root, under `src/`.
pub trait FetchTool: Send + Sync {
    fn fetch(&self, import_path: &str, workspace: &Path) -> std::result::Result<String, FetchToolError>;
}

/// Fetch `import_path` into its own staging slot.
pub fn fetch(tool: &dyn FetchTool, import_path: &str, staging: &StagingRoot) -> Result<FetchReport> {
    let slot = staging.prepare_slot(import_path)?;
    match tool.fetch(import_path, &slot) {
        Ok(log) => Ok(FetchReport {
            outcome: FetchOutcome::Fetched,
            log,
        }),
        Err(FetchToolError::NotFound(log)) => Ok(FetchReport {
            outcome: FetchOutcome::AssumedBuiltin,
            log,
        }),
        Err(FetchToolError::Failed(message)) => Err(VendorError::Fetch {
            import_path: import_path.to_string(),
            message,
        }),
    }
}

/// Runs an external command per import.
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    timeout: Option<Duration>,
    not_found: Option<Regex>,
}

impl CommandFetcher {
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let not_found = if config.not_found_patterns.is_empty() {
            None
        } else {
            let joined = config
                .not_found_patterns
                .iter()
                .map(|p| format!("(?:{})", p))
                .collect::<Vec<_>>()
                .join("|");
            let re = RegexBuilder::new(&joined)
                .case_insensitive(true)
                .build()
                .map_err(|e| VendorError::InvalidConfig {
                    path: PathBuf::from(CONFIG_FILE),
                    message: format!("fetch.not_found_patterns: {}", e),
                })?;
            Some(re)
        };

        Ok(Self {
            program: config.program.clone(),
            args: config.args.clone(),
            env: config.env.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
            not_found,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        if timeout.is_some() {
            self.timeout = timeout;
        }
        self
    }

    pub fn command_line(&self, import_path: &str) -> String {
        let mut parts = vec![self.program.as_str()];
        parts.extend(self.args.iter().map(String::as_str));
        parts.push(import_path);
        parts.join(" ")
    }

    fn is_not_found(&self, output: &str) -> bool {
        self.not_found.as_ref().is_some_and(|re| re.is_match(output))
    }
}

impl FetchTool for CommandFetcher {
    fn fetch(&self, import_path: &str, workspace: &Path) -> std::result::Result<String, FetchToolError> {
        // 1. Spawn the tool with GOPATH pointed at the slot
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(import_path)
            .envs(&self.env)
            .env("GOPATH", workspace)
            .current_dir(workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FetchToolError::Failed(format!("running {}: {}", self.program, e)))?;

        // 2. Collect output, enforcing the time limit
        let (status, output) = wait_with_timeout(child, self.timeout)
            .map_err(|e| FetchToolError::Failed(format!("{}: {}", self.command_line(import_path), e)))?;

        // 3. Classify the exit
        if status.success() {
            return Ok(output);
        }
        if self.is_not_found(&output) {
            return Err(FetchToolError::NotFound(output));
        }
        Err(FetchToolError::Failed(format!(
            "{} exited with {}. output: {}",
            self.command_line(import_path),
            status,
            output.trim()
        )))
    }
}

/// Wait for `child`, killing it once `timeout` elapses. Output is drained on
/// background threads so a chatty tool cannot block on a full pipe.
fn wait_with_timeout(mut child: Child, timeout: Option<Duration>) -> std::io::Result<(ExitStatus, String)> {
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = match timeout {
        None => child.wait()?,
        Some(limit) => {
            let deadline = Instant::now() + limit;
            loop {
                if let Some(status) = child.try_wait()? {
                    break status;
                }
                if Instant::now() >= deadline {
                    child.kill()?;
                    child.wait()?;
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("timed out after {}s", limit.as_secs_f64()),
                    ));
                }
                thread::sleep(Duration::from_millis(50));
            }
        }
    };

    let mut output = String::new();
    for handle in [stdout, stderr].into_iter().flatten() {
        let bytes = handle.join().unwrap_or_default();
        output.push_str(&String::from_utf8_lossy(&bytes));
    }
    Ok((status, output))
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}
