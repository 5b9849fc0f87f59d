//! Interface to the Slurm command-line tools
//!
//! Every scheduler interaction goes through [`SlurmCommands`], so the
//! catalog, job record and queue viewer can be driven by a fake in tests.
//! [`SlurmInterface`] is the real implementation built on
//! `std::process::Command`.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Result, SlurmError};
use crate::queue::QueueScope;

/// How the Slurm binary path was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathResolution {
    /// Explicitly configured via config file or environment variable
    Configured,
    /// Auto-detected via PATH (found squeue in user's PATH)
    AutoDetected,
    /// Fell back to default /usr/bin and squeue was found there
    Fallback,
    /// Fell back to default /usr/bin but squeue was NOT found (likely misconfigured)
    FallbackUnverified,
}

/// Result of finding the Slurm binary path
#[derive(Debug, Clone)]
pub struct SlurmPathResult {
    pub path: PathBuf,
    pub resolution: PathResolution,
}

/// Binary used to probe for a Slurm installation
const PROBE_BINARY: &str = "squeue";

/// Find the directory containing Slurm binaries.
///
/// Resolution order:
/// 1. Explicit path provided (from config), if it is an existing directory.
///    Otherwise a warning is logged and resolution continues.
/// 2. Auto-detect via PATH using the `which` crate to find `squeue`, then
///    take the parent directory.
/// 3. Fallback to `/usr/bin`.
pub fn find_slurm_bin_path(config_path: Option<&Path>) -> SlurmPathResult {
    if let Some(path) = config_path {
        if path.is_dir() {
            return SlurmPathResult {
                path: path.to_path_buf(),
                resolution: PathResolution::Configured,
            };
        }
        tracing::warn!(
            path = %path.display(),
            "Configured slurm_bin_path is not a valid directory, trying auto-detection"
        );
    }

    if let Ok(probe) = which::which(PROBE_BINARY)
        && let Some(parent) = probe.parent()
    {
        return SlurmPathResult {
            path: parent.to_path_buf(),
            resolution: PathResolution::AutoDetected,
        };
    }

    let fallback_path = PathBuf::from("/usr/bin");
    if fallback_path.join(PROBE_BINARY).exists() {
        SlurmPathResult {
            path: fallback_path,
            resolution: PathResolution::Fallback,
        }
    } else {
        tracing::warn!(
            path = %fallback_path.display(),
            "Slurm binaries not found in PATH or fallback directory, commands may fail"
        );
        SlurmPathResult {
            path: fallback_path,
            resolution: PathResolution::FallbackUnverified,
        }
    }
}

/// What `scancel` should cancel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelTarget {
    Job(u64),
    /// Every job of the current user
    AllMine,
}

/// Optional `sbatch` resource flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    pub time: Option<String>,
    pub nodes: Option<u32>,
    pub cores: Option<u32>,
    pub memory: Option<String>,
    pub partition: Option<String>,
}

impl SubmitOptions {
    fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(time) = &self.time {
            args.extend(["-t".to_string(), time.clone()]);
        }
        if let Some(cores) = self.cores {
            args.extend(["-c".to_string(), cores.to_string()]);
        }
        if let Some(memory) = &self.memory {
            args.push(format!("--mem={memory}"));
        }
        if let Some(partition) = &self.partition {
            args.extend(["-p".to_string(), partition.clone()]);
        }
        if let Some(nodes) = self.nodes {
            args.extend(["-N".to_string(), nodes.to_string()]);
        }
        args
    }
}

/// The scheduler operations this tool needs.
///
/// Implementations return the command's stdout untouched; interpretation is
/// left to the callers.
pub trait SlurmCommands {
    /// Name used for ownership filtering and `-u` arguments
    fn current_user(&self) -> &str;

    /// Detailed description of one job (`scontrol show jobid -dd`)
    fn job_info(&self, job_id: u64) -> Result<String>;

    /// Concatenated descriptions of every job the scheduler knows
    fn all_jobs_info(&self) -> Result<String>;

    /// Raw queue listing including its header line
    fn queue(&self, scope: QueueScope) -> Result<String>;

    fn cancel(&self, target: CancelTarget) -> Result<()>;

    /// Submit a batch script and return the new job id
    fn submit(&self, script: &Path, options: &SubmitOptions) -> Result<u64>;
}

/// Real scheduler access through the Slurm binaries
#[derive(Debug, Clone)]
pub struct SlurmInterface {
    /// Path to directory containing Slurm binaries (squeue, scontrol, ...)
    pub slurm_bin_path: PathBuf,
    resolution: PathResolution,
    user: String,
}

impl SlurmInterface {
    /// Create an interface using the configured binary directory, if any.
    ///
    /// Use `is_unverified_fallback()` to check whether resolution ended on a
    /// default location that was never verified.
    pub fn with_config(config_path: Option<&Path>) -> Self {
        let result = find_slurm_bin_path(config_path);
        Self {
            slurm_bin_path: result.path,
            resolution: result.resolution,
            user: get_current_user(),
        }
    }

    /// Override the user name used for scoping (mainly for tests)
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    #[must_use]
    pub fn is_unverified_fallback(&self) -> bool {
        self.resolution == PathResolution::FallbackUnverified
    }

    fn command(&self, binary: &str) -> Command {
        Command::new(self.slurm_bin_path.join(binary))
    }

    /// Run a prepared command and return its stdout.
    ///
    /// Spawn failures and non-zero exits both become `ExternalCall`, carrying
    /// the command's stderr as-is.
    fn execute_slurm_command(&self, mut cmd: Command, name: &str) -> Result<String> {
        tracing::debug!(command = ?cmd, "Running Slurm command");
        let output = cmd
            .output()
            .map_err(|e| SlurmError::external(name, format!("could not execute: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SlurmError::external(name, stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl SlurmCommands for SlurmInterface {
    fn current_user(&self) -> &str {
        &self.user
    }

    fn job_info(&self, job_id: u64) -> Result<String> {
        let mut cmd = self.command("scontrol");
        cmd.args(["show", "jobid", "-dd"]).arg(job_id.to_string());

        match self.execute_slurm_command(cmd, "scontrol") {
            Ok(out) if out.trim().is_empty() => Err(SlurmError::NotFound(job_id.to_string())),
            Ok(out) => Ok(out),
            Err(SlurmError::ExternalCall { message, .. }) if is_invalid_job_message(&message) => {
                Err(SlurmError::NotFound(job_id.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    fn all_jobs_info(&self) -> Result<String> {
        let mut cmd = self.command("scontrol");
        cmd.args(["show", "job"]);
        self.execute_slurm_command(cmd, "scontrol")
    }

    fn queue(&self, scope: QueueScope) -> Result<String> {
        let mut cmd = self.command("squeue");
        cmd.args(queue_args(scope, &self.user));
        self.execute_slurm_command(cmd, "squeue")
    }

    fn cancel(&self, target: CancelTarget) -> Result<()> {
        let mut cmd = self.command("scancel");
        cmd.args(cancel_args(target, &self.user));
        self.execute_slurm_command(cmd, "scancel").map(|_| ())
    }

    fn submit(&self, script: &Path, options: &SubmitOptions) -> Result<u64> {
        let mut cmd = self.command("sbatch");
        cmd.args(options.to_args()).arg(script);
        let stdout = self.execute_slurm_command(cmd, "sbatch")?;
        parse_submitted_job_id(&stdout).ok_or_else(|| {
            SlurmError::external("sbatch", format!("unexpected output: {}", stdout.trim()))
        })
    }
}

fn is_invalid_job_message(stderr: &str) -> bool {
    stderr.to_ascii_lowercase().contains("invalid job id")
}

fn queue_args(scope: QueueScope, user: &str) -> Vec<String> {
    match scope {
        QueueScope::Mine => vec!["-u".to_string(), user.to_string()],
        QueueScope::All => Vec::new(),
    }
}

fn cancel_args(target: CancelTarget, user: &str) -> Vec<String> {
    match target {
        CancelTarget::Job(id) => vec![id.to_string()],
        CancelTarget::AllMine => vec!["-u".to_string(), user.to_string()],
    }
}

/// Extract the id from `Submitted batch job <N>` (possibly followed by
/// a cluster suffix such as `on cluster foo`)
#[must_use]
pub fn parse_submitted_job_id(stdout: &str) -> Option<u64> {
    stdout.lines().find_map(|line| {
        line.trim()
            .strip_prefix("Submitted batch job ")
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|id| id.parse().ok())
    })
}

/// Get the current username from the environment (USER, then LOGNAME)
#[must_use]
pub fn get_current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| {
            tracing::warn!("Could not determine username from USER or LOGNAME environment variables");
            "unknown".to_string()
        })
}
