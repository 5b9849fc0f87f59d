//! slurmtools - job inspection, cancellation and a live queue view for Slurm

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use slurmtools::catalog::{ClearOutputs, JobCatalog};
use slurmtools::display;
use slurmtools::error::SlurmError;
use slurmtools::last_submit::{FileLastSubmitStore, JobSelector, LastSubmitStore};
use slurmtools::models::{Config, JobRecord};
use slurmtools::queue::{self, QueueScope};
use slurmtools::slurm::{SlurmCommands, SlurmInterface, SubmitOptions};
use slurmtools::tui::{self, ViewerOptions, runtime::ViewerExit};

/// Environment variable holding the log filter
const LOG_ENV: &str = "SLURMTOOLS_LOG";

#[derive(Parser)]
#[command(name = "slurmtools")]
#[command(about = "Inspect, cancel and watch Slurm jobs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a batch script and remember its job id
    New {
        /// Batch script to submit
        script: PathBuf,

        /// Time limit (e.g. 1-00:00:00)
        #[arg(short, long)]
        time: Option<String>,

        /// Number of nodes
        #[arg(short, long)]
        nodes: Option<u32>,

        /// CPUs per task
        #[arg(short, long)]
        cores: Option<u32>,

        /// Memory per node (e.g. 4G)
        #[arg(short, long)]
        memory: Option<String>,

        #[arg(short, long)]
        partition: Option<String>,
    },

    /// Cancel a job, the last submitted job or all of your jobs
    Kill {
        /// Job id, `last` or `all` (a regex with --pattern)
        target: String,

        /// Treat the target as a regex over job ids and names
        #[arg(long)]
        pattern: bool,

        /// Also delete the jobs' stdout files
        #[arg(long)]
        clear_stdout: bool,

        /// Also delete the jobs' stderr files
        #[arg(long)]
        clear_stderr: bool,
    },

    /// Show job information
    Info {
        /// Job id, `last` or `all` (a regex with --pattern)
        target: String,

        /// Show the formatted summary instead of the raw description
        #[arg(short, long)]
        summary: bool,

        /// Treat the target as a regex over job ids and names
        #[arg(long)]
        pattern: bool,

        /// Print JSON
        #[arg(long, conflicts_with_all = ["summary", "raw"])]
        json: bool,

        /// Print the raw scheduler descriptions
        #[arg(long)]
        raw: bool,

        /// Include other users' jobs for `all` and --pattern
        #[arg(short, long)]
        all_users: bool,
    },

    /// Print a job's output files
    Read {
        /// Job id or `last`
        target: String,

        /// Print stdout (default)
        #[arg(short = 'o', long)]
        stdout: bool,

        /// Print stderr
        #[arg(short = 'e', long)]
        stderr: bool,
    },

    /// Show the queue once, or live with --view
    #[command(alias = "q")]
    Queue {
        /// Every user's jobs instead of only yours
        #[arg(short, long)]
        all: bool,

        /// Live, scrollable view refreshed on a timer
        #[arg(short, long)]
        view: bool,

        /// Refresh interval of the live view
        #[arg(short = 't', long, value_name = "SECONDS")]
        interval: Option<u64>,
    },

    /// Delete a job's output files
    Clear {
        /// Job id, `last` or `all` (a regex with --pattern)
        target: String,

        /// Treat the target as a regex over job ids and names
        #[arg(long)]
        pattern: bool,

        /// Delete stdout
        #[arg(short = 'o', long)]
        stdout: bool,

        /// Delete stderr
        #[arg(short = 'e', long)]
        stderr: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, warnings) = match Config::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", display::error_message(&e.to_string()));
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config);
    for warning in &warnings {
        eprintln!("{}", display::warning_message(warning));
    }

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", display::error_message(&format!("{err:#}")));
            exit_code_for(&err)
        }
    }
}

/// Non-zero only when a scheduler command failed
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    let external = err
        .chain()
        .any(|cause| cause.downcast_ref::<SlurmError>().is_some_and(SlurmError::is_external));
    if external {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Quitting and interrupting the live view both exit 0; the terminal is
/// already restored when this runs
fn viewer_exit_code(exit: ViewerExit) -> ExitCode {
    tracing::debug!(?exit, "live view closed");
    ExitCode::SUCCESS
}

/// Log to the configured file without colors, otherwise to stderr
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let Some(path) = config.log_file() else {
        builder.with_writer(io::stderr).init();
        return;
    };
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        Err(e) => {
            builder.with_writer(io::stderr).init();
            tracing::warn!("Cannot open log file {}: {}", path.display(), e);
        }
    }
}

fn run(command: Commands, config: &Config) -> Result<ExitCode> {
    let slurm = SlurmInterface::with_config(config.system.slurm_bin_path.as_deref());
    if slurm.is_unverified_fallback() {
        eprintln!(
            "{}",
            display::warning_message(&format!(
                "Slurm binaries not found on PATH, trying {}",
                slurm.slurm_bin_path.display()
            ))
        );
    }
    let store = FileLastSubmitStore::new(
        config
            .state_file()
            .unwrap_or_else(FileLastSubmitStore::default_path),
    );

    match command {
        Commands::New {
            script,
            time,
            nodes,
            cores,
            memory,
            partition,
        } => {
            let options = SubmitOptions {
                time,
                nodes,
                cores,
                memory,
                partition,
            };
            handle_new(&slurm, &store, &script, &options)?;
        }
        Commands::Kill {
            target,
            pattern,
            clear_stdout,
            clear_stderr,
        } => {
            let clear = ClearOutputs {
                stdout: clear_stdout,
                stderr: clear_stderr,
            };
            handle_kill(&slurm, &store, &target, pattern, clear)?;
        }
        Commands::Info {
            target,
            summary,
            pattern,
            json,
            raw,
            all_users,
        } => {
            let format = if json {
                InfoFormat::Json
            } else if summary {
                InfoFormat::Summary
            } else if raw {
                InfoFormat::Raw
            } else {
                InfoFormat::Default
            };
            handle_info(&slurm, &store, &target, pattern, !all_users, format)?;
        }
        Commands::Read {
            target,
            stdout,
            stderr,
        } => handle_read(&slurm, &store, &target, stdout, stderr)?,
        Commands::Queue {
            all,
            view,
            interval,
        } => {
            let scope = QueueScope::from_show_all(all || config.queue.show_all);
            if view {
                let options = ViewerOptions::from_config(&config.queue, scope, interval);
                return Ok(viewer_exit_code(tui::run_viewer(&slurm, options)?));
            } else {
                let lines = queue::fetch(&slurm, scope).context("Failed to list the queue")?;
                let label = scope.owner_label(slurm.current_user());
                println!("{}", display::format_queue_snapshot(&label, &lines));
            }
        }
        Commands::Clear {
            target,
            pattern,
            stdout,
            stderr,
        } => {
            // Neither flag means both files
            let clear = if stdout || stderr {
                ClearOutputs { stdout, stderr }
            } else {
                ClearOutputs {
                    stdout: true,
                    stderr: true,
                }
            };
            handle_clear(&slurm, &store, &target, pattern, clear)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn handle_new(
    slurm: &dyn SlurmCommands,
    store: &dyn LastSubmitStore,
    script: &std::path::Path,
    options: &SubmitOptions,
) -> Result<()> {
    let job_id = slurm
        .submit(script, options)
        .with_context(|| format!("Failed to submit {}", script.display()))?;
    store.set(job_id)?;
    println!("{}", display::format_submitted(job_id, script));
    Ok(())
}

fn handle_kill(
    slurm: &dyn SlurmCommands,
    store: &dyn LastSubmitStore,
    target: &str,
    pattern: bool,
    clear: ClearOutputs,
) -> Result<()> {
    let catalog = JobCatalog::new(slurm);
    let report = if pattern {
        catalog.kill_by_pattern(target, clear)?
    } else {
        let selector: JobSelector = target.parse()?;
        catalog.kill(selector, store, clear)?
    };
    println!("{}", display::format_kill_report(&report));
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InfoFormat {
    /// Raw description for one job, a table for several
    Default,
    Summary,
    Raw,
    Json,
}

fn handle_info(
    slurm: &dyn SlurmCommands,
    store: &dyn LastSubmitStore,
    target: &str,
    pattern: bool,
    mine: bool,
    format: InfoFormat,
) -> Result<()> {
    let catalog = JobCatalog::new(slurm);

    let jobs = if pattern {
        catalog.filter_by_pattern(target, mine)?
    } else {
        match target.parse::<JobSelector>()? {
            JobSelector::All if format == InfoFormat::Raw => {
                println!("{}", catalog.list_all_raw(mine)?);
                return Ok(());
            }
            JobSelector::All => catalog.list_all(mine)?,
            selector => {
                let job = JobRecord::query(slurm, store, selector)?;
                if matches!(format, InfoFormat::Default | InfoFormat::Raw) {
                    println!("{}", job.raw());
                    return Ok(());
                }
                vec![job]
            }
        }
    };

    let output = match format {
        InfoFormat::Json => display::jobs_to_json(&jobs)?,
        InfoFormat::Summary => display::format_summaries(&jobs),
        InfoFormat::Raw => jobs
            .iter()
            .map(JobRecord::raw)
            .collect::<Vec<_>>()
            .join("\n\n"),
        InfoFormat::Default => display::format_jobs(&jobs),
    };
    println!("{output}");
    Ok(())
}

fn handle_read(
    slurm: &dyn SlurmCommands,
    store: &dyn LastSubmitStore,
    target: &str,
    stdout: bool,
    stderr: bool,
) -> Result<()> {
    let selector: JobSelector = target.parse()?;
    let job = JobRecord::query(slurm, store, selector)?;

    // stdout unless only stderr was asked for
    if stdout || !stderr {
        println!("{}", display::format_output(&job, "stdout", &job.read_stdout()?));
    }
    if stderr {
        println!("{}", display::format_output(&job, "stderr", &job.read_stderr()?));
    }
    Ok(())
}

fn handle_clear(
    slurm: &dyn SlurmCommands,
    store: &dyn LastSubmitStore,
    target: &str,
    pattern: bool,
    clear: ClearOutputs,
) -> Result<()> {
    let catalog = JobCatalog::new(slurm);

    let removed = if pattern {
        catalog.clear_output_by_pattern(target, clear)?
    } else {
        match target.parse::<JobSelector>()? {
            JobSelector::All => {
                let mut removed = Vec::new();
                for job in catalog.list_all(true)? {
                    removed.extend(job.clear_output_files(clear.stdout, clear.stderr)?);
                }
                removed
            }
            selector => JobRecord::query(slurm, store, selector)?
                .clear_output_files(clear.stdout, clear.stderr)?,
        }
    };

    println!("{}", display::format_cleared(&removed));
    Ok(())
}
