//! Terminal output of the command-line interface

use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, Width, object::Rows},
};

use crate::catalog::KillReport;
use crate::formatting::{
    UNKNOWN, format_time_delta, format_timestamp, layout, truncate_path,
    truncate_string,
};
use crate::models::{FieldValue, JobRecord, JobState};
use crate::queue::QUEUE_HEADER;

/// Table row for job display
#[derive(Tabled)]
struct JobRow {
    #[tabled(rename = "JobID")]
    job_id: String,

    #[tabled(rename = "Name")]
    name: String,

    #[tabled(rename = "User")]
    user: String,

    #[tabled(rename = "Partition")]
    partition: String,

    #[tabled(rename = "State")]
    state: String,

    #[tabled(rename = "Elapsed")]
    elapsed: String,

    #[tabled(rename = "Remaining")]
    remaining: String,

    #[tabled(rename = "Nodes")]
    nodes: String,
}

fn text_or_unknown(value: FieldValue<String>) -> String {
    value.display_with(String::clone, UNKNOWN)
}

/// Format job state with appropriate coloring
fn format_job_state(state: &FieldValue<JobState>) -> String {
    let Some(job_state) = state.value() else {
        return state.display_with(JobState::to_string, UNKNOWN).white().to_string();
    };
    let text = job_state.as_str();

    match job_state {
        JobState::Running | JobState::Completing | JobState::Configuring => text.green().to_string(),
        JobState::Pending | JobState::Suspended => text.yellow().to_string(),
        JobState::Completed => text.bright_blue().to_string(),
        JobState::Cancelled | JobState::Preempted => text.magenta().to_string(),
        other if other.is_failure() => text.red().to_string(),
        _ => text.white().to_string(),
    }
}

/// Render jobs as a table
pub fn format_jobs(jobs: &[JobRecord]) -> String {
    if jobs.is_empty() {
        return "No jobs found".yellow().to_string();
    }

    let rows: Vec<JobRow> = jobs
        .iter()
        .map(|job| JobRow {
            job_id: job.job_id().to_string(),
            name: truncate_string(&text_or_unknown(job.name()), layout::NAME_TRUNCATE_LEN),
            user: text_or_unknown(job.user()),
            partition: text_or_unknown(job.partition()),
            state: format_job_state(&job.state()),
            elapsed: job.run_time().display_with(|d| format_time_delta(*d), UNKNOWN),
            remaining: job
                .time_remaining()
                .map(format_time_delta)
                .unwrap_or_else(|| "-".to_string()),
            nodes: text_or_unknown(job.node_list()),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Width::wrap(200).keep_words(true))
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

/// Summaries of several jobs, separated by blank lines
pub fn format_summaries(jobs: &[JobRecord]) -> String {
    if jobs.is_empty() {
        return "No jobs found".yellow().to_string();
    }
    jobs.iter()
        .map(JobRecord::summary)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Machine-readable view of a job for `info --json`.
///
/// Missing and unparseable fields are both `null`; the raw text stays
/// available through `raw`.
#[derive(Debug, Serialize)]
pub struct JobJson {
    pub job_id: u64,
    pub name: Option<String>,
    pub user: Option<String>,
    pub account: Option<String>,
    pub state: Option<String>,
    pub reason: Option<String>,
    pub partition: Option<String>,
    pub run_time_seconds: Option<i64>,
    pub time_limit_seconds: Option<i64>,
    pub submit_time: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub node_list: Option<String>,
    pub num_nodes: Option<u32>,
    pub cpus: Option<u32>,
    pub memory_mb: Option<u64>,
    pub work_dir: Option<PathBuf>,
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
    pub exit_code: Option<i32>,
    pub exit_signal: Option<i32>,
    pub raw: String,
}

impl From<&JobRecord> for JobJson {
    fn from(job: &JobRecord) -> Self {
        let timestamp = |v: FieldValue<chrono::NaiveDateTime>| v.value().map(format_timestamp);
        Self {
            job_id: job.job_id(),
            name: job.name().into_value(),
            user: job.user().into_value(),
            account: job.account().into_value(),
            state: job.state().value().map(|s| s.as_str().to_string()),
            reason: job.state_reason(),
            partition: job.partition().into_value(),
            run_time_seconds: job.run_time().value().map(|d| d.num_seconds()),
            time_limit_seconds: job.time_limit().value().map(|d| d.num_seconds()),
            submit_time: timestamp(job.submit_time()),
            start_time: timestamp(job.start_time()),
            end_time: timestamp(job.end_time()),
            node_list: job.node_list().into_value(),
            num_nodes: job.num_nodes().into_value(),
            cpus: job.cpu_count().into_value(),
            memory_mb: job.memory_mb().into_value(),
            work_dir: job.work_dir(),
            stdout: job.stdout_path(),
            stderr: job.stderr_path(),
            exit_code: job.exit_code().into_value(),
            exit_signal: job.exit_signal().into_value(),
            raw: job.raw().to_string(),
        }
    }
}

/// Pretty-printed JSON array of jobs
pub fn jobs_to_json(jobs: &[JobRecord]) -> serde_json::Result<String> {
    let rows: Vec<JobJson> = jobs.iter().map(JobJson::from).collect();
    serde_json::to_string_pretty(&rows)
}

/// One static queue snapshot with its column header
pub fn format_queue_snapshot(owner_label: &str, lines: &[String]) -> String {
    let mut output = format!("{} queue\n", owner_label.bold());
    output.push_str(&QUEUE_HEADER.bold().to_string());
    output.push('\n');
    if lines.is_empty() {
        output.push_str(&"No jobs in queue".yellow().to_string());
    } else {
        output.push_str(&lines.join("\n"));
    }
    output
}

fn format_removed_files(files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|path| format!("  removed {}", truncate_path(&path.display().to_string(), layout::PATH_TRUNCATE_LEN)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Outcome of a kill request
pub fn format_kill_report(report: &KillReport) -> String {
    let mut lines = Vec::new();
    if report.cancelled_all {
        lines.push(format!("{} all of your jobs", "Cancelled".green()));
    }
    for job_id in &report.cancelled {
        lines.push(format!("{} job {}", "Cancelled".green(), job_id));
    }
    if lines.is_empty() {
        lines.push("No jobs matched".yellow().to_string());
    }
    if !report.removed_files.is_empty() {
        lines.push(format_removed_files(&report.removed_files));
    }
    lines.join("\n")
}

/// Outcome of a clear request
pub fn format_cleared(files: &[PathBuf]) -> String {
    if files.is_empty() {
        return "No output files to remove".yellow().to_string();
    }
    format!(
        "{} {} file(s)\n{}",
        "Removed".green(),
        files.len(),
        format_removed_files(files)
    )
}

pub fn format_submitted(job_id: u64, script: &Path) -> String {
    format!(
        "{} {} as job {}",
        "Submitted".green(),
        script.display(),
        job_id.to_string().bold()
    )
}

/// Contents of an output file, headed by the job line
pub fn format_output(job: &JobRecord, label: &str, contents: &str) -> String {
    format!("{} {}\n{}", job.display_line().bold(), label.dimmed(), contents)
}

pub fn error_message(message: &str) -> String {
    format!("{} {}", "Error:".red().bold(), message)
}

pub fn warning_message(message: &str) -> String {
    format!("{} {}", "Warning:".yellow(), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fields::tests::RUNNING_BLOB;

    /// Strip ANSI color codes to compare visible text
    fn strip_ansi(s: &str) -> String {
        let mut result = String::new();
        let mut in_escape = false;

        for ch in s.chars() {
            if ch == '\x1b' {
                in_escape = true;
            } else if in_escape && ch == 'm' {
                in_escape = false;
            } else if !in_escape {
                result.push(ch);
            }
        }

        result
    }

    fn running_job() -> JobRecord {
        JobRecord::parse(RUNNING_BLOB).unwrap()
    }

    #[test]
    fn test_format_jobs_table() {
        let table = strip_ansi(&format_jobs(&[running_job()]));
        assert!(table.contains("JobID"));
        assert!(table.contains("4242"));
        assert!(table.contains("train model"));
        assert!(table.contains("RUNNING"));
        assert!(table.contains("alice"));
    }

    #[test]
    fn test_format_jobs_empty() {
        assert_eq!(strip_ansi(&format_jobs(&[])), "No jobs found");
    }

    #[test]
    fn test_job_state_unknown_token_verbatim() {
        let job = JobRecord::from_blob(7, "JobId=7 JobName=x JobState=WEIRD_STATE");
        let state = strip_ansi(&format_job_state(&job.state()));
        assert_eq!(state, "WEIRD_STATE");

        let job = JobRecord::from_blob(8, "JobId=8 JobName=x");
        assert_eq!(strip_ansi(&format_job_state(&job.state())), UNKNOWN);
    }

    #[test]
    fn test_json_nulls_missing_fields() {
        let job = JobRecord::from_blob(9, "JobId=9 JobName=sparse RunTime=not-a-time");
        let json: serde_json::Value =
            serde_json::from_str(&jobs_to_json(&[job]).unwrap()).unwrap();
        let row = &json[0];
        assert_eq!(row["job_id"], 9);
        assert_eq!(row["name"], "sparse");
        assert!(row["run_time_seconds"].is_null());
        assert!(row["partition"].is_null());
        assert!(row["raw"].as_str().unwrap().contains("RunTime=not-a-time"));
    }

    #[test]
    fn test_json_running_job() {
        let json: serde_json::Value =
            serde_json::from_str(&jobs_to_json(&[running_job()]).unwrap()).unwrap();
        assert_eq!(json[0]["job_id"], 4242);
        assert_eq!(json[0]["user"], "alice");
        assert_eq!(json[0]["state"], "RUNNING");
    }

    #[test]
    fn test_queue_snapshot() {
        let lines = vec!["1 gpu a alice R 0:01 1 n1".to_string()];
        let out = strip_ansi(&format_queue_snapshot("alice's", &lines));
        let mut rows = out.lines();
        assert_eq!(rows.next(), Some("alice's queue"));
        assert_eq!(rows.next(), Some(QUEUE_HEADER));
        assert_eq!(rows.next(), Some("1 gpu a alice R 0:01 1 n1"));

        let empty = strip_ansi(&format_queue_snapshot("The whole", &[]));
        assert!(empty.ends_with("No jobs in queue"));
    }

    #[test]
    fn test_kill_report() {
        let report = KillReport {
            cancelled: vec![5, 6],
            cancelled_all: false,
            removed_files: vec![PathBuf::from("/tmp/slurm-5.out")],
        };
        let out = strip_ansi(&format_kill_report(&report));
        assert!(out.contains("Cancelled job 5"));
        assert!(out.contains("Cancelled job 6"));
        assert!(out.contains("removed /tmp/slurm-5.out"));

        let nothing = strip_ansi(&format_kill_report(&KillReport::default()));
        assert_eq!(nothing, "No jobs matched");

        let all = KillReport {
            cancelled_all: true,
            ..KillReport::default()
        };
        assert_eq!(strip_ansi(&format_kill_report(&all)), "Cancelled all of your jobs");
    }

    #[test]
    fn test_cleared_messages() {
        assert_eq!(strip_ansi(&format_cleared(&[])), "No output files to remove");
        let out = strip_ansi(&format_cleared(&[PathBuf::from("a.out"), PathBuf::from("a.err")]));
        assert!(out.starts_with("Removed 2 file(s)"));
    }
}
