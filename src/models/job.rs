//! Job record: a typed view over one extracted job description.
//!
//! A [`JobRecord`] is built once from a blob and never changes afterwards;
//! every accessor derives its value from the owned [`FieldMap`] on demand,
//! so calling it twice gives the same answer. Fetching fresh data means
//! building a new record.

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, TimeDelta};

use super::fields::{Field, FieldMap, FieldValue};
use super::state::JobState;
use super::time::{parse_duration, parse_exit_code, parse_memory_mb, parse_timestamp};
use crate::error::{OutputKind, Result, SlurmError};
use crate::formatting::{UNKNOWN, format_bytes_mb, format_duration_hms, format_time_delta, format_timestamp};
use crate::last_submit::{JobSelector, LastSubmitStore};
use crate::slurm::{CancelTarget, SlurmCommands};

/// One job as described by the scheduler at query time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    job_id: u64,
    raw: String,
    fields: FieldMap,
}

impl JobRecord {
    /// Build a record for a known identifier from its description blob
    #[must_use]
    pub fn from_blob(job_id: u64, blob: impl Into<String>) -> Self {
        let raw = blob.into();
        let fields = FieldMap::extract(&raw);
        Self { job_id, raw, fields }
    }

    /// Build a record taking the identifier from the blob's own `JobId=`.
    ///
    /// Returns `None` when the blob carries no usable identifier.
    #[must_use]
    pub fn parse(blob: impl Into<String>) -> Option<Self> {
        let raw = blob.into();
        let fields = FieldMap::extract(&raw);
        let job_id = fields.parse_with(Field::JobId, str::parse::<u64>).into_value()?;
        Some(Self { job_id, raw, fields })
    }

    /// Query the scheduler for a single job
    pub fn fetch(slurm: &dyn SlurmCommands, job_id: u64) -> Result<Self> {
        let blob = slurm.job_info(job_id)?;
        Ok(Self::from_blob(job_id, blob))
    }

    /// Query the job a selector points to, resolving `last` through the
    /// store. `all` does not name a single job and is rejected.
    pub fn query(
        slurm: &dyn SlurmCommands,
        store: &dyn LastSubmitStore,
        selector: JobSelector,
    ) -> Result<Self> {
        match selector.resolve(store)? {
            Some(job_id) => Self::fetch(slurm, job_id),
            None => Err(SlurmError::InvalidJobId(selector.to_string())),
        }
    }

    #[must_use]
    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    /// The description text this record was built from
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn name(&self) -> FieldValue<String> {
        self.fields.text(Field::JobName)
    }

    /// Submitting user, falling back to the account when `UserId` is missing
    #[must_use]
    pub fn user(&self) -> FieldValue<String> {
        match self.fields.text(Field::UserId) {
            FieldValue::Absent => self.account(),
            user => user,
        }
    }

    #[must_use]
    pub fn account(&self) -> FieldValue<String> {
        self.fields.text(Field::Account)
    }

    #[must_use]
    pub fn state(&self) -> FieldValue<JobState> {
        self.fields.parse_with(Field::JobState, |s| {
            Ok::<_, Infallible>(JobState::from_state_string(s))
        })
    }

    /// Why the job is in its state; scontrol's literal `None` means no reason
    #[must_use]
    pub fn state_reason(&self) -> Option<String> {
        self.fields
            .raw(Field::Reason)
            .filter(|r| *r != "None")
            .map(str::to_string)
    }

    #[must_use]
    pub fn run_time(&self) -> FieldValue<TimeDelta> {
        self.fields.parse_with(Field::RunTime, parse_duration)
    }

    #[must_use]
    pub fn time_limit(&self) -> FieldValue<TimeDelta> {
        self.fields.parse_with(Field::TimeLimit, parse_duration)
    }

    #[must_use]
    pub fn submit_time(&self) -> FieldValue<NaiveDateTime> {
        self.fields.parse_with(Field::SubmitTime, parse_timestamp)
    }

    #[must_use]
    pub fn start_time(&self) -> FieldValue<NaiveDateTime> {
        self.fields.parse_with(Field::StartTime, parse_timestamp)
    }

    #[must_use]
    pub fn end_time(&self) -> FieldValue<NaiveDateTime> {
        self.fields.parse_with(Field::EndTime, parse_timestamp)
    }

    /// Time until the recorded end, rounded to whole seconds. `None` when the
    /// end time is absent or unparseable.
    #[must_use]
    pub fn time_remaining_at(&self, now: NaiveDateTime) -> Option<TimeDelta> {
        let end = self.end_time().into_value()?;
        let millis = (end - now).num_milliseconds();
        Some(TimeDelta::seconds((millis + 500).div_euclid(1000)))
    }

    #[must_use]
    pub fn time_remaining(&self) -> Option<TimeDelta> {
        self.time_remaining_at(Local::now().naive_local())
    }

    #[must_use]
    pub fn node_list(&self) -> FieldValue<String> {
        self.fields.text(Field::NodeList)
    }

    #[must_use]
    pub fn num_nodes(&self) -> FieldValue<u32> {
        self.fields.parse_with(Field::NumNodes, str::parse)
    }

    #[must_use]
    pub fn cpu_count(&self) -> FieldValue<u32> {
        self.fields.parse_with(Field::NumCpus, str::parse)
    }

    /// Memory in megabytes
    #[must_use]
    pub fn memory_mb(&self) -> FieldValue<u64> {
        self.fields.parse_with(Field::Memory, parse_memory_mb)
    }

    #[must_use]
    pub fn partition(&self) -> FieldValue<String> {
        self.fields.text(Field::Partition)
    }

    #[must_use]
    pub fn command(&self) -> FieldValue<String> {
        self.fields.text(Field::Command)
    }

    #[must_use]
    pub fn work_dir(&self) -> Option<PathBuf> {
        self.fields.raw(Field::WorkDir).map(PathBuf::from)
    }

    #[must_use]
    pub fn stdin_path(&self) -> Option<PathBuf> {
        self.fields.raw(Field::StdIn).map(PathBuf::from)
    }

    #[must_use]
    pub fn stdout_path(&self) -> Option<PathBuf> {
        self.fields.raw(Field::StdOut).map(PathBuf::from)
    }

    #[must_use]
    pub fn stderr_path(&self) -> Option<PathBuf> {
        self.fields.raw(Field::StdErr).map(PathBuf::from)
    }

    fn output_path(&self, kind: OutputKind) -> Option<PathBuf> {
        match kind {
            OutputKind::Stdin => self.stdin_path(),
            OutputKind::Stdout => self.stdout_path(),
            OutputKind::Stderr => self.stderr_path(),
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> FieldValue<i32> {
        self.fields
            .parse_with(Field::ExitCode, parse_exit_code)
            .map(|(code, _)| code)
    }

    /// Signal that terminated the job (second half of `ExitCode=`)
    #[must_use]
    pub fn exit_signal(&self) -> FieldValue<i32> {
        self.fields
            .parse_with(Field::ExitCode, parse_exit_code)
            .map(|(_, signal)| signal)
    }

    /// Cancel this job
    pub fn kill(&self, slurm: &dyn SlurmCommands) -> Result<()> {
        tracing::info!(job_id = self.job_id, "Cancelling job");
        slurm.cancel(CancelTarget::Job(self.job_id))
    }

    /// Delete the recorded stdout and/or stderr files.
    ///
    /// A path that is not recorded or a file that no longer exists is
    /// skipped. Returns the files actually removed.
    pub fn clear_output_files(&self, stdout: bool, stderr: bool) -> Result<Vec<PathBuf>> {
        let selected = [(stdout, OutputKind::Stdout), (stderr, OutputKind::Stderr)];
        let mut removed = Vec::new();

        for (_, kind) in selected.into_iter().filter(|(wanted, _)| *wanted) {
            let Some(path) = self.output_path(kind) else {
                continue;
            };
            if removed.contains(&path) {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!(job_id = self.job_id, path = %path.display(), "Removed {kind} file");
                    removed.push(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(removed)
    }

    fn read_output(&self, kind: OutputKind) -> Result<String> {
        let path = self.output_path(kind).ok_or(SlurmError::ResourceMissing {
            job_id: self.job_id,
            kind,
            path: None,
        })?;
        read_file(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SlurmError::ResourceMissing {
                job_id: self.job_id,
                kind,
                path: Some(path.clone()),
            },
            _ => SlurmError::Io(e),
        })
    }

    pub fn read_stdout(&self) -> Result<String> {
        self.read_output(OutputKind::Stdout)
    }

    pub fn read_stderr(&self) -> Result<String> {
        self.read_output(OutputKind::Stderr)
    }

    /// One-line description: `[Job <id>] <name> (<state>)`
    #[must_use]
    pub fn display_line(&self) -> String {
        format!(
            "[Job {}] {} ({})",
            self.job_id,
            self.name().display_with(String::clone, UNKNOWN),
            self.state().display_with(JobState::to_string, UNKNOWN)
        )
    }

    #[must_use]
    pub fn summary(&self) -> String {
        self.summary_at(Local::now().naive_local())
    }

    /// Fixed-layout multi-line summary, with remaining time measured from `now`
    #[must_use]
    pub fn summary_at(&self, now: NaiveDateTime) -> String {
        render_summary(&self.summary_lines(now))
    }

    fn summary_lines(&self, now: NaiveDateTime) -> Vec<SummaryLine> {
        let text = |v: FieldValue<String>| v.display_with(String::clone, UNKNOWN);
        let path = |p: Option<PathBuf>| {
            p.map(|p| p.display().to_string())
                .unwrap_or_else(|| UNKNOWN.to_string())
        };

        let state = self.state().display_with(JobState::to_string, UNKNOWN);
        let state = match self.state_reason() {
            Some(reason) => format!("{state} ({reason})"),
            None => state,
        };
        let remaining = self
            .time_remaining_at(now)
            .map(format_time_delta)
            .unwrap_or_else(|| UNKNOWN.to_string());
        let end = self.end_time().display_with(format_timestamp, UNKNOWN);

        let mut lines = Vec::new();
        section(&mut lines, "General Info");
        lines.push(SummaryLine::blank());
        lines.push(SummaryLine::entry("Job ID:", self.job_id.to_string()));
        lines.push(SummaryLine::entry("Job Name:", text(self.name())));
        lines.push(SummaryLine::entry("User:", text(self.user())));
        lines.push(SummaryLine::entry("State:", state));
        lines.push(SummaryLine::blank());
        lines.push(SummaryLine::entry(
            "Runtime:",
            self.run_time()
                .display_with(|d| format_duration_hms(d.num_seconds().unsigned_abs()), UNKNOWN),
        ));
        lines.push(SummaryLine::entry("Time limit:", format!("{remaining} ({end})")));
        lines.push(SummaryLine::blank());
        section(&mut lines, "Technical Info");
        lines.push(SummaryLine::entry("Cmd:", text(self.command())));
        lines.push(SummaryLine::entry("Stdin:", path(self.stdin_path())));
        lines.push(SummaryLine::entry("Stdout:", path(self.stdout_path())));
        lines.push(SummaryLine::entry("Stderr:", path(self.stderr_path())));
        section(&mut lines, "Resource Info");
        lines.push(SummaryLine::entry("Nodes:", text(self.node_list())));
        lines.push(SummaryLine::entry(
            "Cores:",
            self.cpu_count().display_with(u32::to_string, UNKNOWN),
        ));
        lines.push(SummaryLine::entry(
            "Memory:",
            self.memory_mb().display_with(|mb| format_bytes_mb(*mb), UNKNOWN),
        ));
        lines.push(SummaryLine::entry("Partition:", text(self.partition())));
        lines.push(SummaryLine::Rule);
        lines
    }
}

/// A summary line before rendering. Rules carry no text so they can never
/// take part in the width computation.
enum SummaryLine {
    Rule,
    Text(String),
}

impl SummaryLine {
    /// Width of the label column, including the trailing space
    const LABEL_WIDTH: usize = 12;

    fn entry(label: &str, value: String) -> Self {
        SummaryLine::Text(format!("{label:<width$}{value}", width = Self::LABEL_WIDTH))
    }

    fn blank() -> Self {
        SummaryLine::Text(String::new())
    }
}

fn section(lines: &mut Vec<SummaryLine>, title: &str) {
    lines.push(SummaryLine::Rule);
    lines.push(SummaryLine::Text(title.to_string()));
    lines.push(SummaryLine::Rule);
}

fn render_summary(lines: &[SummaryLine]) -> String {
    let width = lines
        .iter()
        .filter_map(|line| match line {
            SummaryLine::Text(text) => Some(text.chars().count()),
            SummaryLine::Rule => None,
        })
        .max()
        .unwrap_or(0);
    let rule = "-".repeat(width);

    lines
        .iter()
        .map(|line| match line {
            SummaryLine::Rule => rule.as_str(),
            SummaryLine::Text(text) => text.as_str(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl std::fmt::Display for JobRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_line())
    }
}
