//! Job catalog built from one bulk `scontrol show job` dump.
//!
//! The dump is fetched once per listing and split into per-job chunks at
//! every line that begins with `JobId=`. Ownership filtering works on the
//! raw chunks, so records are only built for jobs that survive it.

use std::path::PathBuf;

use regex_lite::Regex;

use crate::error::{Result, SlurmError};
use crate::last_submit::{JobSelector, LastSubmitStore};
use crate::models::JobRecord;
use crate::slurm::{CancelTarget, SlurmCommands};

/// Token that starts every job in the bulk dump
pub const JOB_DELIMITER: &str = "JobId=";

/// Which output files to delete alongside an action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearOutputs {
    pub stdout: bool,
    pub stderr: bool,
}

impl ClearOutputs {
    #[must_use]
    pub fn any(self) -> bool {
        self.stdout || self.stderr
    }
}

/// What a kill request did
#[derive(Debug, Default)]
pub struct KillReport {
    /// Jobs cancelled individually
    pub cancelled: Vec<u64>,
    /// True when every job of the user was cancelled in one call
    pub cancelled_all: bool,
    /// Output files removed afterwards
    pub removed_files: Vec<PathBuf>,
}

/// Split a bulk dump into per-job chunks.
///
/// A chunk starts at a line whose first token begins with `JobId=`, so keys
/// such as `ArrayJobId=` never start a new job. Text before the first
/// delimiter is dropped.
#[must_use]
pub fn split_jobs(dump: &str) -> Vec<&str> {
    let mut starts = Vec::new();
    let mut offset = 0;
    for line in dump.split_inclusive('\n') {
        let content = line.trim_start();
        if content.starts_with(JOB_DELIMITER) {
            starts.push(offset + (line.len() - content.len()));
        }
        offset += line.len();
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(dump.len());
            dump[start..end].trim_end()
        })
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

/// Whether a chunk belongs to `user`: `UserId=<user>(uid)` or
/// `Account=<user>` as a whole token
#[must_use]
pub fn is_owned_by(chunk: &str, user: &str) -> bool {
    let user_id = format!("UserId={user}");
    let account = format!("Account={user}");
    chunk.split_whitespace().any(|token| {
        token == account
            || token == user_id
            || token
                .strip_prefix(&user_id)
                .is_some_and(|rest| rest.starts_with('('))
    })
}

/// Compile a user-supplied pattern
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| SlurmError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// A job matches when the pattern is found in its id or in its name
#[must_use]
pub fn matches_pattern(re: &Regex, job: &JobRecord) -> bool {
    re.is_match(&job.job_id().to_string())
        || job.name().value().is_some_and(|name| re.is_match(name))
}

pub struct JobCatalog<'a> {
    slurm: &'a dyn SlurmCommands,
}

impl<'a> JobCatalog<'a> {
    pub fn new(slurm: &'a dyn SlurmCommands) -> Self {
        Self { slurm }
    }

    /// Chunks of `dump` in scope
    fn retained<'d>(&self, dump: &'d str, mine: bool) -> Vec<&'d str> {
        let user = self.slurm.current_user();
        split_jobs(dump)
            .into_iter()
            .filter(|chunk| !mine || is_owned_by(chunk, user))
            .collect()
    }

    /// Every job in the dump, optionally only the current user's.
    ///
    /// An empty dump yields an empty list. Chunks without a numeric job id
    /// are skipped.
    pub fn list_all(&self, mine: bool) -> Result<Vec<JobRecord>> {
        let dump = self.slurm.all_jobs_info()?;
        let jobs = self
            .retained(&dump, mine)
            .into_iter()
            .filter_map(|chunk| {
                let record = JobRecord::parse(chunk);
                if record.is_none() {
                    tracing::debug!(chunk = %chunk.lines().next().unwrap_or_default(), "Skipping job chunk without a usable JobId");
                }
                record
            })
            .collect();
        Ok(jobs)
    }

    /// The retained chunks as text, separated by blank lines
    pub fn list_all_raw(&self, mine: bool) -> Result<String> {
        let dump = self.slurm.all_jobs_info()?;
        Ok(self.retained(&dump, mine).join("\n\n"))
    }

    /// Jobs whose id or name matches `pattern`
    pub fn filter_by_pattern(&self, pattern: &str, mine: bool) -> Result<Vec<JobRecord>> {
        let re = compile_pattern(pattern)?;
        Ok(self
            .list_all(mine)?
            .into_iter()
            .filter(|job| matches_pattern(&re, job))
            .collect())
    }

    /// Cancel the current user's jobs matching `pattern`, then optionally
    /// delete their output files
    pub fn kill_by_pattern(&self, pattern: &str, clear: ClearOutputs) -> Result<KillReport> {
        let jobs = self.filter_by_pattern(pattern, true)?;
        let mut report = KillReport::default();

        for job in &jobs {
            job.kill(self.slurm)?;
            report.cancelled.push(job.job_id());
        }
        if clear.any() {
            for job in &jobs {
                report
                    .removed_files
                    .extend(job.clear_output_files(clear.stdout, clear.stderr)?);
            }
        }

        Ok(report)
    }

    /// Delete output files of the current user's jobs matching `pattern`
    pub fn clear_output_by_pattern(&self, pattern: &str, clear: ClearOutputs) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for job in self.filter_by_pattern(pattern, true)? {
            removed.extend(job.clear_output_files(clear.stdout, clear.stderr)?);
        }
        Ok(removed)
    }

    /// Cancel the job(s) a selector names.
    ///
    /// `last` is resolved through the store and the store is reset once the
    /// job has been cancelled. Records needed for clearing outputs are
    /// fetched before cancelling, while the scheduler still knows the job.
    pub fn kill(
        &self,
        selector: JobSelector,
        store: &dyn LastSubmitStore,
        clear: ClearOutputs,
    ) -> Result<KillReport> {
        let mut report = KillReport::default();

        let to_clear = match selector {
            JobSelector::All => {
                let jobs = if clear.any() { self.list_all(true)? } else { Vec::new() };
                tracing::info!(user = self.slurm.current_user(), "Cancelling all jobs");
                self.slurm.cancel(CancelTarget::AllMine)?;
                report.cancelled_all = true;
                jobs
            }
            JobSelector::Id(_) | JobSelector::Last => {
                let Some(job_id) = selector.resolve(store)? else {
                    return Err(SlurmError::InvalidJobId(selector.to_string()));
                };
                let jobs = if clear.any() {
                    vec![JobRecord::fetch(self.slurm, job_id)?]
                } else {
                    Vec::new()
                };
                tracing::info!(job_id, "Cancelling job");
                self.slurm.cancel(CancelTarget::Job(job_id))?;
                report.cancelled.push(job_id);
                if selector == JobSelector::Last {
                    store.reset()?;
                }
                jobs
            }
        };

        for job in &to_clear {
            report
                .removed_files
                .extend(job.clear_output_files(clear.stdout, clear.stderr)?);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::last_submit::MemoryLastSubmitStore;
    use crate::queue::QueueScope;
    use crate::slurm::SubmitOptions;
    use std::cell::RefCell;
    use std::path::Path;

    fn chunk(id: u64, name: &str, user: &str) -> String {
        format!(
            "JobId={id} JobName={name}\n   UserId={user}(1000) GroupId={user}(1000) MCS_label=N/A\n   Account={user} QOS=normal\n   JobState=RUNNING Reason=None\n"
        )
    }

    struct FakeSlurm {
        dump: String,
        cancelled: RefCell<Vec<CancelTarget>>,
    }

    impl FakeSlurm {
        fn new(jobs: &[(u64, &str, &str)]) -> Self {
            Self {
                dump: jobs
                    .iter()
                    .map(|(id, name, user)| chunk(*id, name, user))
                    .collect::<Vec<_>>()
                    .join("\n"),
                cancelled: RefCell::new(Vec::new()),
            }
        }
    }

    impl SlurmCommands for FakeSlurm {
        fn current_user(&self) -> &str {
            "alice"
        }

        fn job_info(&self, job_id: u64) -> Result<String> {
            split_jobs(&self.dump)
                .into_iter()
                .find(|c| c.starts_with(&format!("JobId={job_id} ")))
                .map(str::to_string)
                .ok_or_else(|| SlurmError::NotFound(job_id.to_string()))
        }

        fn all_jobs_info(&self) -> Result<String> {
            Ok(self.dump.clone())
        }

        fn queue(&self, _scope: QueueScope) -> Result<String> {
            Ok(String::new())
        }

        fn cancel(&self, target: CancelTarget) -> Result<()> {
            self.cancelled.borrow_mut().push(target);
            Ok(())
        }

        fn submit(&self, _script: &Path, _options: &SubmitOptions) -> Result<u64> {
            Ok(1)
        }
    }

    fn ids(jobs: &[JobRecord]) -> Vec<u64> {
        jobs.iter().map(JobRecord::job_id).collect()
    }

    #[test]
    fn test_split_jobs_on_line_start_only() {
        let dump = "JobId=1 ArrayJobId=1 ArrayTaskId=1 JobName=a\n   Account=x\n\nJobId=2 JobName=b HetJobId=9\n";
        let chunks = split_jobs(dump);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("JobId=1"));
        assert!(chunks[0].contains("Account=x"));
        assert!(chunks[1].starts_with("JobId=2"));
    }

    #[test]
    fn test_split_jobs_empty_dump() {
        assert!(split_jobs("").is_empty());
        assert!(split_jobs("No jobs in the system\n").is_empty());
    }

    #[test]
    fn test_is_owned_by_whole_token() {
        let c = chunk(1, "a", "alice");
        assert!(is_owned_by(&c, "alice"));
        assert!(!is_owned_by(&c, "ali"));
        assert!(!is_owned_by(&chunk(2, "a", "alice2"), "alice"));
    }

    #[test]
    fn test_list_all_mine_filters_before_parsing() {
        let slurm = FakeSlurm::new(&[(1, "a", "alice"), (2, "b", "bob"), (3, "c", "alice")]);
        let catalog = JobCatalog::new(&slurm);
        assert_eq!(ids(&catalog.list_all(true).unwrap()), vec![1, 3]);
        assert_eq!(ids(&catalog.list_all(false).unwrap()), vec![1, 2, 3]);
    }

    #[test]
    fn test_list_all_empty_dump_is_empty_not_error() {
        let slurm = FakeSlurm::new(&[]);
        let catalog = JobCatalog::new(&slurm);
        assert!(catalog.list_all(true).unwrap().is_empty());
        assert_eq!(catalog.list_all_raw(false).unwrap(), "");
    }

    #[test]
    fn test_list_all_raw_keeps_delimiter() {
        let slurm = FakeSlurm::new(&[(1, "a", "alice"), (2, "b", "bob")]);
        let raw = JobCatalog::new(&slurm).list_all_raw(true).unwrap();
        assert!(raw.starts_with("JobId=1 "));
        assert!(!raw.contains("JobId=2"));
    }

    #[test]
    fn test_filter_by_pattern_id_or_name() {
        let slurm = FakeSlurm::new(&[
            (42, "alpha", "alice"),
            (420, "beta", "alice"),
            (7, "z", "alice"),
            (9, "x42y", "alice"),
            (11, "abc", "alice"),
        ]);
        let catalog = JobCatalog::new(&slurm);
        assert_eq!(ids(&catalog.filter_by_pattern("42", true).unwrap()), vec![42, 420, 9]);
        assert_eq!(ids(&catalog.filter_by_pattern("^4", true).unwrap()), vec![42, 420]);
    }

    #[test]
    fn test_filter_by_invalid_pattern() {
        let slurm = FakeSlurm::new(&[(1, "a", "alice")]);
        assert!(matches!(
            JobCatalog::new(&slurm).filter_by_pattern("(", true),
            Err(SlurmError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_kill_by_pattern_only_mine() {
        let slurm = FakeSlurm::new(&[(10, "train", "alice"), (11, "train", "bob"), (12, "eval", "alice")]);
        let report = JobCatalog::new(&slurm)
            .kill_by_pattern("train", ClearOutputs::default())
            .unwrap();
        assert_eq!(report.cancelled, vec![10]);
        assert_eq!(*slurm.cancelled.borrow(), vec![CancelTarget::Job(10)]);
    }

    #[test]
    fn test_kill_last_resets_store() {
        let slurm = FakeSlurm::new(&[(5, "a", "alice")]);
        let store = MemoryLastSubmitStore::with_value(5);
        let report = JobCatalog::new(&slurm)
            .kill(JobSelector::Last, &store, ClearOutputs::default())
            .unwrap();
        assert_eq!(report.cancelled, vec![5]);
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_kill_last_without_submission() {
        let slurm = FakeSlurm::new(&[]);
        let store = MemoryLastSubmitStore::default();
        assert!(matches!(
            JobCatalog::new(&slurm).kill(JobSelector::Last, &store, ClearOutputs::default()),
            Err(SlurmError::NotFound(_))
        ));
        assert!(slurm.cancelled.borrow().is_empty());
    }

    #[test]
    fn test_kill_all_uses_single_cancel() {
        let slurm = FakeSlurm::new(&[(1, "a", "alice"), (2, "b", "alice")]);
        let store = MemoryLastSubmitStore::default();
        let report = JobCatalog::new(&slurm)
            .kill(JobSelector::All, &store, ClearOutputs::default())
            .unwrap();
        assert!(report.cancelled_all);
        assert_eq!(*slurm.cancelled.borrow(), vec![CancelTarget::AllMine]);
    }

    #[test]
    fn test_kill_with_clear_removes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("slurm-8.out");
        std::fs::write(&out, "done").unwrap();
        let slurm = FakeSlurm {
            dump: format!("JobId=8 JobName=io\n   UserId=alice(1) Account=alice\n   StdOut={}\n", out.display()),
            cancelled: RefCell::new(Vec::new()),
        };
        let store = MemoryLastSubmitStore::default();
        let report = JobCatalog::new(&slurm)
            .kill(
                JobSelector::Id(8),
                &store,
                ClearOutputs {
                    stdout: true,
                    stderr: true,
                },
            )
            .unwrap();
        assert_eq!(report.removed_files, vec![out.clone()]);
        assert!(!out.exists());
    }
}
