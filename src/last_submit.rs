//! The remembered "last submitted job" and job selectors.
//!
//! The last submitted identifier is kept in a small JSON file so that it
//! survives between invocations. Only [`LastSubmitStore`] reads or writes
//! it; callers receive a store explicitly instead of touching the file.

use std::cell::Cell;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SlurmError};

/// Narrow get/set/reset contract for the remembered identifier
pub trait LastSubmitStore {
    fn get(&self) -> Result<Option<u64>>;
    fn set(&self, job_id: u64) -> Result<()>;
    fn reset(&self) -> Result<()>;

    /// Resolve the `last` sentinel, failing with `NotFound` when nothing is
    /// remembered
    fn resolve(&self) -> Result<u64> {
        self.get()?
            .ok_or_else(|| SlurmError::NotFound(JobSelector::LAST.to_string()))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredState {
    last_submit: Option<u64>,
}

/// File-backed store
#[derive(Debug, Clone)]
pub struct FileLastSubmitStore {
    path: PathBuf,
}

impl FileLastSubmitStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `$XDG_STATE_HOME/slurmtools/last_submit.json`,
    /// falling back to the local data directory and finally the temp dir
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join("slurmtools/last_submit.json")
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn store_error(&self, source: std::io::Error) -> SlurmError {
        SlurmError::Store {
            path: self.path.clone(),
            source,
        }
    }

    fn write(&self, state: &StoredState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.store_error(e))?;
        }
        let content = serde_json::to_string_pretty(state)
            .map_err(|e| self.store_error(std::io::Error::other(e)))?;
        std::fs::write(&self.path, content).map_err(|e| self.store_error(e))
    }
}

impl LastSubmitStore for FileLastSubmitStore {
    fn get(&self) -> Result<Option<u64>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<StoredState>(&content) {
                Ok(state) => Ok(state.last_submit),
                Err(e) => {
                    // A corrupt file means nothing usable is remembered
                    tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable last-submit state");
                    Ok(None)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.store_error(e)),
        }
    }

    fn set(&self, job_id: u64) -> Result<()> {
        self.write(&StoredState {
            last_submit: Some(job_id),
        })
    }

    fn reset(&self) -> Result<()> {
        self.write(&StoredState::default())
    }
}

/// In-memory store, for callers that must not touch the filesystem
#[derive(Debug, Default)]
pub struct MemoryLastSubmitStore {
    value: Cell<Option<u64>>,
}

impl MemoryLastSubmitStore {
    #[must_use]
    pub fn with_value(job_id: u64) -> Self {
        Self {
            value: Cell::new(Some(job_id)),
        }
    }
}

impl LastSubmitStore for MemoryLastSubmitStore {
    fn get(&self) -> Result<Option<u64>> {
        Ok(self.value.get())
    }

    fn set(&self, job_id: u64) -> Result<()> {
        self.value.set(Some(job_id));
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        self.value.set(None);
        Ok(())
    }
}

/// What a CLI job argument refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSelector {
    Id(u64),
    /// The remembered last submission
    Last,
    /// Every job of the current user
    All,
}

impl JobSelector {
    pub const LAST: &'static str = "last";
    pub const ALL: &'static str = "all";

    /// Resolve to a concrete identifier. `All` has no single identifier and
    /// yields `None`.
    pub fn resolve(self, store: &dyn LastSubmitStore) -> Result<Option<u64>> {
        match self {
            JobSelector::Id(id) => Ok(Some(id)),
            JobSelector::Last => store.resolve().map(Some),
            JobSelector::All => Ok(None),
        }
    }
}

impl std::str::FromStr for JobSelector {
    type Err = SlurmError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case(Self::LAST) {
            Ok(JobSelector::Last)
        } else if trimmed.eq_ignore_ascii_case(Self::ALL) {
            Ok(JobSelector::All)
        } else {
            trimmed
                .parse()
                .map(JobSelector::Id)
                .map_err(|_| SlurmError::InvalidJobId(s.to_string()))
        }
    }
}

impl std::fmt::Display for JobSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobSelector::Id(id) => write!(f, "{id}"),
            JobSelector::Last => f.write_str(Self::LAST),
            JobSelector::All => f.write_str(Self::ALL),
        }
    }
}
