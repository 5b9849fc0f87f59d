//! Error taxonomy shared by the library.
//!
//! Field-level problems (a key missing from a blob, a value that does not
//! convert) are *not* errors: they are represented by
//! [`FieldValue`](crate::models::FieldValue) so that one bad field never
//! aborts the extraction of a whole record.

use std::path::PathBuf;

use thiserror::Error;

/// Which standard stream of a job a file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Stdin,
    Stdout,
    Stderr,
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputKind::Stdin => write!(f, "stdin"),
            OutputKind::Stdout => write!(f, "stdout"),
            OutputKind::Stderr => write!(f, "stderr"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SlurmError {
    /// The scheduler command could not be run or reported a failure.
    /// The message is the command's own stderr (or the spawn error), untouched.
    #[error("{command} failed: {message}")]
    ExternalCall { command: String, message: String },

    /// A job identifier (or the `last` sentinel) does not resolve to a job
    #[error("job {0} not found")]
    NotFound(String),

    /// A job's stdout/stderr file is not recorded or does not exist
    #[error("{kind} of job {job_id} is not available{}", path_suffix(.path))]
    ResourceMissing {
        job_id: u64,
        kind: OutputKind,
        path: Option<PathBuf>,
    },

    #[error("invalid job identifier '{0}' (expected a number, 'all' or 'last')")]
    InvalidJobId(String),

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("last-submit store at {}: {source}", .path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SlurmError {
    pub(crate) fn external(command: impl Into<String>, message: impl Into<String>) -> Self {
        SlurmError::ExternalCall {
            command: command.into(),
            message: message.into(),
        }
    }

    /// True if the scheduler itself failed (the only case that warrants
    /// a non-zero process exit)
    #[must_use]
    pub fn is_external(&self) -> bool {
        matches!(self, SlurmError::ExternalCall { .. })
    }
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" ({})", p.display()))
        .unwrap_or_default()
}

pub type Result<T, E = SlurmError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_missing_message_with_path() {
        let err = SlurmError::ResourceMissing {
            job_id: 7,
            kind: OutputKind::Stdout,
            path: Some(PathBuf::from("/tmp/slurm-7.out")),
        };
        assert_eq!(
            err.to_string(),
            "stdout of job 7 is not available (/tmp/slurm-7.out)"
        );
    }

    #[test]
    fn test_resource_missing_message_without_path() {
        let err = SlurmError::ResourceMissing {
            job_id: 7,
            kind: OutputKind::Stderr,
            path: None,
        };
        assert_eq!(err.to_string(), "stderr of job 7 is not available");
    }

    #[test]
    fn test_only_external_call_is_external() {
        assert!(SlurmError::external("squeue", "boom").is_external());
        assert!(!SlurmError::NotFound("last".into()).is_external());
        assert!(!SlurmError::InvalidJobId("x".into()).is_external());
    }
}
