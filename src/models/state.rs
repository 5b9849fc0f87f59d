//! Job state tokens.
//!
//! Slurm's base job states form a small closed set, but the vocabulary
//! drifts between releases and sites. Anything not recognised is kept
//! verbatim in [`JobState::Unknown`] instead of being rejected, so callers
//! can still match exhaustively.
//!
//! Reference: https://slurm.schedmd.com/job_state_codes.html

/// Job state parsed from a `JobState=` token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobState {
    // Active states
    Running,
    Pending,
    Suspended,
    // Transitional flag (commonly shown instead of base state)
    Completing,
    Configuring,
    // Successful completion
    Completed,
    // Termination states
    Cancelled,
    Failed,
    Timeout,
    Preempted,
    NodeFail,
    BootFail,
    Deadline,
    OutOfMemory,
    /// Token not in the known vocabulary, stored as given
    Unknown(String),
}

impl JobState {
    /// Create a JobState from a single state string.
    ///
    /// Handles both full names (e.g., "RUNNING") and short codes (e.g., "R").
    /// Also handles state strings with additional info like "CANCELLED by 12345".
    #[must_use]
    pub fn from_state_string(state: &str) -> Self {
        match state.split_whitespace().next() {
            // Active states
            Some("RUNNING") | Some("R") => Self::Running,
            Some("PENDING") | Some("PD") => Self::Pending,
            Some("SUSPENDED") | Some("S") => Self::Suspended,
            // Transitional flags
            Some("COMPLETING") | Some("CG") => Self::Completing,
            Some("CONFIGURING") | Some("CF") => Self::Configuring,
            // Successful completion
            Some("COMPLETED") | Some("CD") => Self::Completed,
            // Termination states
            Some("CANCELLED") | Some("CA") => Self::Cancelled,
            Some("FAILED") | Some("F") => Self::Failed,
            Some("TIMEOUT") | Some("TO") => Self::Timeout,
            Some("PREEMPTED") | Some("PR") => Self::Preempted,
            Some("NODE_FAIL") | Some("NF") => Self::NodeFail,
            Some("BOOT_FAIL") | Some("BF") => Self::BootFail,
            Some("DEADLINE") | Some("DL") => Self::Deadline,
            Some("OUT_OF_MEMORY") | Some("OOM") => Self::OutOfMemory,
            _ => Self::Unknown(state.trim().to_string()),
        }
    }

    /// Return the full Slurm state name (the raw token for unknown states).
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "RUNNING",
            Self::Pending => "PENDING",
            Self::Suspended => "SUSPENDED",
            Self::Completing => "COMPLETING",
            Self::Configuring => "CONFIGURING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
            Self::Timeout => "TIMEOUT",
            Self::Preempted => "PREEMPTED",
            Self::NodeFail => "NODE_FAIL",
            Self::BootFail => "BOOT_FAIL",
            Self::Deadline => "DEADLINE",
            Self::OutOfMemory => "OUT_OF_MEMORY",
            Self::Unknown(raw) => raw,
        }
    }

    /// False for tokens outside the known vocabulary
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// True for states that indicate the job did not finish successfully
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Failed
                | Self::Timeout
                | Self::NodeFail
                | Self::BootFail
                | Self::Deadline
                | Self::OutOfMemory
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
